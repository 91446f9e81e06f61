//! Environment-backed credential source.
//!
//! Token acquisition and refresh happen in a separate system; this process
//! only reads the current token from the environment.

use chrono::{DateTime, Duration, Utc};
use upfeed_core::{Credential, CredentialError, CredentialProvider};

pub const ACCESS_TOKEN_VAR: &str = "UPSTOX_ACCESS_TOKEN";
pub const TOKEN_EXPIRES_AT_VAR: &str = "UPSTOX_TOKEN_EXPIRES_AT";

/// Reads `UPSTOX_ACCESS_TOKEN` and `UPSTOX_TOKEN_EXPIRES_AT` (RFC 3339 or
/// unix seconds). A missing expiry is treated as one day out, matching the
/// broker's daily token lifetime.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn credential(&self) -> Result<Credential, CredentialError> {
        let token = std::env::var(ACCESS_TOKEN_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(CredentialError::NotConfigured)?;

        let expires_at = match std::env::var(TOKEN_EXPIRES_AT_VAR) {
            Ok(raw) => parse_expiry(&raw)
                .ok_or_else(|| CredentialError::Unavailable(format!(
                    "unparseable {TOKEN_EXPIRES_AT_VAR}: {raw:?}"
                )))?,
            Err(_) => Utc::now() + Duration::days(1),
        };

        Ok(Credential::new(token, expires_at))
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_formats() {
        let rfc = parse_expiry("2026-08-30T15:30:00+05:30").unwrap();
        let utc = parse_expiry("2026-08-30T10:00:00Z").unwrap();
        assert_eq!(rfc, utc);

        let unix = parse_expiry("1790000000").unwrap();
        assert_eq!(unix.timestamp(), 1_790_000_000);

        assert!(parse_expiry("tomorrow").is_none());
    }
}
