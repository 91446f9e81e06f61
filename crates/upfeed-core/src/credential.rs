//! Broker credential access.
//!
//! Token persistence and OAuth refresh live outside this subsystem; the
//! service only needs a bearer token and its expiry.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no authorized credential configured")]
    NotConfigured,

    #[error("credential source unavailable: {0}")]
    Unavailable(String),
}

/// Bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Whether the token has passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Source of the current broker credential.
///
/// An expired or absent token is a fatal precondition for starting the
/// service; the provider is never asked to refresh.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Result<Credential, CredentialError>;
}
