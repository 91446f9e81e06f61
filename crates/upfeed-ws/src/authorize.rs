//! Feed authorization endpoint client.
//!
//! The broker hands out a single-use WebSocket URL per authorize call, so
//! this runs before every connection attempt, including reconnects.

use crate::error::{WsError, WsResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

/// Source of single-use feed URLs.
///
/// A rejection (`WsError::Auth`) is fatal for the current credential;
/// a transport failure (`WsError::Http`) is retried with backoff.
#[async_trait]
pub trait FeedAuthorizer: Send + Sync {
    async fn authorize(&self, access_token: &str) -> WsResult<String>;
}

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    status: String,
    #[serde(default)]
    data: Option<AuthorizeData>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AuthorizeData {
    authorized_redirect_uri: Option<String>,
}

/// HTTPS implementation against the broker's authorize endpoint.
pub struct HttpAuthorizer {
    client: Client,
    url: String,
}

impl HttpAuthorizer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> WsResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WsError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedAuthorizer for HttpAuthorizer {
    async fn authorize(&self, access_token: &str) -> WsResult<String> {
        debug!(url = %self.url, "requesting feed authorization");

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| WsError::Http(format!("authorize request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "feed authorization rejected by broker");
            return Err(WsError::Auth(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WsError::Http(format!("HTTP {status}: {body}")));
        }

        let body: AuthorizeResponse = response
            .json()
            .await
            .map_err(|e| WsError::Http(format!("failed to parse authorize response: {e}")))?;

        match (body.status.as_str(), body.data) {
            (
                "success",
                Some(AuthorizeData {
                    authorized_redirect_uri: Some(uri),
                }),
            ) => Ok(uri),
            _ => {
                let detail = body
                    .errors
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no authorized_redirect_uri in response".to_string());
                Err(WsError::Auth(detail))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_response_parses_success_shape() {
        let json = r#"{
            "status": "success",
            "data": { "authorized_redirect_uri": "wss://feed.example.com/abc" }
        }"#;
        let parsed: AuthorizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(
            parsed.data.unwrap().authorized_redirect_uri.as_deref(),
            Some("wss://feed.example.com/abc")
        );
    }

    #[test]
    fn test_authorize_response_parses_error_shape() {
        let json = r#"{ "status": "error", "errors": [{"message": "invalid token"}] }"#;
        let parsed: AuthorizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.status, "error");
        assert!(parsed.data.is_none());
        assert!(parsed.errors.is_some());
    }
}
