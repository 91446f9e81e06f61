//! Connection manager error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    /// Credential missing/expired or rejected by the authorize endpoint.
    /// Fatal: never retried with the same credential.
    #[error("feed authorization rejected: {0}")]
    Auth(String),

    /// Transport-level failure reaching the authorize endpoint. Retryable.
    #[error("authorize request failed: {0}")]
    Http(String),

    #[error("connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("no data received for {silent_for_secs}s, connection stale")]
    StaleConnection { silent_for_secs: i64 },

    #[error("max reconnection attempts ({0}) reached")]
    MaxReconnectsExceeded(u32),

    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WsResult<T> = Result<T, WsError>;
