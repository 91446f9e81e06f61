//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("status store error: {0}")]
    Store(#[from] upfeed_status::StoreError),

    #[error("supervision error: {0}")]
    Supervisor(#[from] upfeed_supervisor::SupervisorError),

    #[error("websocket error: {0}")]
    Ws(#[from] upfeed_ws::WsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
