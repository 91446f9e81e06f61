//! Supervisor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("status store error: {0}")]
    Store(#[from] upfeed_status::StoreError),

    #[error("invalid supervisor configuration: {0}")]
    Config(String),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
