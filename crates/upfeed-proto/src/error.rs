//! Decoder error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty feed frame")]
    EmptyFrame,

    #[error("malformed feed frame: {0}")]
    Malformed(#[from] prost::DecodeError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
