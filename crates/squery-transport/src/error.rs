//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    /// The first frame was not the protocol tag
    #[error("malformed header: expected {expected:?}, got {got:?}")]
    MalformedHeader { expected: String, got: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
