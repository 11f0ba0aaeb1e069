//! Client error types

use squery_core::{DecodeError, QueryError};
use squery_transport::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The reader stopped before the reply was complete
    #[error("connection closed")]
    ConnectionClosed,

    #[error("not connected")]
    NotConnected,

    /// The exchange did not finish in time; the connection is torn down
    #[error("timeout")]
    Timeout,

    /// The server rejected the command
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("client error: {0}")]
    Other(String),
}

impl From<squery_core::Error> for ClientError {
    fn from(e: squery_core::Error) -> Self {
        match e {
            squery_core::Error::Query(e) => ClientError::Query(e),
            squery_core::Error::Decode(e) => ClientError::Decode(e),
            other => ClientError::Other(other.to_string()),
        }
    }
}

impl ClientError {
    /// Server error code, if the server rejected the command
    pub fn query_code(&self) -> Option<u32> {
        match self {
            ClientError::Query(e) => Some(e.id),
            _ => None,
        }
    }
}
