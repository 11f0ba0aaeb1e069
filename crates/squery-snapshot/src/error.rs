//! Snapshot error types

use squery_core::DecodeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decompression failed: {0}")]
    Decompress(std::io::Error),

    #[error("snapshot is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{section}: {source}")]
    Decode {
        section: &'static str,
        #[source]
        source: DecodeError,
    },
}
