//! Error types for the query protocol

use std::fmt;
use thiserror::Error;

/// Result type alias for codec and decoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The server answered with a non-zero error sentinel
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A reply could not be decoded into the requested target
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A web query body was not valid JSON
    #[error("json error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

/// Error reported by the server in an `error id=.. msg=..` sentinel
///
/// An `id` of 0 is the success sentinel and is never returned to callers as
/// a failure.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryError {
    /// Numeric error code
    pub id: u32,
    /// Server supplied message
    pub message: String,
    /// Supplementary message, only sent by the web query interface
    pub extra_message: Option<String>,
}

impl QueryError {
    pub fn new(id: u32, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
            extra_message: None,
        }
    }

    /// Attach the web query supplementary message
    pub fn with_extra_message(mut self, extra: impl Into<String>) -> Self {
        let extra = extra.into();
        self.extra_message = if extra.is_empty() { None } else { Some(extra) };
        self
    }

    /// True for the `id=0` success sentinel
    pub fn is_ok(&self) -> bool {
        self.id == 0
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query error({}): {}", self.id, self.message)?;
        if let Some(extra) = &self.extra_message {
            write!(f, " (extra message: {})", extra)?;
        }
        Ok(())
    }
}

/// A single field that failed to convert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field
    pub field: String,
    /// Kind the field was expected to hold (`int`, `bool`, `codec`, ...)
    pub expected: &'static str,
    /// Raw value received
    pub value: String,
    /// Parser message
    pub reason: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        expected: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot parse '{}' as {}: {:?}: {}",
            self.field, self.expected, self.value, self.reason
        )
    }
}

/// Decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Every field of one object that failed to convert
    #[error("{}", format_field_errors(.0))]
    Fields(Vec<FieldError>),

    /// A single record was requested but the reply carried no object
    #[error("empty response: expected at least one object")]
    EmptyResponse,

    /// A notification line without a field list
    #[error("malformed notification: {0:?}")]
    MalformedNotification(String),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    let mut out = format!("{} error(s) decoding:\n", errors.len());
    for e in errors {
        out.push_str("\n* ");
        out.push_str(&e.to_string());
    }
    out
}
