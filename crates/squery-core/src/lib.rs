//! squery core
//!
//! Wire codec and decoding primitives for the server query protocol.
//!
//! This crate provides:
//! - Value escaping ([`escape`], [`unescape`])
//! - Request encoding ([`Request`])
//! - Reply and notification splitting ([`split_response`], [`detect_error`])
//! - Typed decoding of field maps ([`Record`], [`Unmarshal`], [`record!`])
//! - Domain text types and notification payloads ([`types`], [`events`])
//! - The web query response envelope ([`web`])

pub mod decode;
pub mod error;
pub mod escape;
pub mod events;
pub mod request;
pub mod response;
pub mod types;
pub mod web;

pub use decode::{decode, unmarshal_response, FromField, Record, Unmarshal};
pub use error::{DecodeError, Error, FieldError, QueryError, Result};
pub use escape::{escape, unescape};
pub use events::{Event, EventCategory};
pub use request::{ArgValue, Request};
pub use response::{detect_error, split_response, FieldMap};

/// First frame sent by the server after the connection opens
pub const PROTOCOL_TAG: &str = "TS3";

/// Prefix that marks a line as an asynchronous notification
pub const NOTIFY_PREFIX: &str = "notify";

/// First token of the sentinel line terminating every reply
pub const ERROR_SENTINEL: &str = "error";

/// Bytes written by the keep-alive task
pub const KEEPALIVE_FRAME: &[u8] = b" \n";

/// Default keep-alive interval in seconds
pub const DEFAULT_KEEPALIVE_SECS: u64 = 200;

/// Default raw TCP query port
pub const DEFAULT_QUERY_PORT: u16 = 10011;
