//! squery transport layer
//!
//! This crate moves lines between a query server and the client:
//! - Frame reader that splits replies from notifications ([`demultiplex`])
//! - Handshake check ([`read_handshake`])
//! - Serialized writer shared by commands and keep-alive ([`LineWriter`])
//! - Keep-alive task ([`keep_alive`])
//! - TCP bootstrap (feature `tcp`, on by default)

pub mod connection;
pub mod error;
pub mod keepalive;
pub mod reader;
pub mod traits;
pub mod writer;

#[cfg(feature = "tcp")]
pub mod tcp;

pub use connection::{Connection, ConnectionConfig};
pub use error::{Result, TransportError};
pub use keepalive::keep_alive;
pub use reader::{demultiplex, read_handshake};
pub use traits::Transport;
pub use writer::LineWriter;

#[cfg(feature = "tcp")]
pub use tcp::{TcpConfig, TcpTransport};
