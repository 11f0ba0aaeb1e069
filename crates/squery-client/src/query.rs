//! Request/reply correlation
//!
//! A command is answered by zero or more data lines followed by exactly one
//! `error id=.. msg=..` sentinel. Only the last data line before the
//! sentinel is kept; the server never sends more than one for a command.

use bytes::Bytes;
use squery_core::detect_error;
use squery_transport::LineWriter;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{ClientError, Result};

/// Write `request` and collect its reply
///
/// Returns the last data line (or `None` for commands without a payload) once
/// the success sentinel arrives. A non-zero sentinel is returned as
/// [`ClientError::Query`]. The caller must hold exclusive access to `replies`
/// for the whole exchange.
pub async fn run(
    replies: &mut mpsc::Receiver<String>,
    writer: &LineWriter,
    request: Bytes,
) -> Result<Option<String>> {
    writer.send(request).await?;

    let mut data = None;
    loop {
        let line = replies.recv().await.ok_or(ClientError::ConnectionClosed)?;
        match detect_error(&line)? {
            None => {
                trace!("reply line: {}", line);
                data = Some(line);
            }
            Some(status) if status.is_ok() => return Ok(data),
            Some(status) => return Err(ClientError::Query(status)),
        }
    }
}
