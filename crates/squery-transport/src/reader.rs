//! Frame reader
//!
//! Splits the incoming byte stream into lines and routes them: lines that
//! start with `notify` are asynchronous notifications, everything else
//! belongs to the reply of the command in flight.

use squery_core::NOTIFY_PREFIX;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};

/// Read lines from `reader` until EOF or a read error
///
/// Only `\n` terminated lines are delivered; an unterminated fragment left
/// at EOF is discarded.
///
/// Replies are delivered with an awaited send, so a slow consumer applies
/// backpressure to the reader. Notifications are offered without waiting
/// and dropped when their queue is full or closed. Returning drops both
/// senders, which closes both channels.
pub async fn demultiplex<R>(
    reader: R,
    replies: mpsc::Sender<String>,
    notifications: mpsc::Sender<String>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(1024);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("query stream reached EOF");
                break;
            }
            Ok(_) if buf.last() != Some(&b'\n') => {
                debug!("query stream ended inside a line, dropping {} byte(s)", buf.len());
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("query stream read error: {}", e);
                break;
            }
        }

        let line = normalize(&buf);
        if line.starts_with(NOTIFY_PREFIX) {
            if let Err(e) = notifications.try_send(line) {
                trace!("dropping notification: {}", e);
            }
            continue;
        }

        if replies.send(line).await.is_err() {
            debug!("reply receiver dropped, stopping reader");
            break;
        }
    }
}

/// Strip leading carriage returns and trailing newlines
fn normalize(raw: &[u8]) -> String {
    let start = raw.iter().position(|&b| b != b'\r').unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| b != b'\n').map_or(start, |i| i + 1);
    String::from_utf8_lossy(&raw[start..end.max(start)]).into_owned()
}

/// Consume the greeting the server sends right after connecting
///
/// The first frame must equal `tag`; the second is a free-form banner and is
/// returned to the caller.
pub async fn read_handshake(replies: &mut mpsc::Receiver<String>, tag: &str) -> Result<String> {
    let header = replies.recv().await.ok_or(TransportError::ConnectionClosed)?;
    if header != tag {
        return Err(TransportError::MalformedHeader {
            expected: tag.to_string(),
            got: header,
        });
    }

    let banner = replies.recv().await.ok_or(TransportError::ConnectionClosed)?;
    debug!("handshake complete: {}", banner);
    Ok(banner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(b"test\n"), "test");
        assert_eq!(normalize(b"\r\rtest\n\n"), "test");
        assert_eq!(normalize(b"test\r\n"), "test\r");
        assert_eq!(normalize(b"\n"), "");
        assert_eq!(normalize(b"\r\n"), "");
        assert_eq!(normalize(b"no newline"), "no newline");
    }

    #[test]
    fn test_normalize_lossy() {
        assert_eq!(normalize(b"a\xffb\n"), "a\u{fffd}b");
    }
}
