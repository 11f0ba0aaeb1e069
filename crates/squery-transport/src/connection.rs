//! An established query connection
//!
//! A connection is any byte stream split into a read and a write half. The
//! read half is owned by a spawned [`demultiplex`] task; the write half is
//! wrapped in a [`LineWriter`]. Once the greeting has been consumed the
//! caller receives the two line channels and the writer.

use squery_core::PROTOCOL_TAG;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Result;
use crate::reader::{demultiplex, read_handshake};
use crate::writer::LineWriter;

/// Default capacity of the reply queue
pub const DEFAULT_REPLY_BUFFER: usize = 5;

/// Default capacity of the notification queue
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Capacity of the reply queue
    pub reply_buffer: usize,
    /// Capacity of the notification queue; notifications beyond it are dropped
    pub notification_buffer: usize,
    /// First frame the server is expected to send
    pub protocol_tag: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reply_buffer: DEFAULT_REPLY_BUFFER,
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
            protocol_tag: PROTOCOL_TAG.to_string(),
        }
    }
}

/// Line channels and writer of a connection that passed the handshake
#[derive(Debug)]
pub struct Connection {
    /// Shared write half
    pub writer: LineWriter,
    /// Reply lines in wire order
    pub replies: mpsc::Receiver<String>,
    /// Notification lines in wire order
    pub notifications: mpsc::Receiver<String>,
    /// Banner line sent after the protocol tag
    pub banner: String,
    /// The reader task; it ends when the stream does
    pub reader_task: JoinHandle<()>,
}

impl Connection {
    /// Attach to a stream and consume the greeting
    pub async fn establish<R, W>(reader: R, writer: W, config: &ConnectionConfig) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (reply_tx, mut replies) = mpsc::channel(config.reply_buffer.max(1));
        let (notify_tx, notifications) = mpsc::channel(config.notification_buffer.max(1));

        let reader_task = tokio::spawn(demultiplex(reader, reply_tx, notify_tx));
        let writer = LineWriter::new(writer);

        let banner = match read_handshake(&mut replies, &config.protocol_tag).await {
            Ok(banner) => banner,
            Err(e) => {
                warn!("handshake failed: {}", e);
                reader_task.abort();
                let _ = writer.shutdown().await;
                return Err(e);
            }
        };
        info!("query connection ready");

        Ok(Self {
            writer,
            replies,
            notifications,
            banner,
            reader_task,
        })
    }
}
