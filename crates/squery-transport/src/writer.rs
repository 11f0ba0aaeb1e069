//! Serialized line writer
//!
//! The write half of a connection is shared between command callers and the
//! keep-alive task. Every call writes one complete frame under an async
//! mutex, so a ping can never land in the middle of a command line.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{Result, TransportError};

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable handle over the write half of a connection
#[derive(Clone)]
pub struct LineWriter {
    inner: Arc<tokio::sync::Mutex<BoxedWrite>>,
    connected: Arc<Mutex<bool>>,
}

impl LineWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(Box::new(writer))),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Write one frame and flush it
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        if !*self.connected.lock() {
            return Err(TransportError::ConnectionClosed);
        }

        let mut writer = self.inner.lock().await;
        let result = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            *self.connected.lock() = false;
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }

    /// Whether the last write succeeded and the writer has not been shut down
    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    /// Refuse further sends without touching the stream
    ///
    /// Usable from synchronous contexts such as `Drop`; the write half is
    /// released when the last handle goes away.
    pub fn mark_closed(&self) {
        *self.connected.lock() = false;
    }

    /// Shut down the write half
    ///
    /// Later sends fail with [`TransportError::ConnectionClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        *self.connected.lock() = false;
        let mut writer = self.inner.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!("shutdown of write half failed: {}", e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for LineWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineWriter")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_frames_are_written_whole() {
        let (client, mut server) = tokio::io::duplex(1024);
        let writer = LineWriter::new(client);

        let mut tasks = Vec::new();
        for i in 0..10 {
            let w = writer.clone();
            tasks.push(tokio::spawn(async move {
                w.send(Bytes::from(format!("command{} arg=value\n", i)))
                    .await
                    .unwrap();
                w.send(Bytes::from_static(b" \n")).await.unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        writer.shutdown().await.unwrap();

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            assert!(line == " " || (line.starts_with("command") && line.ends_with(" arg=value")));
        }
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let (client, _server) = tokio::io::duplex(64);
        let writer = LineWriter::new(client);
        writer.shutdown().await.unwrap();
        assert!(!writer.is_connected());
        assert!(matches!(
            writer.send(Bytes::from_static(b"x\n")).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_after_mark_closed_fails() {
        let (client, _server) = tokio::io::duplex(64);
        let writer = LineWriter::new(client);
        let other = writer.clone();
        writer.mark_closed();
        assert!(!other.is_connected());
        assert!(matches!(
            other.send(Bytes::from_static(b"x\n")).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let writer = LineWriter::new(client);
        assert!(matches!(
            writer.send(Bytes::from_static(b"x\n")).await,
            Err(TransportError::SendFailed(_))
        ));
        assert!(!writer.is_connected());
    }
}
