//! TCP bootstrap
//!
//! Raw query connections are plain TCP with newline framing. The socket gets
//! an OS-level keep-alive so dead peers are noticed even when the query is
//! idle between keep-alive frames.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::connection::{Connection, ConnectionConfig};
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// TCP configuration
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Dial timeout
    pub connect_timeout: Duration,
    /// OS keep-alive idle time (None = disabled)
    pub keepalive: Option<Duration>,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            keepalive: Some(Duration::from_secs(120)),
            nodelay: true,
        }
    }
}

/// TCP transport
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Dial `addr` and configure the socket
    pub async fn dial(&self, addr: &str) -> Result<TcpStream> {
        info!("Connecting to TCP: {}", addr);

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        if let Some(idle) = self.config.keepalive {
            let socket = socket2::SockRef::from(&stream);
            let keepalive = socket2::TcpKeepalive::new().with_time(idle);
            socket.set_tcp_keepalive(&keepalive)?;
        }
        if self.config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                debug!("failed to set TCP_NODELAY: {}", e);
            }
        }

        info!("TCP connected to {}", addr);
        Ok(stream)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self, addr: &str, config: &ConnectionConfig) -> Result<Connection> {
        let stream = self.dial(addr).await?;
        let (reader, writer) = stream.into_split();
        Connection::establish(reader, writer, config).await
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}
