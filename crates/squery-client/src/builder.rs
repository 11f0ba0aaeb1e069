//! Client builder pattern

use squery_core::DEFAULT_KEEPALIVE_SECS;
use squery_transport::{Connection, ConnectionConfig, TcpConfig, TcpTransport, Transport};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::client::{ServerQuery, StartOptions};
use crate::Result;

/// Default time a whole command exchange may take
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`ServerQuery`]
#[derive(Debug, Clone)]
pub struct ServerQueryBuilder {
    addr: String,
    login: Option<(String, String)>,
    server_id: Option<u32>,
    keepalive: Option<Duration>,
    command_timeout: Option<Duration>,
    connection: ConnectionConfig,
    tcp: TcpConfig,
}

impl ServerQueryBuilder {
    /// Create a new builder for `addr` (`host:port`)
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            login: None,
            server_id: None,
            keepalive: Some(Duration::from_secs(DEFAULT_KEEPALIVE_SECS)),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            connection: ConnectionConfig::default(),
            tcp: TcpConfig::default(),
        }
    }

    /// Log in right after the handshake
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.login = Some((user.to_string(), password.to_string()));
        self
    }

    /// Select a virtual server right after connecting
    pub fn server(mut self, sid: u32) -> Self {
        self.server_id = Some(sid);
        self
    }

    /// Keep-alive interval (None = disabled)
    pub fn keepalive(mut self, interval: Option<Duration>) -> Self {
        self.keepalive = interval;
        self
    }

    /// Limit for one command exchange (None = wait forever)
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Capacity of the reply queue
    pub fn reply_buffer(mut self, size: usize) -> Self {
        self.connection.reply_buffer = size;
        self
    }

    /// Capacity of the notification queue
    pub fn notification_buffer(mut self, size: usize) -> Self {
        self.connection.notification_buffer = size;
        self
    }

    /// Expected first frame of the greeting
    pub fn protocol_tag(mut self, tag: &str) -> Self {
        self.connection.protocol_tag = tag.to_string();
        self
    }

    /// TCP socket options
    pub fn tcp_config(mut self, config: TcpConfig) -> Self {
        self.tcp = config;
        self
    }

    fn start_options(&self) -> StartOptions {
        StartOptions {
            login: self.login.clone(),
            server_id: self.server_id,
            keepalive: self.keepalive,
            command_timeout: self.command_timeout,
        }
    }

    /// Dial over TCP and connect
    pub async fn connect(self) -> Result<ServerQuery> {
        let transport = TcpTransport::with_config(self.tcp.clone());
        self.connect_with(&transport).await
    }

    /// Connect through any [`Transport`]
    pub async fn connect_with<T: Transport + ?Sized>(self, transport: &T) -> Result<ServerQuery> {
        let connection = transport.open(&self.addr, &self.connection).await?;
        ServerQuery::start(connection, self.start_options()).await
    }

    /// Connect over an already open stream, e.g. a shell session channel
    pub async fn connect_stream<R, W>(self, reader: R, writer: W) -> Result<ServerQuery>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let connection = Connection::establish(reader, writer, &self.connection).await?;
        ServerQuery::start(connection, self.start_options()).await
    }
}
