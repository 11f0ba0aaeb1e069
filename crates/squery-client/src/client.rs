//! Server query client

use async_trait::async_trait;
use parking_lot::Mutex;
use squery_core::{split_response, unmarshal_response, Request, Unmarshal};
use squery_transport::{keep_alive, Connection, LineWriter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::builder::ServerQueryBuilder;
use crate::error::{ClientError, Result};
use crate::executor::Executor;
use crate::query::run;
use crate::router::route;
use crate::store::EventStore;
use crate::subscriber::Subscriber;

/// Reply side of the connection, held for the duration of one exchange
struct Exchange {
    replies: mpsc::Receiver<String>,
    /// Virtual server selected with `use` (0 = none)
    selected_server: u32,
    /// An exchange was abandoned mid-reply; the reply stream is out of step
    poisoned: bool,
}

impl Exchange {
    async fn select(&mut self, writer: &LineWriter, sid: u32) -> Result<()> {
        let request = Request::new("use").arg("sid", sid);
        run(&mut self.replies, writer, request.to_bytes()).await?;
        self.selected_server = sid;
        debug!("selected virtual server {}", sid);
        Ok(())
    }

    async fn perform(&mut self, writer: &LineWriter, step: Step<'_>) -> Result<Option<String>> {
        match step {
            Step::Select(sid) => {
                if self.selected_server != sid {
                    self.select(writer, sid).await?;
                }
                Ok(None)
            }
            Step::Command(request) => {
                let sid = request.server_id;
                if sid != 0 && sid != self.selected_server {
                    self.select(writer, sid).await?;
                }
                run(&mut self.replies, writer, request.to_bytes()).await
            }
        }
    }
}

/// What one exchange sends
#[derive(Clone, Copy)]
enum Step<'r> {
    /// `use sid=<id>` unless already selected
    Select(u32),
    /// A command, preceded by `use` when it names another virtual server
    Command(&'r Request),
}

impl Step<'_> {
    fn command(&self) -> &str {
        match self {
            Step::Select(_) => "use",
            Step::Command(request) => &request.command,
        }
    }
}

/// An exchange holding the reply stream
///
/// Dropped before its sentinel arrives (the caller was cancelled or timed
/// out), the lines still owed by the server would be read by the next
/// caller. The connection is poisoned and torn down instead.
struct PendingExchange<'a> {
    inner: &'a Inner,
    exchange: tokio::sync::MutexGuard<'a, Exchange>,
    finished: bool,
}

impl PendingExchange<'_> {
    async fn run(&mut self, step: Step<'_>) -> Result<Option<String>> {
        let result = self.exchange.perform(&self.inner.writer, step).await;
        self.finished = true;
        result
    }
}

impl Drop for PendingExchange<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.exchange.poisoned = true;
        self.inner.writer.mark_closed();
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        warn!("exchange abandoned before its reply arrived, connection closed");
    }
}

struct Inner {
    writer: LineWriter,
    exchange: tokio::sync::Mutex<Exchange>,
    store: Arc<EventStore>,
    banner: String,
    command_timeout: Option<Duration>,
    /// Reader and keep-alive tasks
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Options applied when a client starts on an established connection
#[derive(Debug, Clone, Default)]
pub(crate) struct StartOptions {
    pub login: Option<(String, String)>,
    pub server_id: Option<u32>,
    pub keepalive: Option<Duration>,
    pub command_timeout: Option<Duration>,
}

/// A query client on one connection
///
/// Cloning is cheap; clones share the connection. Command exchanges are
/// serialized, so concurrent callers never see each other's replies.
#[derive(Clone)]
pub struct ServerQuery {
    inner: Arc<Inner>,
}

impl ServerQuery {
    /// Create a builder
    pub fn builder(addr: &str) -> ServerQueryBuilder {
        ServerQueryBuilder::new(addr)
    }

    /// Connect to `addr` with default settings
    pub async fn connect(addr: &str) -> Result<Self> {
        ServerQueryBuilder::new(addr).connect().await
    }

    pub(crate) async fn start(connection: Connection, options: StartOptions) -> Result<Self> {
        let Connection {
            writer,
            replies,
            notifications,
            banner,
            reader_task,
        } = connection;

        let store = Arc::new(EventStore::new());
        // The router is not tracked: it ends on its own once the reader is gone.
        tokio::spawn(route(notifications, Some(store.clone())));
        let mut tasks = vec![reader_task];
        if let Some(period) = options.keepalive {
            tasks.push(tokio::spawn(keep_alive(writer.clone(), period)));
        }

        let client = Self {
            inner: Arc::new(Inner {
                writer,
                exchange: tokio::sync::Mutex::new(Exchange {
                    replies,
                    selected_server: 0,
                    poisoned: false,
                }),
                store,
                banner,
                command_timeout: options.command_timeout,
                tasks: Mutex::new(tasks),
            }),
        };

        if let Some((user, password)) = &options.login {
            if let Err(e) = client.login(user, password).await {
                warn!("login failed: {}", e);
                client.shutdown().await;
                return Err(e);
            }
        }
        if let Some(sid) = options.server_id {
            if let Err(e) = client.use_server(sid).await {
                client.shutdown().await;
                return Err(e);
            }
        }

        info!("Connected: {}", client.inner.banner);
        Ok(client)
    }

    /// Banner line the server sent after the protocol tag
    pub fn banner(&self) -> &str {
        &self.inner.banner
    }

    /// Whether the write half is still usable
    pub fn is_connected(&self) -> bool {
        self.inner.writer.is_connected()
    }

    /// Store the notification router delivers from
    pub fn event_store(&self) -> Arc<EventStore> {
        self.inner.store.clone()
    }

    /// A subscriber registering on virtual server `server_id` (0 = current)
    pub fn subscriber(&self, server_id: u32) -> Subscriber<ServerQuery> {
        Subscriber::new(self.clone(), self.inner.store.clone(), server_id)
    }

    /// Run a command and return its raw reply line
    ///
    /// A request naming a virtual server other than the selected one first
    /// issues `use sid=<id>`.
    pub async fn execute_raw(&self, request: &Request) -> Result<Option<String>> {
        self.exchange(Step::Command(request)).await
    }

    /// Wait for the reply stream, then run `step` under the command timeout
    ///
    /// Time spent queued behind other callers does not count against the
    /// timeout; only the write and the wait for the reply do.
    async fn exchange(&self, step: Step<'_>) -> Result<Option<String>> {
        let exchange = self.inner.exchange.lock().await;
        if exchange.poisoned {
            return Err(ClientError::ConnectionClosed);
        }
        let mut pending = PendingExchange {
            inner: &self.inner,
            exchange,
            finished: false,
        };

        let Some(limit) = self.inner.command_timeout else {
            return pending.run(step).await;
        };
        match tokio::time::timeout(limit, pending.run(step)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", step.command(), limit);
                drop(pending);
                self.shutdown().await;
                Err(ClientError::Timeout)
            }
        }
    }

    /// Run a command and decode its reply into `target`
    pub async fn execute<T>(&self, request: &Request, target: &mut T) -> Result<()>
    where
        T: Unmarshal + ?Sized,
    {
        let raw = self.execute_raw(request).await?;
        let objects = raw.as_deref().map(split_response).unwrap_or_default();
        unmarshal_response(&objects, target)?;
        Ok(())
    }

    /// Run a command and decode its reply into a new `T`
    pub async fn query<T>(&self, request: &Request) -> Result<T>
    where
        T: Unmarshal + Default,
    {
        let mut target = T::default();
        self.execute(request, &mut target).await?;
        Ok(target)
    }

    /// Select virtual server `sid` for the following commands
    pub async fn use_server(&self, sid: u32) -> Result<()> {
        self.exchange(Step::Select(sid)).await?;
        Ok(())
    }

    /// Virtual server currently selected (0 = none)
    pub async fn selected_server(&self) -> u32 {
        self.inner.exchange.lock().await.selected_server
    }

    pub async fn login(&self, user: &str, password: &str) -> Result<()> {
        let request = Request::new("login")
            .arg("client_login_name", user)
            .arg("client_login_password", password);
        self.execute_raw(&request).await?;
        info!("logged in as {}", user);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.execute_raw(&Request::new("logout")).await?;
        self.inner.exchange.lock().await.selected_server = 0;
        Ok(())
    }

    /// Log out, quit and close the connection
    ///
    /// `logout` and `quit` are best effort; the connection is closed either
    /// way.
    pub async fn close(&self) -> Result<()> {
        if self.is_connected() {
            if let Err(e) = self.logout().await {
                debug!("logout on close failed: {}", e);
            }
            if let Err(e) = self.execute_raw(&Request::new("quit")).await {
                debug!("quit on close failed: {}", e);
            }
        }
        self.shutdown().await;
        info!("Connection closed");
        Ok(())
    }

    /// Tear down the connection without talking to the server
    ///
    /// The reader stops, which closes the notification stream and ends every
    /// subscriber output.
    async fn shutdown(&self) {
        let _ = self.inner.writer.shutdown().await;
        let tasks: Vec<JoinHandle<()>> = self.inner.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl Executor for ServerQuery {
    async fn execute_raw(&self, request: &Request) -> Result<Option<String>> {
        ServerQuery::execute_raw(self, request).await
    }
}

impl std::fmt::Debug for ServerQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerQuery")
            .field("banner", &self.inner.banner)
            .field("connected", &self.is_connected())
            .finish()
    }
}
