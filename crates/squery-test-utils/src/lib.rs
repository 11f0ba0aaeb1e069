//! Common test helpers and utilities for squery tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A scripted in-process query server with RAII cleanup
//! - Event collectors for subscription testing

use parking_lot::Mutex;
use squery_core::{escape, PROTOCOL_TAG};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;
use tracing::debug;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Line terminator the query server uses
pub const SERVER_EOL: &str = "\n\r";

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Wait with notification - more efficient than polling
pub async fn wait_with_notify(notify: &Notify, max_wait: Duration) -> bool {
    timeout(max_wait, notify.notified()).await.is_ok()
}

// ============================================================================
// Mock query server
// ============================================================================

/// How the mock server answers one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Optional data line followed by the success sentinel
    Ok(Option<String>),
    /// Error sentinel with the given id and message
    Error(u32, String),
    /// No answer at all
    Silent,
    /// Another reply, sent after a pause
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn ok() -> Self {
        MockReply::Ok(None)
    }

    pub fn data(line: &str) -> Self {
        MockReply::Ok(Some(line.to_string()))
    }

    pub fn error(id: u32, message: &str) -> Self {
        MockReply::Error(id, message.to_string())
    }

    /// Send this reply only after `delay`
    pub fn after(self, delay: Duration) -> Self {
        MockReply::Delayed(delay, Box::new(self))
    }

    fn delay(&self) -> Duration {
        match self {
            MockReply::Delayed(delay, inner) => *delay + inner.delay(),
            _ => Duration::ZERO,
        }
    }

    fn lines(&self) -> Vec<String> {
        match self {
            MockReply::Ok(data) => data
                .iter()
                .cloned()
                .chain(std::iter::once("error id=0 msg=ok".to_string()))
                .collect(),
            MockReply::Error(id, message) => {
                vec![format!("error id={} msg={}", id, escape(message))]
            }
            MockReply::Silent => Vec::new(),
            MockReply::Delayed(_, inner) => inner.lines(),
        }
    }
}

/// Mock server configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// First line of the greeting
    pub header: String,
    /// Second line of the greeting
    pub banner: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            header: PROTOCOL_TAG.to_string(),
            banner: "Welcome to the mock query interface".to_string(),
        }
    }
}

/// Handle to one accepted connection
struct ConnHandle {
    lines: mpsc::UnboundedSender<String>,
    close: Arc<Notify>,
}

#[derive(Default)]
struct State {
    script: Mutex<HashMap<String, MockReply>>,
    received: Mutex<Vec<String>>,
    connections: Mutex<Vec<ConnHandle>>,
    commands: AtomicU32,
    keepalives: AtomicU32,
    notify: Notify,
}

/// A scripted query server on 127.0.0.1 that stops on drop
///
/// Every connection gets the greeting, then each command line is answered
/// from the script (success without data by default). `quit` closes the
/// connection after answering.
pub struct MockServer {
    addr: String,
    state: Arc<State>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockServer {
    /// Start a mock server with the default greeting
    pub async fn start() -> Self {
        Self::start_with_config(MockConfig::default()).await
    }

    pub async fn start_with_config(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(State::default());

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                debug!("mock server accepted {}", peer);
                tokio::spawn(serve(stream, config.clone(), accept_state.clone()));
            }
        });

        Self {
            addr,
            state,
            handle: Some(handle),
        }
    }

    /// `host:port` to connect to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Answer `command` with `reply` from now on
    pub fn on(&self, command: &str, reply: MockReply) {
        self.state.script.lock().insert(command.to_string(), reply);
    }

    /// Push a raw line (usually a notification) to every open connection
    pub fn push(&self, line: &str) {
        self.state
            .connections
            .lock()
            .retain(|conn| conn.lines.send(line.to_string()).is_ok());
    }

    /// Command lines received so far, keep-alives excluded
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    /// Names of the commands received so far
    pub fn commands(&self) -> Vec<String> {
        self.received()
            .iter()
            .map(|l| l.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn keepalive_count(&self) -> u32 {
        self.state.keepalives.load(Ordering::SeqCst)
    }

    /// Wait until `n` commands have been received
    pub async fn wait_for_commands(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.state.commands, n, max_wait).await
    }

    /// Wait until `n` keep-alive frames have been received
    pub async fn wait_for_keepalives(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.state.keepalives, n, max_wait).await
    }

    /// Wait until at least one client is connected and greeted
    pub async fn wait_for_connection(&self, max_wait: Duration) -> bool {
        wait_for(
            || async { !self.state.connections.lock().is_empty() },
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }

    /// Close every open connection from the server side
    pub fn disconnect_all(&self) {
        for conn in self.state.connections.lock().drain(..) {
            conn.close.notify_one();
        }
    }

    /// Stop the server explicitly (also happens on drop)
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.disconnect_all();
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(stream: TcpStream, config: MockConfig, state: Arc<State>) {
    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let greeting = format!("{}{}{}{}", config.header, SERVER_EOL, config.banner, SERVER_EOL);
    if write_half.write_all(greeting.as_bytes()).await.is_err() {
        return;
    }
    let close = Arc::new(Notify::new());
    state.connections.lock().push(ConnHandle {
        lines: tx.clone(),
        close: close.clone(),
    });

    // Writer: replies and pushed lines share one ordered queue
    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            let frame = format!("{}{}", line, SERVER_EOL);
            if write_half.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        tokio::select! {
            read = reader.read_line(&mut line) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            },
            _ = close.notified() => break,
        }

        let command_line = line.trim_end_matches(['\n', '\r']);
        if command_line.trim().is_empty() {
            state.keepalives.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        let name = command_line.split(' ').next().unwrap_or_default().to_string();
        state.received.lock().push(command_line.to_string());

        let reply = state
            .script
            .lock()
            .get(&name)
            .cloned()
            .unwrap_or_else(MockReply::ok);
        let delay = reply.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        for out in reply.lines() {
            if tx.send(out).is_err() {
                break;
            }
        }

        state.commands.fetch_add(1, Ordering::SeqCst);
        state.notify.notify_waiters();

        if name == "quit" {
            break;
        }
    }

    // Close this connection's queue so the writer finishes
    state
        .connections
        .lock()
        .retain(|conn| !conn.lines.same_channel(&tx));
    drop(tx);
    let _ = writer.await;
}

// ============================================================================
// Event Collectors - for verifying received notifications
// ============================================================================

/// Collect everything from a receiver until it closes or `max_wait` passes
pub async fn collect_until_closed<T>(rx: &mut mpsc::Receiver<T>, max_wait: Duration) -> Vec<T> {
    let mut out = Vec::new();
    let deadline = Instant::now() + max_wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, rx.recv()).await {
            Ok(Some(item)) => out.push(item),
            Ok(None) | Err(_) => return out,
        }
    }
}

/// Receive one item or fail after `max_wait`
pub async fn recv_within<T>(rx: &mut mpsc::Receiver<T>, max_wait: Duration) -> Option<T> {
    timeout(max_wait, rx.recv()).await.ok().flatten()
}
