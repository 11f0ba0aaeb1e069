//! Transport trait definitions

use async_trait::async_trait;

use crate::connection::{Connection, ConnectionConfig};
use crate::error::Result;

/// A way of reaching a query server
///
/// Implementations produce an established [`Connection`]: the stream is
/// open and the greeting has been consumed. Stream-based variants that are
/// set up elsewhere (a shell session, a test pipe) can skip this trait and
/// call [`Connection::establish`] directly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `addr`
    async fn open(&self, addr: &str, config: &ConnectionConfig) -> Result<Connection>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
