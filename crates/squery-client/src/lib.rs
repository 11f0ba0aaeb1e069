//! squery client library
//!
//! Async client for the server query protocol: command execution with typed
//! reply decoding, and notification subscriptions delivered over channels.
//!
//! # Example
//!
//! ```ignore
//! use squery_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let query = ServerQuery::builder("127.0.0.1:10011")
//!         .credentials("serveradmin", "secret")
//!         .server(1)
//!         .connect()
//!         .await?;
//!
//!     let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//!     query.subscriber(1).text_message(tx, TextMessageTarget::Server).await?;
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event?);
//!     }
//!
//!     query.close().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod error;
pub mod executor;
pub mod query;
pub mod router;
pub mod store;
pub mod subscriber;

pub use builder::ServerQueryBuilder;
pub use client::ServerQuery;
pub use error::{ClientError, Result};
pub use executor::{Executor, ExecutorExt};
pub use query::run;
pub use router::route;
pub use store::{Delivery, EventReceiver, EventSender, EventSlot, EventStore};
pub use subscriber::{Subscriber, Subscription, TextMessageTarget};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::ServerQueryBuilder;
    pub use crate::client::ServerQuery;
    pub use crate::error::{ClientError, Result};
    pub use crate::executor::{Executor, ExecutorExt};
    pub use crate::subscriber::{Subscriber, Subscription, TextMessageTarget};
    pub use squery_core::{Event, EventCategory, Request};
}
