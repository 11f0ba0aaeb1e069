//! Notification router
//!
//! Takes raw notification lines off the transport, looks up the slot
//! registered for the notification name and delivers the decoded payload.

use squery_core::split_response;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::store::EventStore;

/// Route notifications until the channel closes
///
/// Returns immediately when there is no store. Unknown names are discarded.
/// A payload that fails to decode is delivered as the decode error. When the
/// channel closes every slot is dropped so subscribers see the end of the
/// stream.
pub async fn route<E>(mut notifications: mpsc::Receiver<String>, store: Option<Arc<EventStore<E>>>)
where
    E: Send + 'static,
{
    let Some(store) = store else {
        return;
    };

    while let Some(line) = notifications.recv().await {
        let (name, fields) = line.split_once(' ').unwrap_or((line.as_str(), ""));

        let Some(slot) = store.get(name) else {
            trace!("no subscriber for {}", name);
            continue;
        };

        let delivery = slot.decode(&split_response(fields));
        if slot.output().send(delivery).await.is_err() && store.delete_if_closed(name) {
            debug!("subscriber for {} went away, slot removed", name);
        }
    }

    debug!("notification stream closed, closing {} subscriber(s)", store.count());
    store.close_all();
}
