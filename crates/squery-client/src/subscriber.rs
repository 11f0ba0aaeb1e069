//! Notification subscriptions
//!
//! Registering for notifications is a two step affair: the server has to be
//! told with `servernotifyregister`, then the local store learns which slot
//! handles each notification name. Slots are only added once the server
//! accepted the registration.

use squery_core::events::{
    names, ChannelCreatedEvent, ChannelDeletedEvent, ChannelDescriptionChangedEvent,
    ChannelEditedEvent, ChannelMovedEvent, ChannelPasswordChangedEvent, ClientEnterViewEvent,
    ClientLeftViewEvent, ClientMovedEvent, ServerEditedEvent, TextMessageEvent, TokenUsedEvent,
};
use squery_core::{Event, EventCategory, Request};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::executor::Executor;
use crate::store::{EventSender, EventSlot, EventStore};

/// One registration request and the slots it enables
#[derive(Debug)]
pub struct Subscription {
    pub category: EventCategory,
    /// Channel scope; only sent for the channel category (0 = all channels)
    pub channel_id: u32,
    pub events: Vec<(String, EventSlot)>,
}

impl Subscription {
    pub fn new(category: EventCategory) -> Self {
        Self {
            category,
            channel_id: 0,
            events: Vec::new(),
        }
    }

    /// Scope a channel subscription
    pub fn channel(mut self, channel_id: u32) -> Self {
        self.channel_id = channel_id;
        self
    }

    /// Deliver notifications named `name` to `slot`
    pub fn event(mut self, name: impl Into<String>, slot: EventSlot) -> Self {
        self.events.push((name.into(), slot));
        self
    }

    fn request(&self, server_id: u32) -> Request {
        let request = Request::new("servernotifyregister")
            .server(server_id)
            .arg("event", self.category.as_str());
        if self.category.is_scoped() {
            request.arg("id", self.channel_id)
        } else {
            request
        }
    }
}

/// Which text messages to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMessageTarget {
    /// Messages in the channel the query client is in
    Channel,
    /// Messages to the whole virtual server; renew after switching servers
    Server,
    /// Messages sent directly to the query client
    Private,
}

impl TextMessageTarget {
    pub fn category(&self) -> EventCategory {
        match self {
            TextMessageTarget::Channel => EventCategory::TextChannel,
            TextMessageTarget::Server => EventCategory::TextServer,
            TextMessageTarget::Private => EventCategory::TextPrivate,
        }
    }
}

/// Registers notification subscriptions through an [`Executor`]
pub struct Subscriber<X> {
    executor: X,
    store: Arc<EventStore>,
    server_id: AtomicU32,
}

impl<X: Executor> Subscriber<X> {
    /// Create a subscriber feeding `store`
    ///
    /// The store must be the one the notification router reads from.
    pub fn new(executor: X, store: Arc<EventStore>, server_id: u32) -> Self {
        Self {
            executor,
            store,
            server_id: AtomicU32::new(server_id),
        }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Virtual server registrations are sent to
    pub fn server_id(&self) -> u32 {
        self.server_id.load(Ordering::Acquire)
    }

    /// Register with the server, then add the slots
    ///
    /// On failure the store is left untouched.
    pub async fn subscribe(&self, subscription: Subscription) -> Result<()> {
        let request = subscription.request(self.server_id());
        self.executor.execute_raw(&request).await?;

        for (name, slot) in subscription.events {
            debug!("subscribed to {}", name);
            self.store.add(name, slot);
        }
        Ok(())
    }

    /// Stop delivering `name` locally; the server registration stays
    pub fn unsubscribe(&self, name: &str) {
        debug!("unsubscribed from {}", name);
        self.store.delete(name);
    }

    /// Unregister everything
    ///
    /// The local store is cleared and the server scope reset even when the
    /// server rejects the command; that error is still returned.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        let request = Request::new("servernotifyunregister").server(self.server_id());
        let result = self.executor.execute_raw(&request).await;

        self.server_id.store(0, Ordering::Release);
        self.store.clear();
        debug!("unsubscribed from all notifications");

        result.map(|_| ())
    }

    async fn single<T>(
        &self,
        category: EventCategory,
        channel_id: u32,
        name: &str,
        output: EventSender,
    ) -> Result<()>
    where
        T: squery_core::Unmarshal + Default + Into<Event>,
    {
        let subscription = Subscription::new(category)
            .channel(channel_id)
            .event(name, EventSlot::new::<T>(output));
        self.subscribe(subscription).await
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub async fn server_edited(&self, output: EventSender) -> Result<()> {
        self.single::<ServerEditedEvent>(EventCategory::Server, 0, names::SERVER_EDITED, output)
            .await
    }

    /// Clients connecting to the virtual server
    pub async fn client_joined_server(&self, output: EventSender) -> Result<()> {
        self.single::<ClientEnterViewEvent>(
            EventCategory::Server,
            0,
            names::CLIENT_ENTER_VIEW,
            output,
        )
        .await
    }

    /// Clients disconnecting from the virtual server
    pub async fn client_left_server(&self, output: EventSender) -> Result<()> {
        self.single::<ClientLeftViewEvent>(
            EventCategory::Server,
            0,
            names::CLIENT_LEFT_VIEW,
            output,
        )
        .await
    }

    // ========================================================================
    // Channel (channel_id 0 = all channels)
    // ========================================================================

    /// Only delivered for a subscription to all channels
    pub async fn channel_created(&self, output: EventSender) -> Result<()> {
        self.single::<ChannelCreatedEvent>(
            EventCategory::Channel,
            0,
            names::CHANNEL_CREATED,
            output,
        )
        .await
    }

    pub async fn channel_deleted(&self, output: EventSender, channel_id: u32) -> Result<()> {
        self.single::<ChannelDeletedEvent>(
            EventCategory::Channel,
            channel_id,
            names::CHANNEL_DELETED,
            output,
        )
        .await
    }

    pub async fn channel_moved(&self, output: EventSender, channel_id: u32) -> Result<()> {
        self.single::<ChannelMovedEvent>(
            EventCategory::Channel,
            channel_id,
            names::CHANNEL_MOVED,
            output,
        )
        .await
    }

    pub async fn channel_edited(&self, output: EventSender, channel_id: u32) -> Result<()> {
        self.single::<ChannelEditedEvent>(
            EventCategory::Channel,
            channel_id,
            names::CHANNEL_EDITED,
            output,
        )
        .await
    }

    pub async fn channel_description_changed(
        &self,
        output: EventSender,
        channel_id: u32,
    ) -> Result<()> {
        self.single::<ChannelDescriptionChangedEvent>(
            EventCategory::Channel,
            channel_id,
            names::CHANNEL_DESCRIPTION_CHANGED,
            output,
        )
        .await
    }

    pub async fn channel_password_changed(
        &self,
        output: EventSender,
        channel_id: u32,
    ) -> Result<()> {
        self.single::<ChannelPasswordChangedEvent>(
            EventCategory::Channel,
            channel_id,
            names::CHANNEL_PASSWORD_CHANGED,
            output,
        )
        .await
    }

    pub async fn client_moved(&self, output: EventSender, channel_id: u32) -> Result<()> {
        self.single::<ClientMovedEvent>(
            EventCategory::Channel,
            channel_id,
            names::CLIENT_MOVED,
            output,
        )
        .await
    }

    pub async fn client_joined_channel(&self, output: EventSender, channel_id: u32) -> Result<()> {
        self.single::<ClientEnterViewEvent>(
            EventCategory::Channel,
            channel_id,
            names::CLIENT_ENTER_VIEW,
            output,
        )
        .await
    }

    pub async fn client_left_channel(&self, output: EventSender, channel_id: u32) -> Result<()> {
        self.single::<ClientLeftViewEvent>(
            EventCategory::Channel,
            channel_id,
            names::CLIENT_LEFT_VIEW,
            output,
        )
        .await
    }

    // ========================================================================
    // Text and tokens
    // ========================================================================

    /// Text messages for `target`
    ///
    /// All targets share the `notifytextmessage` slot, so the latest call
    /// decides where messages go.
    pub async fn text_message(&self, output: EventSender, target: TextMessageTarget) -> Result<()> {
        self.single::<TextMessageEvent>(target.category(), 0, names::TEXT_MESSAGE, output)
            .await
    }

    pub async fn token_used(&self, output: EventSender) -> Result<()> {
        self.single::<TokenUsedEvent>(EventCategory::TokenUsed, 0, names::TOKEN_USED, output)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use squery_core::QueryError;
    use tokio::sync::mpsc;

    /// Records every request and answers with a fixed status
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fail_with: Option<u32>,
    }

    #[async_trait]
    impl Executor for Recorder {
        async fn execute_raw(&self, request: &Request) -> Result<Option<String>> {
            self.sent.lock().push(request.to_string());
            match self.fail_with {
                Some(id) => Err(ClientError::Query(QueryError::new(id, "failed"))),
                None => Ok(None),
            }
        }
    }

    fn subscriber(fail_with: Option<u32>) -> Subscriber<Arc<Recorder>> {
        let exec = Arc::new(Recorder {
            fail_with,
            ..Default::default()
        });
        Subscriber::new(exec, Arc::new(EventStore::new()), 3)
    }

    #[tokio::test]
    async fn test_subscribe_registers_then_adds() {
        let sub = subscriber(None);
        let (tx, _rx) = mpsc::channel(1);

        sub.channel_edited(tx, 7).await.unwrap();

        assert_eq!(
            sub.executor.sent.lock().as_slice(),
            ["servernotifyregister event=channel id=7\n"]
        );
        assert!(sub.store().get("notifychanneledited").is_some());
    }

    #[tokio::test]
    async fn test_non_channel_category_has_no_id() {
        let sub = subscriber(None);
        let (tx, _rx) = mpsc::channel(1);

        sub.text_message(tx, TextMessageTarget::Private).await.unwrap();

        assert_eq!(
            sub.executor.sent.lock().as_slice(),
            ["servernotifyregister event=textprivate\n"]
        );
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_store() {
        let sub = subscriber(Some(1538));
        let (tx, _rx) = mpsc::channel(1);

        let err = sub.server_edited(tx).await.unwrap_err();
        assert_eq!(err.query_code(), Some(1538));
        assert_eq!(sub.store().count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_clears_even_on_error() {
        let sub = subscriber(None);
        let (tx, _rx) = mpsc::channel(1);
        sub.token_used(tx.clone()).await.unwrap();
        sub.client_joined_server(tx).await.unwrap();
        assert_eq!(sub.store().count(), 2);

        sub.unsubscribe("notifytokenused");
        assert_eq!(sub.store().count(), 1);

        let failing = Subscriber::new(
            Arc::new(Recorder {
                fail_with: Some(5),
                ..Default::default()
            }),
            sub.store().clone(),
            3,
        );
        assert!(failing.unsubscribe_all().await.is_err());
        assert_eq!(failing.store().count(), 0);
        assert_eq!(failing.server_id(), 0);
    }
}
