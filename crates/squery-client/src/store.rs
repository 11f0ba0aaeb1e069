//! Event store
//!
//! Maps notification names to the slot that decodes and delivers them. The
//! subscriber writes to the store and the router reads from it; every
//! operation is one short critical section and no decoding happens under
//! the lock.

use parking_lot::Mutex;
use squery_core::{DecodeError, Event, FieldMap, Unmarshal};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;

/// What a subscriber receives: a decoded payload or the reason it failed
pub type Delivery<E = Event> = Result<E, DecodeError>;

/// Sending side of a subscriber output
pub type EventSender<E = Event> = mpsc::Sender<Delivery<E>>;

/// Receiving side of a subscriber output
pub type EventReceiver<E = Event> = mpsc::Receiver<Delivery<E>>;

type DecodeFn<E> = fn(&[FieldMap]) -> Result<E, DecodeError>;

/// Decoder and output for one notification name
pub struct EventSlot<E = Event> {
    decode: DecodeFn<E>,
    output: EventSender<E>,
}

impl<E> EventSlot<E> {
    /// A slot that decodes each notification into a fresh `T`
    pub fn new<T>(output: EventSender<E>) -> Self
    where
        T: Unmarshal + Default + Into<E>,
    {
        Self {
            decode: decode_fresh::<T, E>,
            output,
        }
    }

    /// Decode the field list of one notification
    pub fn decode(&self, objects: &[FieldMap]) -> Result<E, DecodeError> {
        (self.decode)(objects)
    }

    pub fn output(&self) -> &EventSender<E> {
        &self.output
    }

    /// Whether the receiving side is gone
    pub fn is_closed(&self) -> bool {
        self.output.is_closed()
    }
}

fn decode_fresh<T, E>(objects: &[FieldMap]) -> Result<E, DecodeError>
where
    T: Unmarshal + Default + Into<E>,
{
    let mut target = T::default();
    target.unmarshal(objects)?;
    Ok(target.into())
}

impl<E> Clone for EventSlot<E> {
    fn clone(&self) -> Self {
        Self {
            decode: self.decode,
            output: self.output.clone(),
        }
    }
}

impl<E> fmt::Debug for EventSlot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSlot")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Thread-safe map of notification name to slot
pub struct EventStore<E = Event> {
    slots: Mutex<HashMap<String, EventSlot<E>>>,
}

impl<E> EventStore<E> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Add or replace the slot for `name`
    pub fn add(&self, name: impl Into<String>, slot: EventSlot<E>) {
        self.slots.lock().insert(name.into(), slot);
    }

    /// Remove the slot for `name`
    pub fn delete(&self, name: &str) {
        self.slots.lock().remove(name);
    }

    /// Remove the slot for `name` only if its receiver is gone
    ///
    /// A slot replaced after the failed delivery is left in place.
    pub fn delete_if_closed(&self, name: &str) -> bool {
        let mut slots = self.slots.lock();
        if slots.get(name).is_some_and(EventSlot::is_closed) {
            slots.remove(name);
            true
        } else {
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<EventSlot<E>> {
        self.slots.lock().get(name).cloned()
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn count(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.lock().keys().cloned().collect()
    }

    /// Remove every slot, dropping the store's senders
    ///
    /// Receivers see the end of the stream once no other sender clones
    /// remain.
    pub fn close_all(&self) {
        let drained: Vec<EventSlot<E>> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        drop(drained);
    }
}

impl<E> Default for EventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squery_core::split_response;

    squery_core::record! {
        struct Test {
            test1: u32 => "test1",
            test2: u32 => "test2",
        }
    }

    impl From<Test> for (u32, u32) {
        fn from(t: Test) -> Self {
            (t.test1, t.test2)
        }
    }

    #[test]
    fn test_add_get_delete() {
        let store: EventStore<Test> = EventStore::new();
        let (tx, _rx) = mpsc::channel(1);

        store.add("test", EventSlot::new::<Test>(tx.clone()));
        assert_eq!(store.count(), 1);
        assert!(store.get("test").is_some());
        assert!(store.get("other").is_none());

        store.add("test", EventSlot::new::<Test>(tx));
        assert_eq!(store.count(), 1);

        store.delete("test");
        assert!(store.get("test").is_none());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_slot_decodes_fresh_target() {
        let (tx, _rx) = mpsc::channel(1);
        let slot: EventSlot<(u32, u32)> = EventSlot::new::<Test>(tx);

        let first = slot.decode(&split_response("test1=1 test2=2")).unwrap();
        assert_eq!(first, (1, 2));
        // fields missing from the second notification are zero, not carried over
        let second = slot.decode(&split_response("test1=5")).unwrap();
        assert_eq!(second, (5, 0));
        assert!(slot.decode(&split_response("test1=x")).is_err());
    }

    #[test]
    fn test_clear_and_names() {
        let store: EventStore<Test> = EventStore::new();
        let (tx, _rx) = mpsc::channel(1);
        store.add("a", EventSlot::new::<Test>(tx.clone()));
        store.add("b", EventSlot::new::<Test>(tx));

        let mut names = store.names();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        store.clear();
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_close_all_ends_receivers() {
        let store: EventStore<Test> = EventStore::new();
        let (tx, mut rx) = mpsc::channel(1);
        store.add("a", EventSlot::new::<Test>(tx));

        store.close_all();
        assert_eq!(store.count(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_delete_if_closed() {
        let store: EventStore<Test> = EventStore::new();
        let (tx, rx) = mpsc::channel(1);
        store.add("a", EventSlot::new::<Test>(tx));

        assert!(!store.delete_if_closed("a"));
        drop(rx);
        assert!(store.delete_if_closed("a"));
        assert_eq!(store.count(), 0);
    }
}
