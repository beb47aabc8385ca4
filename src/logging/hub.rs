//! Live subscriber registry
//!
//! Each subscriber owns a bounded queue. `publish` never waits: a subscriber
//! whose queue is full or closed is dropped from the registry on the spot, and
//! everyone else still gets the payload.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

pub type SubscriberId = u64;

/// Shared payload handed to every subscriber
pub type Payload = Arc<str>;

/// Receiving end of a subscription
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Payload>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next payload; `None` once the hub dropped this subscriber or closed
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }
}

/// Registry of live subscribers
pub struct BroadcastHub {
    capacity: usize,
    next_id: AtomicU64,
    closed: AtomicBool,
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Payload>>>,
}

impl BroadcastHub {
    /// `capacity` is the per-subscriber backlog tolerated before it is dropped
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new subscriber. After `close()` the returned subscription
    /// is already finished.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut subs = self.subscribers.write();
        if !self.closed.load(Ordering::Acquire) {
            subs.insert(id, tx);
            debug!("Subscriber {} attached ({} active)", id, subs.len());
        }

        Subscription { id, rx }
    }

    /// Remove a subscriber; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.write().remove(&id).is_some() {
            debug!("Subscriber {} detached", id);
        }
    }

    /// Deliver to every registered subscriber. Returns how many accepted it.
    pub fn publish(&self, payload: &str) -> usize {
        let payload: Payload = Arc::from(payload);
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let subs = self.subscribers.read();
            for (id, tx) in subs.iter() {
                match tx.try_send(Arc::clone(&payload)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        debug!("Subscriber {} is lagging, dropping it", id);
                        dead.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Subscriber {} disconnected", id);
                        dead.push(*id);
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut subs = self.subscribers.write();
            for id in dead {
                subs.remove(&id);
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Detach everyone. Pending payloads stay readable, then `recv` yields `None`.
    pub fn close(&self) {
        let mut subs = self.subscribers.write();
        self.closed.store(true, Ordering::Release);
        subs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all() {
        let hub = BroadcastHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish("hello"), 2);
        assert_eq!(a.try_recv().as_deref(), Some("hello"));
        assert_eq!(b.try_recv().as_deref(), Some("hello"));
    }

    #[test]
    fn test_disconnected_subscriber_isolated() {
        let hub = BroadcastHub::new(8);
        let mut alive = hub.subscribe();
        let gone = hub.subscribe();
        drop(gone);

        assert_eq!(hub.publish("still here"), 1);
        assert_eq!(alive.try_recv().as_deref(), Some("still here"));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_lagging_subscriber_dropped() {
        let hub = BroadcastHub::new(2);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        for i in 0..3 {
            hub.publish(&i.to_string());
            let _ = fast.try_recv();
        }

        assert_eq!(hub.subscriber_count(), 1);
        // Backlog before the drop is still readable, then the stream ends.
        assert_eq!(slow.try_recv().as_deref(), Some("0"));
        assert_eq!(slow.try_recv().as_deref(), Some("1"));
        assert!(slow.try_recv().is_none());
    }

    #[test]
    fn test_unsubscribe() {
        let hub = BroadcastHub::new(8);
        let mut sub = hub.subscribe();
        hub.unsubscribe(sub.id());
        hub.unsubscribe(9999);

        assert_eq!(hub.publish("nobody"), 0);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_subscribe_after_close_is_finished() {
        let hub = BroadcastHub::new(8);
        hub.close();
        let mut sub = hub.subscribe();

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish("x"), 0);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_close_ends_streams() {
        let hub = BroadcastHub::new(8);
        let mut sub = hub.subscribe();
        hub.publish("last");
        hub.close();

        assert_eq!(sub.recv().await.as_deref(), Some("last"));
        assert!(sub.recv().await.is_none());
    }
}
