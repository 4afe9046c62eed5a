//! Change notifier.
//!
//! Fans every committed change out to all connected subscribers. Each
//! subscriber owns a bounded queue; publishing uses `try_send` and never waits
//! on a slow reader. A subscriber whose queue is full is dropped and must
//! reconnect and resync.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::event::ChangeEvent;
use crate::ids::SessionId;

/// One encoded feed frame, shared by every subscriber it is delivered to.
pub type Frame = Arc<str>;

#[derive(Debug)]
pub struct ChangeNotifier {
    capacity: usize,
    subscribers: Mutex<HashMap<SessionId, mpsc::Sender<Frame>>>,
    published: AtomicU64,
    dropped_subscribers: AtomicU64,
}

/// Receiving end of one subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    rx: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Next frame, or `None` once the notifier has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    pub fn into_receiver(self) -> mpsc::Receiver<Frame> {
        self.rx
    }
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(HashMap::new()),
            published: AtomicU64::new(0),
            dropped_subscribers: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock_subscribers().insert(id, tx);
        tracing::debug!(session = %id, "feed subscriber connected");
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: SessionId) {
        self.lock_subscribers().remove(&id);
    }

    /// Delivers `event` to every current subscriber without blocking.
    ///
    /// Frames are enqueued under one lock, so all subscribers receive events
    /// in the same order the publishers committed them.
    pub fn publish(&self, event: &ChangeEvent) {
        let frame: Frame = match event.encode() {
            Ok(text) => text.into(),
            Err(err) => {
                tracing::error!(error = %err, kind = %event.kind(), "failed to encode change event");
                return;
            }
        };
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|session, tx| match tx.try_send(Arc::clone(&frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_subscribers.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(session = %session, "feed subscriber lagging, dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(session = %session, "feed subscriber gone");
                false
            }
        });
    }

    /// Closes every subscription. Subscribers observe a disconnect.
    pub fn disconnect_all(&self) {
        let mut subscribers = self.lock_subscribers();
        let count = subscribers.len();
        subscribers.clear();
        tracing::info!(count, "all feed subscribers disconnected");
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Subscribers dropped because their queue overflowed.
    pub fn dropped_subscribers(&self) -> u64 {
        self.dropped_subscribers.load(Ordering::Relaxed)
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, mpsc::Sender<Frame>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::feed::{EventKind, FeedMessage};
    use crate::ids::{AlchemistId, TransmutationId};
    use crate::lifecycle::Transmutation;
    use crate::pricing::{PricingModel, SimulationRequest};

    fn event(id: u64) -> ChangeEvent {
        let estimate = PricingModel::new(30)
            .simulate(&SimulationRequest::default(), &InMemoryCatalog::default());
        ChangeEvent::Started(Transmutation::new(
            TransmutationId(id),
            AlchemistId(1),
            "Gold".into(),
            &estimate,
        ))
    }

    fn decoded_id(frame: &Frame) -> u64 {
        match FeedMessage::decode(frame).unwrap() {
            FeedMessage::Change(ev) => {
                assert_eq!(ev.kind(), EventKind::Started);
                ev.data().id.0
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn every_subscriber_receives_every_event_in_order() {
        let notifier = ChangeNotifier::new(8);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        for id in 1..=3 {
            notifier.publish(&event(id));
        }

        for sub in [&mut a, &mut b] {
            let ids: Vec<_> = std::iter::from_fn(|| sub.try_recv())
                .map(|f| decoded_id(&f))
                .collect();
            assert_eq!(ids, vec![1, 2, 3]);
        }
        assert_eq!(notifier.published_count(), 3);
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let notifier = ChangeNotifier::new(8);
        notifier.publish(&event(1));
        let mut late = notifier.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped_without_blocking_others() {
        let notifier = ChangeNotifier::new(2);
        let mut slow = notifier.subscribe();
        let mut fast = notifier.subscribe();

        for id in 1..=2 {
            notifier.publish(&event(id));
            fast.try_recv().unwrap();
        }
        // Third event overflows the slow queue.
        notifier.publish(&event(3));
        assert_eq!(decoded_id(&fast.try_recv().unwrap()), 3);

        assert_eq!(notifier.dropped_subscribers(), 1);
        assert_eq!(notifier.subscriber_count(), 1);

        // The slow subscriber drains what it had, then sees the disconnect.
        assert!(slow.recv().await.is_some());
        assert!(slow.recv().await.is_some());
        assert!(slow.recv().await.is_none());
    }

    #[test]
    fn dropped_subscriptions_are_pruned_on_publish() {
        let notifier = ChangeNotifier::new(4);
        let sub = notifier.subscribe();
        drop(sub);
        notifier.publish(&event(1));
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(notifier.dropped_subscribers(), 0);
    }

    #[tokio::test]
    async fn disconnect_all_closes_streams() {
        let notifier = ChangeNotifier::new(4);
        let mut sub = notifier.subscribe();
        notifier.disconnect_all();
        assert!(sub.recv().await.is_none());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_removes_subscriber() {
        let notifier = ChangeNotifier::new(4);
        let sub = notifier.subscribe();
        notifier.unsubscribe(sub.id());
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
