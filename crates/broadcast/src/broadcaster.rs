use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    tokio::sync::mpsc,
    tracing::{debug, trace},
};

use crate::events::Event;

/// How many undelivered events an observer may lag behind before updates are
/// dropped for it. Delivery is best-effort; observers reconcile on reconnect.
const OBSERVER_BUFFER: usize = 32;

struct Observer {
    id: u64,
    tx: mpsc::Sender<Event>,
}

/// Handle returned by [`ProgressBroadcaster::subscribe`].
///
/// Dropping the receiver is enough to stop delivery; [`ProgressBroadcaster::unsubscribe`]
/// removes the entry eagerly instead of waiting for the next emit to prune it.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<Event>,
}

/// Pub/sub registry of connected observers, keyed by owner id.
///
/// Held behind an `Arc` and injected wherever events originate (engine,
/// channel registry, webhook processing). Uses a `std::sync::RwLock` because
/// all operations are synchronous map lookups, never held across `.await`.
#[derive(Default)]
pub struct ProgressBroadcaster {
    rooms: RwLock<HashMap<String, Vec<Observer>>>,
    next_id: AtomicU64,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll an observer into the room named by `owner_id`.
    pub fn subscribe(&self, owner_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(OBSERVER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(owner_id.to_string())
            .or_default()
            .push(Observer { id, tx });
        debug!(owner_id, observer = id, "observer subscribed");
        Subscription { id, rx }
    }

    /// Remove one observer from an owner's room.
    pub fn unsubscribe(&self, owner_id: &str, observer_id: u64) {
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        if let Some(observers) = rooms.get_mut(owner_id) {
            observers.retain(|o| o.id != observer_id);
            if observers.is_empty() {
                rooms.remove(owner_id);
            }
        }
        debug!(owner_id, observer = observer_id, "observer unsubscribed");
    }

    /// Deliver an event to every observer in an owner's room.
    ///
    /// Never blocks: a full or closed observer channel drops the event for
    /// that observer only. Closed observers are pruned as a side effect.
    pub fn emit(&self, owner_id: &str, event: Event) {
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        let Some(observers) = rooms.get_mut(owner_id) else {
            trace!(owner_id, "no observers for event");
            return;
        };
        observers.retain(|observer| match observer.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(owner_id, observer = observer.id, "observer lagging, event dropped");
                true
            },
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if observers.is_empty() {
            rooms.remove(owner_id);
        }
    }

    /// Number of observers currently enrolled for an owner.
    pub fn observer_count(&self, owner_id: &str) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(|e| e.into_inner());
        rooms.get(owner_id).map_or(0, Vec::len)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn status_event(status: &str) -> Event {
        Event::CampaignStatusUpdate {
            campaign_id: "c1".into(),
            status: status.into(),
        }
    }

    #[tokio::test]
    async fn delivers_to_own_room_only() {
        let broadcaster = ProgressBroadcaster::new();
        let mut alice = broadcaster.subscribe("alice");
        let mut bob = broadcaster.subscribe("bob");

        broadcaster.emit("alice", status_event("running"));

        let got = alice.rx.recv().await.unwrap();
        assert!(matches!(got, Event::CampaignStatusUpdate { ref status, .. } if status == "running"));
        assert!(bob.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_without_observers_is_noop() {
        let broadcaster = ProgressBroadcaster::new();
        broadcaster.emit("nobody", status_event("completed"));
        assert_eq!(broadcaster.observer_count("nobody"), 0);
    }

    #[tokio::test]
    async fn dropped_observer_is_pruned_on_emit() {
        let broadcaster = ProgressBroadcaster::new();
        let sub = broadcaster.subscribe("alice");
        drop(sub.rx);
        assert_eq!(broadcaster.observer_count("alice"), 1);

        broadcaster.emit("alice", status_event("paused"));
        assert_eq!(broadcaster.observer_count("alice"), 0);
    }

    #[tokio::test]
    async fn unsubscribe_removes_observer() {
        let broadcaster = ProgressBroadcaster::new();
        let sub = broadcaster.subscribe("alice");
        broadcaster.unsubscribe("alice", sub.id);
        assert_eq!(broadcaster.observer_count("alice"), 0);
    }

    #[tokio::test]
    async fn lagging_observer_misses_events_but_stays() {
        let broadcaster = ProgressBroadcaster::new();
        let mut sub = broadcaster.subscribe("alice");

        for i in 0..(OBSERVER_BUFFER + 5) {
            broadcaster.emit("alice", status_event(&format!("s{i}")));
        }
        // Still enrolled; only the buffered prefix is observable.
        assert_eq!(broadcaster.observer_count("alice"), 1);
        let mut received = 0;
        while sub.rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, OBSERVER_BUFFER);
    }

    #[tokio::test]
    async fn two_observers_same_room_both_receive() {
        let broadcaster = ProgressBroadcaster::new();
        let mut first = broadcaster.subscribe("alice");
        let mut second = broadcaster.subscribe("alice");

        broadcaster.emit("alice", status_event("running"));

        assert!(first.rx.recv().await.is_some());
        assert!(second.rx.recv().await.is_some());
    }
}
