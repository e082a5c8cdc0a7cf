//! The room-based broadcast registry: `world:{worldId}` and
//! `settlement:{id}` publish-subscribe channels.
//!
//! Every event is delivered to a room's subscribers in emission order,
//! except `ConstructionProgressBatch`, which is intentionally
//! latest-value-only so a slow subscriber drops stale progress instead of
//! falling behind. Lifecycle events are never dropped: each subscriber's
//! lifecycle channel is unbounded, since lifecycle event volume is low
//! relative to per-second progress batches.

use std::collections::HashMap;
use std::sync::RwLock;

use settlement_types::{OutboundEvent, RoomKey};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Identifies one subscriber's channel pair within a room.
pub type SubscriberId = Uuid;

/// A subscriber's two delivery channels: an unbounded FIFO for lifecycle
/// events, and a latest-value slot for construction-progress batches.
/// The consumer (the event-channel WebSocket writer) polls both with
/// `tokio::select!`.
pub struct Subscription {
    /// This subscription's unique id, used to [`BroadcastRegistry::leave`].
    pub id: SubscriberId,
    /// Lifecycle events, delivered in emission order, never dropped.
    pub lifecycle: mpsc::UnboundedReceiver<OutboundEvent>,
    /// The most recent undelivered `ConstructionProgressBatch`, if any.
    pub progress: watch::Receiver<Option<OutboundEvent>>,
}

#[derive(Default)]
struct RoomSubscribers {
    lifecycle: HashMap<SubscriberId, mpsc::UnboundedSender<OutboundEvent>>,
    progress: HashMap<SubscriberId, watch::Sender<Option<OutboundEvent>>>,
}

/// The process-wide room registry. Rooms are sharded implicitly by
/// [`RoomKey`] (which embeds the world or settlement id), so unrelated
/// worlds never contend on the same lock beyond the top-level map.
#[derive(Default)]
pub struct BroadcastRegistry {
    rooms: RwLock<HashMap<RoomKey, RoomSubscribers>>,
}

impl BroadcastRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a room, returning the new subscription's two receive
    /// channels. Call [`Self::leave`] with the returned id on
    /// disconnect.
    pub fn join(&self, room: RoomKey) -> Subscription {
        let id = Uuid::new_v4();
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = watch::channel(None);

        let mut rooms = self.rooms.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let subscribers = rooms.entry(room).or_default();
        subscribers.lifecycle.insert(id, lifecycle_tx);
        subscribers.progress.insert(id, progress_tx);

        Subscription {
            id,
            lifecycle: lifecycle_rx,
            progress: progress_rx,
        }
    }

    /// Remove a subscription from a room. A no-op if already removed.
    pub fn leave(&self, room: &RoomKey, id: SubscriberId) {
        let mut rooms = self.rooms.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(subscribers) = rooms.get_mut(room) {
            subscribers.lifecycle.remove(&id);
            subscribers.progress.remove(&id);
            if subscribers.lifecycle.is_empty() && subscribers.progress.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Publish an event to every subscriber of `room`. Returns the number
    /// of subscribers the event was handed to (a disconnected
    /// subscriber's dropped receiver does not count as a send failure;
    /// it is simply skipped).
    pub fn publish(&self, room: &RoomKey, event: OutboundEvent) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(subscribers) = rooms.get(room) else {
            return 0;
        };

        if event.is_droppable_progress() {
            let mut delivered = 0;
            for sender in subscribers.progress.values() {
                if sender.send(Some(event.clone())).is_ok() {
                    delivered += 1;
                }
            }
            delivered
        } else {
            let mut delivered = 0;
            for sender in subscribers.lifecycle.values() {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
            delivered
        }
    }

    /// The number of active subscribers across every room, for metrics.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        rooms.values().map(|s| s.lifecycle.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::WorldId;

    fn connected(timestamp: chrono::DateTime<chrono::Utc>) -> OutboundEvent {
        OutboundEvent::Connected { timestamp }
    }

    #[test]
    fn publish_with_no_subscribers_delivers_to_nobody() {
        let registry = BroadcastRegistry::new();
        let room = RoomKey::World(WorldId::new());
        assert_eq!(registry.publish(&room, connected(chrono::Utc::now())), 0);
    }

    #[test]
    fn lifecycle_events_are_delivered_in_order() {
        let registry = BroadcastRegistry::new();
        let room = RoomKey::World(WorldId::new());
        let mut sub = registry.join(room.clone());

        let first = connected(chrono::Utc::now());
        let second = OutboundEvent::Authenticated { timestamp: chrono::Utc::now() };
        registry.publish(&room, first.clone());
        registry.publish(&room, second.clone());

        assert_eq!(sub.lifecycle.try_recv().unwrap(), first);
        assert_eq!(sub.lifecycle.try_recv().unwrap(), second);
    }

    #[test]
    fn progress_batches_keep_only_the_latest() {
        let registry = BroadcastRegistry::new();
        let world_id = WorldId::new();
        let room = RoomKey::World(world_id);
        let sub = registry.join(room.clone());

        let stale = OutboundEvent::ConstructionProgressBatch {
            world_id,
            constructions: vec![],
            timestamp: chrono::Utc::now(),
        };
        let fresh = OutboundEvent::ConstructionProgressBatch {
            world_id,
            constructions: vec![],
            timestamp: chrono::Utc::now() + chrono::Duration::seconds(1),
        };
        registry.publish(&room, stale);
        registry.publish(&room, fresh.clone());

        assert_eq!(*sub.progress.borrow(), Some(fresh));
    }

    #[test]
    fn leave_stops_further_delivery() {
        let registry = BroadcastRegistry::new();
        let room = RoomKey::World(WorldId::new());
        let sub = registry.join(room.clone());
        registry.leave(&room, sub.id);

        assert_eq!(registry.publish(&room, connected(chrono::Utc::now())), 0);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn settlement_and_world_rooms_are_independent() {
        let registry = BroadcastRegistry::new();
        let world_id = WorldId::new();
        let world_room = RoomKey::World(world_id);
        let settlement_room = RoomKey::Settlement(settlement_types::SettlementId::new());

        let mut world_sub = registry.join(world_room.clone());
        let _settlement_sub = registry.join(settlement_room.clone());

        registry.publish(&world_room, connected(chrono::Utc::now()));
        assert!(world_sub.lifecycle.try_recv().is_ok());
        assert_eq!(registry.subscriber_count(), 2);
    }
}
