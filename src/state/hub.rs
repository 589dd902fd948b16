use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use dashmap::DashMap;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::state::{events::RoomEvent, game::RoomId};

/// Handle returned by [`BroadcastHub::subscribe`], used to unsubscribe.
pub type SubscriptionId = Uuid;

/// Failure reported by a listener; logged by the hub and otherwise ignored.
#[derive(Debug, Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

/// Receiver of room events.
///
/// Listeners are invoked synchronously while the room is locked, so they
/// must return quickly and must not call back into the session registry.
pub trait EventListener: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &RoomEvent) -> Result<(), ListenerError>;
}

impl<F> EventListener for F
where
    F: Fn(&RoomEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &RoomEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

type Listeners = Vec<(SubscriptionId, Arc<dyn EventListener>)>;

/// Per-room listener lists with ordered, fault-isolated delivery.
#[derive(Default)]
pub struct BroadcastHub {
    rooms: DashMap<RoomId, Listeners>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for every subsequent event of `room_id`.
    pub fn subscribe(&self, room_id: RoomId, listener: Arc<dyn EventListener>) -> SubscriptionId {
        let id = Uuid::new_v4();
        self.rooms.entry(room_id).or_default().push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, room_id: RoomId, subscription: SubscriptionId) -> bool {
        let Some(mut listeners) = self.rooms.get_mut(&room_id) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != subscription);
        before != listeners.len()
    }

    /// Drop every listener of `room_id`.
    pub fn release(&self, room_id: RoomId) {
        self.rooms.remove(&room_id);
    }

    /// Number of listeners attached to `room_id`.
    pub fn listener_count(&self, room_id: RoomId) -> usize {
        self.rooms
            .get(&room_id)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    /// Deliver `event` to the room's listeners in subscription order.
    ///
    /// A listener that errors or panics is logged and skipped; the remaining
    /// listeners still receive the event.
    pub fn publish(&self, event: &RoomEvent) {
        let listeners: Listeners = match self.rooms.get(&event.room_id) {
            Some(listeners) => listeners.clone(),
            None => return,
        };

        for (subscription, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    room_id = %event.room_id,
                    subscription = %subscription,
                    event = event.name(),
                    error = %err,
                    "room listener failed"
                ),
                Err(_) => warn!(
                    room_id = %event.room_id,
                    subscription = %subscription,
                    event = event.name(),
                    "room listener panicked"
                ),
            }
        }
    }
}
