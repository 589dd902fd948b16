use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::{
    dto::sse::ServerEvent,
    services::sse_events::SseForwarder,
    state::{game::RoomId, hub::SubscriptionId, registry::SessionRegistry},
};

/// Per-room SSE channels, each fed by a forwarder attached to the room's events.
pub struct SseState {
    capacity: usize,
    rooms: DashMap<RoomId, RoomStream>,
}

struct RoomStream {
    hub: SseHub,
    subscription: SubscriptionId,
}

impl SseState {
    /// Build an empty SSE state; every room channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rooms: DashMap::new(),
        }
    }

    /// Channel of `room_id`, created and wired to the registry on first use.
    pub fn room(&self, room_id: RoomId, registry: &SessionRegistry) -> SseHub {
        self.rooms
            .entry(room_id)
            .or_insert_with(|| {
                let hub = SseHub::new(self.capacity);
                let subscription =
                    registry.subscribe(room_id, Arc::new(SseForwarder::new(hub.clone())));
                RoomStream { hub, subscription }
            })
            .hub
            .clone()
    }

    /// Drop the room's channel, which ends every stream attached to it.
    pub fn release(&self, room_id: RoomId, registry: &SessionRegistry) {
        if let Some((_, stream)) = self.rooms.remove(&room_id) {
            registry.unsubscribe(room_id, stream.subscription);
        }
    }

    /// Number of rooms with an open SSE channel.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
