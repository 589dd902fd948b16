//! Bridges room events from the session registry onto per-room SSE channels.

use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, RoomEventEnvelope, ServerEvent},
    state::{
        SseHub,
        events::RoomEvent,
        hub::{EventListener, ListenerError},
        state_machine::GamePhase,
    },
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Listener that serialises every room event into the room's SSE channel.
pub struct SseForwarder {
    hub: SseHub,
}

impl SseForwarder {
    pub fn new(hub: SseHub) -> Self {
        Self { hub }
    }
}

impl EventListener for SseForwarder {
    fn on_event(&self, event: &RoomEvent) -> Result<(), ListenerError> {
        let message = ServerEvent::json(
            Some(event.name().to_string()),
            &RoomEventEnvelope::from(event),
        )
        .map_err(|err| ListenerError(format!("failed to serialize {}: {err}", event.name())))?;
        self.hub.broadcast(message);
        Ok(())
    }
}

/// First event sent to a freshly connected client.
pub fn handshake_event(room_id: Uuid, phase: Option<GamePhase>) -> Option<ServerEvent> {
    let payload = Handshake {
        room_id,
        message: "room stream connected".into(),
        phase,
    };
    match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(room_id = %room_id, error = %err, "failed to serialize SSE handshake");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::events::RoomEventKind;

    #[tokio::test]
    async fn forwarder_names_events_and_wraps_payload() {
        let hub = SseHub::new(4);
        let mut receiver = hub.subscribe();
        let forwarder = SseForwarder::new(hub.clone());
        let room_id = Uuid::new_v4();

        forwarder
            .on_event(&RoomEvent::now(
                room_id,
                RoomEventKind::TimeUpdate { time_remaining: 7 },
            ))
            .unwrap();

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.event.as_deref(), Some("time_update"));
        let data: serde_json::Value = serde_json::from_str(&message.data).unwrap();
        assert_eq!(data["type"], "time_update");
        assert_eq!(data["data"]["time_remaining"], 7);
        assert_eq!(data["room_id"], room_id.to_string());
    }

    #[test]
    fn forwarding_without_receivers_is_not_an_error() {
        let forwarder = SseForwarder::new(SseHub::new(1));
        let event = RoomEvent::now(Uuid::new_v4(), RoomEventKind::TimeUpdate { time_remaining: 1 });
        assert!(forwarder.on_event(&event).is_ok());
    }

    #[test]
    fn handshake_reports_the_phase() {
        let event = handshake_event(Uuid::nil(), Some(GamePhase::Question)).unwrap();
        assert_eq!(event.event.as_deref(), Some("handshake"));
        assert!(event.data.contains("\"phase\":\"question\""));
    }
}
