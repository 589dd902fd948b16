use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        events::{RoomEvent, RoomEventKind},
        state_machine::GamePhase,
    },
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    pub room_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Phase of the live session, absent until the game is started.
    pub phase: Option<GamePhase>,
}

#[derive(Debug, Serialize)]
/// Wire form of a room event: `{ room_id, timestamp, type, data }`.
pub struct RoomEventEnvelope<'a> {
    pub room_id: Uuid,
    pub timestamp: String,
    #[serde(flatten)]
    pub kind: &'a RoomEventKind,
}

impl<'a> From<&'a RoomEvent> for RoomEventEnvelope<'a> {
    fn from(event: &'a RoomEvent) -> Self {
        Self {
            room_id: event.room_id,
            timestamp: format_system_time(event.timestamp),
            kind: &event.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_flattens_the_event_kind() {
        let room_id = Uuid::nil();
        let event = RoomEvent {
            room_id,
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
            kind: RoomEventKind::TimeUpdate { time_remaining: 4 },
        };

        let value = serde_json::to_value(RoomEventEnvelope::from(&event)).unwrap();
        assert_eq!(
            value,
            json!({
                "room_id": room_id,
                "timestamp": "1970-01-01T00:01:00Z",
                "type": "time_update",
                "data": { "time_remaining": 4 }
            })
        );
    }
}
