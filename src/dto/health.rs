use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of live sessions held in memory.
    pub active_sessions: usize,
    /// Number of rooms with an open SSE channel.
    pub streaming_rooms: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(active_sessions: usize, streaming_rooms: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_sessions,
            streaming_rooms,
        }
    }

    /// Create a health response indicating the storage backend is unreachable.
    pub fn degraded(active_sessions: usize, streaming_rooms: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            active_sessions,
            streaming_rooms,
        }
    }
}
