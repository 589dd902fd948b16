use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage reachability along with live session counters.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let active_sessions = state.sessions().session_count();
    let streaming_rooms = state.sse_room_count();

    match state.room_store().health_check().await {
        Ok(()) => HealthResponse::ok(active_sessions, streaming_rooms),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(active_sessions, streaming_rooms)
        }
    }
}
