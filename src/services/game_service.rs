//! Live game flow: starting a room's session, answers, snapshots and cleanup.

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::RoomStatus,
    dto::game::{AnswerRequest, AnswerResponse, SessionSnapshot},
    error::ServiceError,
    services::room_service::{load_room, set_status},
    state::{
        SharedState,
        game::{Player, Question},
    },
};

/// Snapshot the room's questions and roster into a session and start it.
pub async fn start_game(
    state: &SharedState,
    room_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let store = state.room_store();
    // Leaving `Open` first freezes the roster before it is read.
    store
        .transition_room(room_id, RoomStatus::Open, RoomStatus::InProgress)
        .await?;
    match open_session(state, room_id).await {
        Ok(()) => session_snapshot(state, room_id),
        Err(err) => {
            if let Err(revert) = store
                .transition_room(room_id, RoomStatus::InProgress, RoomStatus::Open)
                .await
            {
                warn!(room_id = %room_id, error = %revert, "failed to reopen room");
            }
            Err(err)
        }
    }
}

async fn open_session(state: &SharedState, room_id: Uuid) -> Result<(), ServiceError> {
    let store = state.room_store();
    let questions: Vec<Question> = store
        .questions_for_room(room_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let players: Vec<Player> = store
        .players_for_room(room_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    if players.is_empty() {
        return Err(ServiceError::InvalidState(
            "at least one player must join before starting".into(),
        ));
    }

    let sessions = state.sessions();
    sessions.create_session(room_id, questions, players)?;
    if let Err(err) = sessions.start_game(room_id) {
        sessions.cleanup(room_id);
        return Err(err.into());
    }
    Ok(())
}

/// Score an answer for the open question.
pub fn submit_answer(
    state: &SharedState,
    room_id: Uuid,
    request: AnswerRequest,
) -> Result<AnswerResponse, ServiceError> {
    let outcome = state.sessions().submit_answer(
        room_id,
        request.player_id,
        &request.selected_options,
        request.response_time_secs,
    )?;
    Ok(outcome.into())
}

/// Current view of the room's live session.
pub fn session_snapshot(state: &SharedState, room_id: Uuid) -> Result<SessionSnapshot, ServiceError> {
    state
        .sessions()
        .get_session(room_id)
        .map(|session| SessionSnapshot::from(&session))
        .ok_or_else(|| ServiceError::NotFound(format!("no live session for room `{room_id}`")))
}

/// Stop the room's live session, disconnect its streams and close the room.
///
/// Safe to call repeatedly.
pub async fn cleanup(state: &SharedState, room_id: Uuid) -> Result<(), ServiceError> {
    let room = load_room(state, room_id).await?;
    // Closed before the channel goes away so no new stream can reopen it.
    let closed = set_status(state, room, RoomStatus::Closed).await;
    state.sessions().cleanup(room_id);
    state.release_room_sse(room_id);
    closed
}
