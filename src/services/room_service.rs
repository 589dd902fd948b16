//! Room management: creation with questions, lookup, student joins and deletion.

use std::time::SystemTime;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{PlayerEntity, RoomEntity, RoomStatus},
        storage::StorageError,
    },
    dto::{
        room::{CreateRoomRequest, CreatedRoom, JoinRoomRequest, JoinRoomResponse, RoomSummary},
        validation::ROOM_CODE_LENGTH,
    },
    error::ServiceError,
    state::SharedState,
};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_ATTEMPTS: usize = 8;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Create a room with its questions and hand the owner token back to the caller.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<CreatedRoom, ServiceError> {
    let store = state.room_store();
    let now = SystemTime::now();
    let questions: Vec<_> = request
        .questions
        .into_iter()
        .enumerate()
        .map(|(position, question)| question.into_entity(position))
        .collect();
    let question_count = questions.len();

    let mut attempt = 0;
    let room = loop {
        attempt += 1;
        let room = RoomEntity {
            id: Uuid::new_v4(),
            code: generate_room_code(),
            name: request.name.clone(),
            owner_token: Uuid::new_v4().simple().to_string(),
            max_players: request
                .max_players
                .unwrap_or_else(|| state.config().max_players_per_room()),
            status: RoomStatus::Open,
            created_at: now,
            updated_at: now,
        };
        match store.create_room(room.clone()).await {
            Ok(()) => break room,
            Err(StorageError::Conflict(reason)) if attempt < ROOM_CODE_ATTEMPTS => {
                warn!(attempt, reason = %reason, "room code collision; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    };

    store.save_questions(room.id, questions).await?;
    info!(room_id = %room.id, code = %room.code, questions = question_count, "room created");

    Ok(CreatedRoom {
        room: RoomSummary::new(&room, question_count, 0),
        owner_token: room.owner_token.clone(),
    })
}

/// Load a room or fail with not found.
pub async fn load_room(state: &SharedState, room_id: Uuid) -> Result<RoomEntity, ServiceError> {
    state
        .room_store()
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))
}

async fn summarize(state: &SharedState, room: &RoomEntity) -> Result<RoomSummary, ServiceError> {
    let store = state.room_store();
    let questions = store.questions_for_room(room.id).await?;
    let players = store.players_for_room(room.id).await?;
    Ok(RoomSummary::new(room, questions.len(), players.len()))
}

/// Public summary of one room.
pub async fn get_room(state: &SharedState, room_id: Uuid) -> Result<RoomSummary, ServiceError> {
    let room = load_room(state, room_id).await?;
    summarize(state, &room).await
}

/// Summaries of every room, oldest first.
pub async fn list_rooms(state: &SharedState) -> Result<Vec<RoomSummary>, ServiceError> {
    let rooms = state.room_store().list_rooms().await?;
    let mut summaries = Vec::with_capacity(rooms.len());
    for room in &rooms {
        match summarize(state, room).await {
            Ok(summary) => summaries.push(summary),
            // deleted between the listing and the lookup
            Err(ServiceError::NotFound(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(summaries)
}

/// Add a student to the room identified by its join code.
///
/// Joining is only possible while the room is open; the roster is frozen once
/// the game starts.
pub async fn join_room(
    state: &SharedState,
    request: JoinRoomRequest,
) -> Result<JoinRoomResponse, ServiceError> {
    let store = state.room_store();
    let room = store
        .find_room_by_code(request.code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room code `{}`", request.code)))?;

    if room.status != RoomStatus::Open {
        return Err(ServiceError::InvalidState(format!(
            "room `{}` no longer accepts players",
            room.code
        )));
    }

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("player name must not be blank".into()));
    }

    let player = PlayerEntity {
        id: Uuid::new_v4(),
        name: name.clone(),
        joined_at: SystemTime::now(),
    };
    store.add_player(room.id, player.clone(), room.max_players).await?;
    info!(room_id = %room.id, player_id = %player.id, "player joined");

    Ok(JoinRoomResponse {
        room_id: room.id,
        player_id: player.id,
        name,
    })
}

/// Check `token` against the owner token of `room_id`.
pub async fn authorize_owner(
    state: &SharedState,
    room_id: Uuid,
    token: Option<&str>,
) -> Result<(), ServiceError> {
    let room = load_room(state, room_id).await?;
    match token {
        Some(token) if token == room.owner_token => Ok(()),
        Some(_) => Err(ServiceError::Unauthorized("invalid owner token".into())),
        None => Err(ServiceError::Unauthorized("missing owner token".into())),
    }
}

/// Delete a room, then tear down its live session and SSE channel.
pub async fn delete_room(state: &SharedState, room_id: Uuid) -> Result<(), ServiceError> {
    let existed = state.room_store().delete_room(room_id).await?;
    state.sessions().cleanup(room_id);
    state.release_room_sse(room_id);

    if existed {
        info!(room_id = %room_id, "room deleted");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("room `{room_id}`")))
    }
}

/// Persist a new status for `room`.
pub(crate) async fn set_status(
    state: &SharedState,
    mut room: RoomEntity,
    status: RoomStatus,
) -> Result<(), ServiceError> {
    if room.status == status {
        return Ok(());
    }
    room.status = status;
    room.updated_at = SystemTime::now();
    state.room_store().update_room(room).await?;
    Ok(())
}
