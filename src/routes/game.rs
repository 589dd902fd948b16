use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{AnswerRequest, AnswerResponse, SessionSnapshot},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes exposing a room's live session to players.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{id}/session", get(get_session))
        .route("/rooms/{id}/answers", post(submit_answer))
}

/// Current state of the room's live session.
#[utoipa::path(
    get,
    path = "/rooms/{id}/session",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 404, description = "No live session for this room")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(game_service::session_snapshot(&state, id)?))
}

/// Submit an answer for the open question. Only the first answer per player counts.
#[utoipa::path(
    post,
    path = "/rooms/{id}/answers",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer scored", body = AnswerResponse),
        (status = 404, description = "Unknown room or player"),
        (status = 409, description = "No open question or already answered")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<AnswerResponse>, AppError> {
    Ok(Json(game_service::submit_answer(&state, id, payload)?))
}
