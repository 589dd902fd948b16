use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, post},
};
use uuid::Uuid;

use crate::{
    dto::game::SessionSnapshot,
    error::AppError,
    services::{game_service, room_service},
    state::SharedState,
};

const OWNER_TOKEN_HEADER: &str = "x-owner-token";

/// Owner-only endpoints driving a room's live session.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/rooms/{id}", delete(delete_room))
        .route("/admin/rooms/{id}/start", post(start_game))
        .route("/admin/rooms/{id}/cleanup", post(cleanup))
        .route_layer(middleware::from_fn_with_state(state, require_owner_token))
}

/// Start the room's game: snapshot the roster and questions, then open the first question.
#[utoipa::path(
    post,
    path = "/admin/rooms/{id}/start",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Identifier of the room"),
        ("X-Owner-Token" = String, Header, description = "Owner token returned at room creation")
    ),
    responses(
        (status = 200, description = "Game started", body = SessionSnapshot),
        (status = 401, description = "Missing or invalid owner token"),
        (status = 409, description = "Room already started or has no players")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(game_service::start_game(&state, id).await?))
}

/// Stop the live session, disconnect its event streams and close the room.
#[utoipa::path(
    post,
    path = "/admin/rooms/{id}/cleanup",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Identifier of the room"),
        ("X-Owner-Token" = String, Header, description = "Owner token returned at room creation")
    ),
    responses((status = 204, description = "Session cleaned up"))
)]
pub async fn cleanup(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::cleanup(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a room along with its questions, players and live session.
#[utoipa::path(
    delete,
    path = "/admin/rooms/{id}",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Identifier of the room"),
        ("X-Owner-Token" = String, Header, description = "Owner token returned at room creation")
    ),
    responses((status = 204, description = "Room deleted"))
)]
pub async fn delete_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    room_service::delete_room(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_owner_token(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(OWNER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned());

    room_service::authorize_owner(&state, id, provided.as_deref()).await?;
    Ok(next.run(req).await)
}
