use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Live Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::game::get_session,
        crate::routes::game::submit_answer,
        crate::routes::sse::room_stream,
        crate::routes::admin::start_game,
        crate::routes::admin::cleanup,
        crate::routes::admin::delete_room,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::QuestionInput,
            crate::dto::room::CreatedRoom,
            crate::dto::room::RoomSummary,
            crate::dto::room::RoomStatusDto,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::JoinRoomResponse,
            crate::dto::game::AnswerRequest,
            crate::dto::game::AnswerResponse,
            crate::dto::game::SessionSnapshot,
            crate::dto::sse::Handshake,
            crate::state::state_machine::GamePhase,
            crate::state::events::StateChange,
            crate::state::events::QuestionStart,
            crate::state::events::QuestionPayload,
            crate::state::events::PlayerAnswer,
            crate::state::events::LeaderboardEntry,
            crate::state::events::FinalStanding,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room creation and student joins"),
        (name = "game", description = "Live session queries and answers"),
        (name = "admin", description = "Owner operations guarded by the X-Owner-Token header"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
