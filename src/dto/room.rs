use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{QuestionEntity, RoomEntity, RoomStatus},
    dto::{
        format_system_time,
        validation::{validate_option_indices, validate_room_code},
    },
};

/// Upper bound on the points a single question is worth.
pub const MAX_QUESTION_POINTS: u32 = 10_000;

/// Payload used to create a room together with its questions.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Maximum number of players; defaults to the server setting.
    #[serde(default)]
    #[validate(range(min = 1, max = 500))]
    pub max_players: Option<usize>,
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

/// Question definition supplied at room creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionInput {
    pub text: String,
    pub options: Vec<String>,
    /// Zero-based indices into `options`.
    pub correct_options: Vec<usize>,
    pub points: u32,
    pub time_limit_secs: u32,
    /// Position of the question; defaults to its position in the request.
    #[serde(default)]
    pub order: Option<i32>,
}

impl Validate for QuestionInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.text.trim().is_empty() {
            errors.add("text", message("blank", "Question text must not be blank"));
        }
        if self.options.len() < 2 {
            errors.add(
                "options",
                message("too_few_options", "A question needs at least two options"),
            );
        }
        if self.correct_options.is_empty() {
            errors.add(
                "correct_options",
                message("no_correct_option", "At least one option must be correct"),
            );
        } else if let Err(e) = validate_option_indices(&self.correct_options, self.options.len())
        {
            errors.add("correct_options", e);
        }
        if self.points == 0 {
            errors.add("points", message("zero_points", "Points must be positive"));
        } else if self.points > MAX_QUESTION_POINTS {
            errors.add(
                "points",
                message("too_many_points", "Points must not exceed 10000"),
            );
        }
        if self.time_limit_secs == 0 {
            errors.add(
                "time_limit_secs",
                message("zero_time_limit", "Time limit must be at least one second"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn message(code: &'static str, text: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(text.into());
    err
}

impl QuestionInput {
    /// Convert into a storable question; `position` is used when no order was given.
    pub fn into_entity(self, position: usize) -> QuestionEntity {
        let mut correct_options = self.correct_options;
        correct_options.sort_unstable();
        correct_options.dedup();
        QuestionEntity {
            id: Uuid::new_v4(),
            text: self.text,
            options: self.options,
            correct_options,
            points: self.points,
            time_limit_secs: self.time_limit_secs,
            order: self
                .order
                .unwrap_or_else(|| i32::try_from(position).unwrap_or(i32::MAX)),
        }
    }
}

/// Request sent by a student to join a room by its code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub code: String,
    #[validate(length(min = 1, max = 40))]
    pub name: String,
}

/// Returned to a student after joining.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinRoomResponse {
    pub room_id: Uuid,
    pub player_id: Uuid,
    pub name: String,
}

/// Returned once to the creator of a room; the owner token is never shown again.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedRoom {
    pub room: RoomSummary,
    /// Secret to send in the `X-Owner-Token` header for owner operations.
    pub owner_token: String,
}

/// Public projection of a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub status: RoomStatusDto,
    pub max_players: usize,
    pub question_count: usize,
    pub player_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl RoomSummary {
    pub fn new(room: &RoomEntity, question_count: usize, player_count: usize) -> Self {
        Self {
            id: room.id,
            code: room.code.clone(),
            name: room.name.clone(),
            status: room.status.into(),
            max_players: room.max_players,
            question_count,
            player_count,
            created_at: format_system_time(room.created_at),
            updated_at: format_system_time(room.updated_at),
        }
    }
}

/// Lifecycle status exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatusDto {
    Open,
    InProgress,
    Closed,
}

impl From<RoomStatus> for RoomStatusDto {
    fn from(value: RoomStatus) -> Self {
        match value {
            RoomStatus::Open => RoomStatusDto::Open,
            RoomStatus::InProgress => RoomStatusDto::InProgress,
            RoomStatus::Closed => RoomStatusDto::Closed,
        }
    }
}
