use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Lifecycle of a room as seen by the storage layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Accepting players, game not started yet.
    Open,
    /// A live session was started.
    InProgress,
    /// The live session was cleaned up.
    Closed,
}

/// Quiz room persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Short code students type to join (6 uppercase alphanumerics).
    pub code: String,
    /// Display name of the room.
    pub name: String,
    /// Opaque secret handed to the creator, required for owner operations.
    pub owner_token: String,
    /// Maximum number of players allowed to join.
    pub max_players: usize,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the room was updated.
    pub updated_at: SystemTime,
}

/// Question attached to a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier of the question.
    pub id: Uuid,
    /// Prompt text.
    pub text: String,
    /// Answer options.
    pub options: Vec<String>,
    /// Indices of the correct options.
    pub correct_options: Vec<usize>,
    /// Maximum points for a correct answer.
    pub points: u32,
    /// Seconds allowed to answer.
    pub time_limit_secs: u32,
    /// Position of the question within the room.
    pub order: i32,
}

/// Player who joined a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier of the player.
    pub id: Uuid,
    /// Display name chosen when joining.
    pub name: String,
    /// When the player joined.
    pub joined_at: SystemTime,
}
