//! Typed notifications produced by the live session core.

use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::game::{PlayerId, Question, RoomId};

/// A notification about one room, in the order the session produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    /// Room the event belongs to.
    pub room_id: RoomId,
    /// When the event was produced.
    pub timestamp: SystemTime,
    /// Event-specific payload.
    pub kind: RoomEventKind,
}

impl RoomEvent {
    /// Stamp `kind` for `room_id` with the current time.
    pub fn now(room_id: RoomId, kind: RoomEventKind) -> Self {
        Self {
            room_id,
            timestamp: SystemTime::now(),
            kind,
        }
    }

    /// Wire name of the event kind.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Payload of a [`RoomEvent`], one variant per event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RoomEventKind {
    /// The session entered a phase that has no dedicated event.
    StateChange(StateChange),
    /// A question opened for answers.
    QuestionStart(QuestionStart),
    /// The countdown of the open question ticked.
    TimeUpdate {
        /// Seconds left, never negative.
        time_remaining: u32,
    },
    /// A player submitted an answer.
    PlayerAnswer(PlayerAnswer),
    /// Ranked scores after a question.
    LeaderboardUpdate {
        /// Players ranked by descending score.
        leaderboard: Vec<LeaderboardEntry>,
    },
}

impl RoomEventKind {
    /// Wire name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEventKind::StateChange(_) => "state_change",
            RoomEventKind::QuestionStart(_) => "question_start",
            RoomEventKind::TimeUpdate { .. } => "time_update",
            RoomEventKind::PlayerAnswer(_) => "player_answer",
            RoomEventKind::LeaderboardUpdate { .. } => "leaderboard_update",
        }
    }
}

/// Phase changes carried by `state_change` events.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StateChange {
    /// The game started; the first question follows after the start delay.
    Starting {
        /// Number of questions in the session.
        total_questions: usize,
    },
    /// The countdown ended; the correct options are revealed.
    AnswerReveal {
        /// 1-based position of the revealed question.
        question_number: usize,
        /// Indices of the correct options.
        correct_options: Vec<usize>,
    },
    /// The session is over.
    Finished {
        /// Final ranking with accuracy.
        final_leaderboard: Vec<FinalStanding>,
    },
}

/// Payload of a `question_start` event.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuestionStart {
    /// 1-based position of the question.
    pub question_number: usize,
    /// Number of questions in the session.
    pub total_questions: usize,
    /// Question content without the correct options.
    pub question: QuestionPayload,
}

/// Question content safe to show while answers are still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct QuestionPayload {
    /// Identifier of the question.
    pub id: Uuid,
    /// Prompt text.
    pub text: String,
    /// Answer options.
    pub options: Vec<String>,
    /// Seconds allowed to answer.
    pub time_limit_secs: u32,
    /// Maximum points.
    pub points: u32,
}

impl From<&Question> for QuestionPayload {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            options: question.options.clone(),
            time_limit_secs: question.time_limit_secs,
            points: question.points,
        }
    }
}

/// Payload of a `player_answer` event.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlayerAnswer {
    /// Player who answered.
    #[schema(value_type = Uuid)]
    pub player_id: PlayerId,
    /// Display name of the player.
    pub player_name: String,
    /// Whether the answer was correct.
    pub is_correct: bool,
    /// Seconds the player took to answer.
    pub response_time_secs: f64,
}

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    /// Ranked player.
    #[schema(value_type = Uuid)]
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Cumulative score.
    pub total_score: u32,
    /// Questions answered correctly.
    pub correct_answers: u32,
}

/// One row of the final leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FinalStanding {
    /// Rank and score.
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
    /// Share of questions answered correctly, in percent.
    pub accuracy_percent: u32,
}
