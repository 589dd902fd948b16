use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::{
        events::{LeaderboardEntry, QuestionPayload},
        game::GameSession,
        registry::AnswerOutcome,
        state_machine::GamePhase,
    },
};

/// Answer submitted by a player for the open question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    pub player_id: Uuid,
    /// Zero-based indices of the selected options.
    #[validate(length(max = 32))]
    pub selected_options: Vec<usize>,
    /// Seconds the player took since the question opened, as measured by the client.
    #[validate(range(min = 0.0))]
    pub response_time_secs: f64,
}

/// Result of an accepted answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub is_correct: bool,
    pub points: u32,
    pub total_score: u32,
}

impl From<AnswerOutcome> for AnswerResponse {
    fn from(value: AnswerOutcome) -> Self {
        Self {
            is_correct: value.is_correct,
            points: value.points,
            total_score: value.total_score,
        }
    }
}

/// Point-in-time view of a live session.
///
/// Correct options are only included once the question has been revealed.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub room_id: Uuid,
    pub phase: GamePhase,
    pub is_active: bool,
    pub total_questions: usize,
    /// 1-based number of the question being played.
    pub question_number: Option<usize>,
    pub current_question: Option<QuestionPayload>,
    pub revealed_correct_options: Option<Vec<usize>>,
    pub time_remaining: u32,
    pub start_time: Option<String>,
    pub question_start_time: Option<String>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl From<&GameSession> for SessionSnapshot {
    fn from(session: &GameSession) -> Self {
        let current = session.current_question();
        let revealed_correct_options = match session.phase() {
            GamePhase::AnswerReveal => {
                current.map(|question| question.correct_options.iter().copied().collect())
            }
            _ => None,
        };

        Self {
            room_id: session.room_id,
            phase: session.phase(),
            is_active: session.is_active,
            total_questions: session.questions.len(),
            question_number: current.map(|_| session.current_question_index + 1),
            current_question: current.map(QuestionPayload::from),
            revealed_correct_options,
            time_remaining: session.time_remaining,
            start_time: session.start_time.map(format_system_time),
            question_start_time: session.question_start_time.map(format_system_time),
            leaderboard: session.leaderboard(),
        }
    }
}
