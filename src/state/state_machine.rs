use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Phases a live session cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Session created, waiting for the owner to start it.
    Waiting,
    /// Game started; the first question opens after a short delay.
    Starting,
    /// A question is open and answers are accepted until the countdown ends.
    Question,
    /// The countdown ended and the correct options are shown.
    AnswerReveal,
    /// Ranked scores are shown between questions.
    Leaderboard,
    /// Every question has been played.
    Finished,
}

impl GamePhase {
    /// Whether a game is in progress (started and not yet finished).
    pub fn is_active(self) -> bool {
        !matches!(self, GamePhase::Waiting | GamePhase::Finished)
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Owner starts the game.
    StartGame,
    /// The start delay elapsed and the first question opens.
    QuestionOpened,
    /// The question countdown reached zero.
    TimeExpired,
    /// The reveal delay elapsed and the leaderboard is shown.
    LeaderboardShown,
    /// The leaderboard delay elapsed and another question remains.
    NextQuestion,
    /// The leaderboard delay elapsed and no question remains.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Phase holder with a version counter bumped on every applied transition.
///
/// Delayed work records the version it was scheduled at and is dropped when
/// the version moved on in the meantime.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Waiting,
            version: 0,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the waiting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (GamePhase::Waiting, GameEvent::StartGame) => GamePhase::Starting,
            (GamePhase::Starting, GameEvent::QuestionOpened) => GamePhase::Question,
            (GamePhase::Question, GameEvent::TimeExpired) => GamePhase::AnswerReveal,
            (GamePhase::AnswerReveal, GameEvent::LeaderboardShown) => GamePhase::Leaderboard,
            (GamePhase::Leaderboard, GameEvent::NextQuestion) => GamePhase::Question,
            (GamePhase::Leaderboard, GameEvent::Finish) => GamePhase::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_waiting() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Waiting);
        assert_eq!(sm.version(), 0);
        assert!(!sm.phase().is_active());
    }

    #[test]
    fn full_happy_path_through_two_questions() {
        let mut sm = GameStateMachine::new();

        assert_eq!(apply(&mut sm, GameEvent::StartGame), GamePhase::Starting);
        assert_eq!(apply(&mut sm, GameEvent::QuestionOpened), GamePhase::Question);
        assert_eq!(apply(&mut sm, GameEvent::TimeExpired), GamePhase::AnswerReveal);
        assert_eq!(
            apply(&mut sm, GameEvent::LeaderboardShown),
            GamePhase::Leaderboard
        );
        assert_eq!(apply(&mut sm, GameEvent::NextQuestion), GamePhase::Question);
        assert_eq!(apply(&mut sm, GameEvent::TimeExpired), GamePhase::AnswerReveal);
        assert_eq!(
            apply(&mut sm, GameEvent::LeaderboardShown),
            GamePhase::Leaderboard
        );
        assert_eq!(apply(&mut sm, GameEvent::Finish), GamePhase::Finished);
        assert_eq!(sm.version(), 8);
    }

    #[test]
    fn active_flag_follows_phase() {
        for phase in [
            GamePhase::Starting,
            GamePhase::Question,
            GamePhase::AnswerReveal,
            GamePhase::Leaderboard,
        ] {
            assert!(phase.is_active(), "{phase:?} should be active");
        }
        assert!(!GamePhase::Finished.is_active());
    }

    #[test]
    fn invalid_transition_returns_error_and_keeps_state() {
        let mut sm = GameStateMachine::new();
        let err = sm.apply(GameEvent::TimeExpired).unwrap_err();
        assert_eq!(err.from, GamePhase::Waiting);
        assert_eq!(err.event, GameEvent::TimeExpired);
        assert_eq!(sm.phase(), GamePhase::Waiting);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = GameStateMachine::new();
        for event in [
            GameEvent::StartGame,
            GameEvent::QuestionOpened,
            GameEvent::TimeExpired,
            GameEvent::LeaderboardShown,
            GameEvent::Finish,
        ] {
            apply(&mut sm, event);
        }

        for event in [
            GameEvent::StartGame,
            GameEvent::QuestionOpened,
            GameEvent::NextQuestion,
        ] {
            assert!(sm.apply(event).is_err());
        }
        assert_eq!(sm.phase(), GamePhase::Finished);
    }
}
