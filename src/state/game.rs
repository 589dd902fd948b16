use std::{
    collections::{BTreeSet, HashSet},
    time::SystemTime,
};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{PlayerEntity, QuestionEntity},
    state::{
        events::{FinalStanding, LeaderboardEntry},
        state_machine::{GameEvent, GamePhase, GameStateMachine, InvalidTransition},
    },
};

/// Identifier of a room (and of its live session).
pub type RoomId = Uuid;
/// Identifier of a player within a room.
pub type PlayerId = Uuid;

/// A multiple-choice question, immutable once the session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier of the question.
    pub id: Uuid,
    /// Prompt shown to players.
    pub text: String,
    /// Answer options, addressed by their zero-based index.
    pub options: Vec<String>,
    /// Indices of the correct options (several for multi-select questions).
    pub correct_options: BTreeSet<usize>,
    /// Maximum points a correct answer can earn.
    pub points: u32,
    /// Seconds players have to answer.
    pub time_limit_secs: u32,
    /// Position of the question within the room.
    pub order: i32,
}

/// Player info tracked during a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Identifier assigned when the player joined the room.
    pub id: PlayerId,
    /// Display name chosen by the player.
    pub name: String,
    /// Cumulative score, never decreases.
    pub total_score: u32,
    /// Number of questions answered correctly, never decreases.
    pub correct_answers: u32,
}

impl Player {
    /// Fresh player with no score yet.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            total_score: 0,
            correct_answers: 0,
        }
    }
}

/// Identifies one run of a session and how far it has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionStamp {
    run: Uuid,
    version: usize,
}

/// Live, in-memory run of a room's game.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Identifier of this run; a room re-created after cleanup gets a new one.
    pub id: Uuid,
    /// Room this session belongs to.
    pub room_id: RoomId,
    /// Zero-based pointer into `questions`.
    pub current_question_index: usize,
    /// Questions ordered by their `order` field.
    pub questions: Vec<Question>,
    /// Players snapshotted at creation, in join order.
    pub players: IndexMap<PlayerId, Player>,
    /// When the game was started.
    pub start_time: Option<SystemTime>,
    /// When the current question opened.
    pub question_start_time: Option<SystemTime>,
    /// Seconds left on the current question.
    pub time_remaining: u32,
    /// True from start until the session finishes.
    pub is_active: bool,
    answered: HashSet<PlayerId>,
    machine: GameStateMachine,
}

impl GameSession {
    /// Build a waiting session. Questions with equal `order` keep their
    /// relative input order.
    pub fn new(room_id: RoomId, mut questions: Vec<Question>, players: Vec<Player>) -> Self {
        questions.sort_by_key(|question| question.order);

        Self {
            id: Uuid::new_v4(),
            room_id,
            current_question_index: 0,
            questions,
            players: players
                .into_iter()
                .map(|player| (player.id, player))
                .collect(),
            start_time: None,
            question_start_time: None,
            time_remaining: 0,
            is_active: false,
            answered: HashSet::new(),
            machine: GameStateMachine::new(),
        }
    }

    /// Current phase of the session.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Number of phase transitions applied so far.
    pub fn version(&self) -> usize {
        self.machine.version()
    }

    pub(crate) fn stamp(&self) -> SessionStamp {
        SessionStamp {
            run: self.id,
            version: self.version(),
        }
    }

    /// The question being played, only while a question is open or revealed.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase() {
            GamePhase::Question | GamePhase::AnswerReveal => {
                self.questions.get(self.current_question_index)
            }
            _ => None,
        }
    }

    /// Whether `player_id` already answered the open question.
    pub fn has_answered(&self, player_id: &PlayerId) -> bool {
        self.answered.contains(player_id)
    }

    /// Players ranked by descending score; ties keep join order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut ranked: Vec<&Player> = self.players.values().collect();
        ranked.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        ranked
            .into_iter()
            .enumerate()
            .map(|(index, player)| LeaderboardEntry {
                rank: index + 1,
                player_id: player.id,
                name: player.name.clone(),
                total_score: player.total_score,
                correct_answers: player.correct_answers,
            })
            .collect()
    }

    /// Final ranking with per-player accuracy over every question.
    pub fn final_standings(&self) -> Vec<FinalStanding> {
        let total = self.questions.len();
        self.leaderboard()
            .into_iter()
            .map(|entry| FinalStanding {
                accuracy_percent: accuracy_percent(entry.correct_answers, total),
                entry,
            })
            .collect()
    }

    pub(crate) fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.machine.apply(event)?;
        self.is_active = next.is_active();
        Ok(next)
    }

    pub(crate) fn record_answer(&mut self, player_id: PlayerId) {
        self.answered.insert(player_id);
    }

    pub(crate) fn reset_answers(&mut self) {
        self.answered.clear();
    }
}

fn accuracy_percent(correct: u32, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) * 100.0 / total as f64).round() as u32
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            options: value.options,
            correct_options: value.correct_options.into_iter().collect(),
            points: value.points,
            time_limit_secs: value.time_limit_secs,
            order: value.order,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self::new(value.id, value.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, order: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            text: text.into(),
            options: vec!["A".into(), "B".into()],
            correct_options: BTreeSet::from([0]),
            points: 100,
            time_limit_secs: 10,
            order,
        }
    }

    #[test]
    fn questions_are_sorted_by_order_keeping_ties_stable() {
        let session = GameSession::new(
            Uuid::new_v4(),
            vec![
                question("third", 2),
                question("first-a", 1),
                question("first-b", 1),
                question("zeroth", 0),
            ],
            Vec::new(),
        );

        let texts: Vec<_> = session.questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["zeroth", "first-a", "first-b", "third"]);
    }

    #[test]
    fn new_session_is_waiting_and_inactive() {
        let session = GameSession::new(Uuid::new_v4(), vec![question("q", 0)], Vec::new());
        assert_eq!(session.phase(), GamePhase::Waiting);
        assert_eq!(session.current_question_index, 0);
        assert!(!session.is_active);
        assert!(session.current_question().is_none());
    }

    #[test]
    fn leaderboard_ranks_by_score_and_keeps_join_order_on_ties() {
        let mut alice = Player::new(Uuid::new_v4(), "alice");
        let mut bob = Player::new(Uuid::new_v4(), "bob");
        let carol = Player::new(Uuid::new_v4(), "carol");
        alice.total_score = 40;
        bob.total_score = 90;

        let session = GameSession::new(
            Uuid::new_v4(),
            vec![question("q", 0)],
            vec![alice, bob, carol.clone()],
        );
        let names: Vec<_> = session
            .leaderboard()
            .into_iter()
            .map(|entry| (entry.rank, entry.name))
            .collect();
        assert_eq!(
            names,
            vec![(1, "bob".into()), (2, "alice".into()), (3, "carol".into())]
        );
    }

    #[test]
    fn final_standings_report_accuracy() {
        let mut alice = Player::new(Uuid::new_v4(), "alice");
        alice.correct_answers = 2;
        alice.total_score = 150;
        let bob = Player::new(Uuid::new_v4(), "bob");

        let session = GameSession::new(
            Uuid::new_v4(),
            vec![question("a", 0), question("b", 1), question("c", 2)],
            vec![alice, bob],
        );
        let standings = session.final_standings();
        assert_eq!(standings[0].accuracy_percent, 67);
        assert_eq!(standings[1].accuracy_percent, 0);
    }
}
