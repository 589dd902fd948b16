//! Live session registry and the phase driver that runs each session.
//!
//! Every session lives in a [`DashMap`] entry; all mutations, whether they
//! come from request handlers or from timer callbacks, go through that
//! entry's write guard, and events are published while it is held so each
//! room observes them in production order.

use std::{
    collections::BTreeSet,
    sync::{Arc, Weak},
    time::{Duration, SystemTime},
};

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::state::{
    events::{PlayerAnswer, QuestionPayload, QuestionStart, RoomEvent, RoomEventKind, StateChange},
    game::{GameSession, Player, PlayerId, Question, RoomId, SessionStamp},
    hub::{BroadcastHub, EventListener, SubscriptionId},
    scoring,
    state_machine::{GameEvent, GamePhase, InvalidTransition},
    timer::TimerEngine,
};

/// Pauses between phases that are not driven by the question countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDelays {
    /// From `starting` to the first question.
    pub starting: Duration,
    /// From `answer_reveal` to `leaderboard`.
    pub reveal: Duration,
    /// From `leaderboard` to the next question (or the end).
    pub leaderboard: Duration,
}

impl Default for PhaseDelays {
    fn default() -> Self {
        Self {
            starting: Duration::from_secs(3),
            reveal: Duration::from_secs(3),
            leaderboard: Duration::from_secs(5),
        }
    }
}

/// Reasons a session operation was rejected. Nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A session already exists for the room; clean it up first.
    #[error("a session already exists for room {0}")]
    AlreadyExists(RoomId),
    /// Sessions need at least one question.
    #[error("a session needs at least one question")]
    NoQuestions,
    /// No session exists for the room.
    #[error("no session for room {0}")]
    NotFound(RoomId),
    /// The session was already started.
    #[error("session for room {0} has already been started")]
    AlreadyActive(RoomId),
    /// Answers are only accepted while a question is open.
    #[error("answers are not accepted during {0:?}")]
    WrongPhase(GamePhase),
    /// The player is not part of the session.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// The session has no question at its current index.
    #[error("no current question")]
    NoCurrentQuestion,
    /// The player already answered the open question.
    #[error("player {0} already answered this question")]
    AlreadyAnswered(PlayerId),
    /// Response times must be finite and non-negative.
    #[error("response time must be a non-negative number of seconds")]
    InvalidResponseTime,
    /// The state machine refused the transition.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Result of an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Whether the answer was correct.
    pub is_correct: bool,
    /// Points earned by this answer.
    pub points: u32,
    /// Player score after the answer.
    pub total_score: u32,
}

/// Scheduled continuation of a session.
#[derive(Debug, Clone, Copy)]
enum Step {
    OpenFirstQuestion,
    ShowLeaderboard,
    Advance,
}

/// Owns every live session together with its timers and listeners.
pub struct SessionRegistry {
    sessions: DashMap<RoomId, GameSession>,
    timers: TimerEngine,
    hub: BroadcastHub,
    delays: PhaseDelays,
    this: Weak<SessionRegistry>,
}

impl SessionRegistry {
    /// Build a registry; timer callbacks reach it through a weak handle.
    pub fn new(delays: PhaseDelays) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            sessions: DashMap::new(),
            timers: TimerEngine::new(),
            hub: BroadcastHub::new(),
            delays,
            this: this.clone(),
        })
    }

    /// Create a waiting session for `room_id`.
    ///
    /// The question list and roster are fixed from here on. An existing
    /// session for the room is never overwritten.
    pub fn create_session(
        &self,
        room_id: RoomId,
        questions: Vec<Question>,
        players: Vec<Player>,
    ) -> Result<GameSession, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        match self.sessions.entry(room_id) {
            Entry::Occupied(_) => Err(SessionError::AlreadyExists(room_id)),
            Entry::Vacant(slot) => {
                let session = GameSession::new(room_id, questions, players);
                info!(
                    room_id = %room_id,
                    questions = session.questions.len(),
                    players = session.players.len(),
                    "session created"
                );
                let snapshot = session.clone();
                slot.insert(session);
                Ok(snapshot)
            }
        }
    }

    /// Snapshot of the session for `room_id`.
    pub fn get_session(&self, room_id: RoomId) -> Option<GameSession> {
        self.sessions
            .get(&room_id)
            .map(|session| session.value().clone())
    }

    /// Number of sessions currently held, finished ones included.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a question countdown is running for `room_id`.
    pub fn is_countdown_armed(&self, room_id: RoomId) -> bool {
        self.timers.is_armed(room_id)
    }

    /// Tear the room down: session, countdown, pending transition, listeners.
    /// Calling it for an unknown room does nothing.
    pub fn cleanup(&self, room_id: RoomId) {
        // Removing first means a continuation already running either armed
        // its timers before we got here or finds the session gone.
        let removed = self.sessions.remove(&room_id).is_some();
        self.timers.cancel_all(room_id);
        self.hub.release(room_id);
        if removed {
            info!(room_id = %room_id, "session cleaned up");
        }
    }

    /// Attach a listener to the room's events.
    pub fn subscribe(&self, room_id: RoomId, listener: Arc<dyn EventListener>) -> SubscriptionId {
        self.hub.subscribe(room_id, listener)
    }

    /// Detach a listener. Returns whether it was attached.
    pub fn unsubscribe(&self, room_id: RoomId, subscription: SubscriptionId) -> bool {
        self.hub.unsubscribe(room_id, subscription)
    }

    /// Start the game: `waiting -> starting`, first question after the start delay.
    pub fn start_game(&self, room_id: RoomId) -> Result<(), SessionError> {
        let mut guard = self
            .sessions
            .get_mut(&room_id)
            .ok_or(SessionError::NotFound(room_id))?;
        let session = &mut *guard;

        if session.phase() != GamePhase::Waiting {
            return Err(SessionError::AlreadyActive(room_id));
        }

        session.apply(GameEvent::StartGame)?;
        session.start_time = Some(SystemTime::now());
        info!(room_id = %room_id, "game started");

        self.publish(
            room_id,
            RoomEventKind::StateChange(StateChange::Starting {
                total_questions: session.questions.len(),
            }),
        );
        self.schedule_step(
            room_id,
            self.delays.starting,
            session.stamp(),
            Step::OpenFirstQuestion,
        );
        Ok(())
    }

    /// Record an answer for the open question.
    ///
    /// Only the first answer of each player counts. Scoring never changes the
    /// phase; the question stays open until its countdown expires.
    pub fn submit_answer(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        selected_options: &[usize],
        response_time_secs: f64,
    ) -> Result<AnswerOutcome, SessionError> {
        if !response_time_secs.is_finite() || response_time_secs < 0.0 {
            return Err(SessionError::InvalidResponseTime);
        }

        let mut guard = self
            .sessions
            .get_mut(&room_id)
            .ok_or(SessionError::NotFound(room_id))?;
        let session = &mut *guard;

        let phase = session.phase();
        if phase != GamePhase::Question {
            return Err(SessionError::WrongPhase(phase));
        }
        if !session.players.contains_key(&player_id) {
            return Err(SessionError::UnknownPlayer(player_id));
        }
        if session.has_answered(&player_id) {
            return Err(SessionError::AlreadyAnswered(player_id));
        }

        let question = session
            .questions
            .get(session.current_question_index)
            .ok_or(SessionError::NoCurrentQuestion)?;
        let selected: BTreeSet<usize> = selected_options.iter().copied().collect();
        let score = scoring::score(
            &selected,
            &question.correct_options,
            question.points,
            question.time_limit_secs,
            response_time_secs,
        );

        let player = session
            .players
            .get_mut(&player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;
        if score.is_correct {
            player.correct_answers = player.correct_answers.saturating_add(1);
            player.total_score = player.total_score.saturating_add(score.points);
        }
        let outcome = AnswerOutcome {
            is_correct: score.is_correct,
            points: score.points,
            total_score: player.total_score,
        };
        let event = PlayerAnswer {
            player_id,
            player_name: player.name.clone(),
            is_correct: score.is_correct,
            response_time_secs,
        };
        session.record_answer(player_id);

        debug!(
            room_id = %room_id,
            player_id = %player_id,
            correct = outcome.is_correct,
            points = outcome.points,
            "answer recorded"
        );
        self.publish(room_id, RoomEventKind::PlayerAnswer(event));
        Ok(outcome)
    }

    fn publish(&self, room_id: RoomId, kind: RoomEventKind) {
        self.hub.publish(&RoomEvent::now(room_id, kind));
    }

    fn schedule_step(&self, room_id: RoomId, delay: Duration, stamp: SessionStamp, step: Step) {
        let registry = self.this.clone();
        self.timers.schedule(room_id, delay, move || {
            if let Some(registry) = registry.upgrade() {
                registry.run_step(room_id, stamp, step);
            }
        });
    }

    fn run_step(&self, room_id: RoomId, stamp: SessionStamp, step: Step) {
        let Some(mut guard) = self.sessions.get_mut(&room_id) else {
            debug!(room_id = %room_id, ?step, "session gone; dropping continuation");
            return;
        };
        let session = &mut *guard;
        if session.stamp() != stamp {
            debug!(room_id = %room_id, ?step, "stale continuation ignored");
            return;
        }

        let result = match step {
            Step::OpenFirstQuestion => self.open_question(session, GameEvent::QuestionOpened, 0),
            Step::ShowLeaderboard => self.show_leaderboard(session),
            Step::Advance => self.advance(session),
        };
        if let Err(err) = result {
            warn!(room_id = %room_id, ?step, error = %err, "session continuation rejected");
        }
    }

    fn open_question(
        &self,
        session: &mut GameSession,
        event: GameEvent,
        index: usize,
    ) -> Result<(), InvalidTransition> {
        let Some(question) = session.questions.get(index) else {
            return self.finish(session);
        };
        let time_limit = question.time_limit_secs;
        let payload = QuestionPayload::from(question);

        session.apply(event)?;
        session.current_question_index = index;
        session.question_start_time = Some(SystemTime::now());
        session.time_remaining = time_limit;
        session.reset_answers();

        let room_id = session.room_id;
        debug!(room_id = %room_id, question = index + 1, "question opened");
        self.publish(
            room_id,
            RoomEventKind::QuestionStart(QuestionStart {
                question_number: index + 1,
                total_questions: session.questions.len(),
                question: payload,
            }),
        );
        self.arm_countdown(room_id, time_limit, session.stamp());
        Ok(())
    }

    fn arm_countdown(&self, room_id: RoomId, seconds: u32, stamp: SessionStamp) {
        let on_tick = {
            let registry = self.this.clone();
            move |remaining| {
                if let Some(registry) = registry.upgrade() {
                    registry.countdown_tick(room_id, stamp, remaining);
                }
            }
        };
        let on_expire = {
            let registry = self.this.clone();
            move || {
                if let Some(registry) = registry.upgrade() {
                    registry.countdown_expired(room_id, stamp);
                }
            }
        };
        self.timers.arm(room_id, seconds, on_tick, on_expire);
    }

    fn countdown_tick(&self, room_id: RoomId, stamp: SessionStamp, remaining: u32) {
        let Some(mut session) = self.sessions.get_mut(&room_id) else {
            return;
        };
        if session.stamp() != stamp || session.phase() != GamePhase::Question {
            return;
        }

        session.time_remaining = remaining;
        self.publish(
            room_id,
            RoomEventKind::TimeUpdate {
                time_remaining: remaining,
            },
        );
    }

    fn countdown_expired(&self, room_id: RoomId, stamp: SessionStamp) {
        let Some(mut guard) = self.sessions.get_mut(&room_id) else {
            return;
        };
        let session = &mut *guard;
        if session.stamp() != stamp {
            return;
        }

        self.timers.cancel(room_id);
        if let Err(err) = session.apply(GameEvent::TimeExpired) {
            warn!(room_id = %room_id, error = %err, "countdown expiry rejected");
            return;
        }
        session.time_remaining = 0;

        let correct_options: Vec<usize> = session
            .current_question()
            .map(|question| question.correct_options.iter().copied().collect())
            .unwrap_or_default();
        self.publish(
            room_id,
            RoomEventKind::StateChange(StateChange::AnswerReveal {
                question_number: session.current_question_index + 1,
                correct_options,
            }),
        );
        self.schedule_step(
            room_id,
            self.delays.reveal,
            session.stamp(),
            Step::ShowLeaderboard,
        );
    }

    fn show_leaderboard(&self, session: &mut GameSession) -> Result<(), InvalidTransition> {
        session.apply(GameEvent::LeaderboardShown)?;

        let room_id = session.room_id;
        self.publish(
            room_id,
            RoomEventKind::LeaderboardUpdate {
                leaderboard: session.leaderboard(),
            },
        );
        self.schedule_step(
            room_id,
            self.delays.leaderboard,
            session.stamp(),
            Step::Advance,
        );
        Ok(())
    }

    fn advance(&self, session: &mut GameSession) -> Result<(), InvalidTransition> {
        let next = session.current_question_index + 1;
        if next < session.questions.len() {
            self.open_question(session, GameEvent::NextQuestion, next)
        } else {
            self.finish(session)
        }
    }

    fn finish(&self, session: &mut GameSession) -> Result<(), InvalidTransition> {
        session.apply(GameEvent::Finish)?;

        let room_id = session.room_id;
        self.timers.cancel(room_id);
        session.current_question_index = session.questions.len();
        session.time_remaining = 0;
        info!(room_id = %room_id, "game finished");

        self.publish(
            room_id,
            RoomEventKind::StateChange(StateChange::Finished {
                final_leaderboard: session.final_standings(),
            }),
        );
        Ok(())
    }
}
