pub mod events;
pub mod game;
pub mod hub;
pub mod registry;
pub mod scoring;
mod sse;
pub mod state_machine;
pub mod timer;

use std::sync::Arc;

use crate::{config::AppConfig, dao::room_store::RoomStore, state::game::RoomId};

pub use self::registry::SessionRegistry;
pub use self::sse::SseHub;
use self::sse::SseState;

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, storage and the live session registry.
pub struct AppState {
    config: AppConfig,
    room_store: Arc<dyn RoomStore>,
    sessions: Arc<SessionRegistry>,
    sse: SseState,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, room_store: Arc<dyn RoomStore>) -> SharedState {
        Arc::new(Self {
            sessions: SessionRegistry::new(config.phase_delays()),
            sse: SseState::new(config.sse_capacity()),
            config,
            room_store,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Storage backend for rooms, questions and players.
    pub fn room_store(&self) -> Arc<dyn RoomStore> {
        Arc::clone(&self.room_store)
    }

    /// Registry of live sessions.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// SSE channel of `room_id`, created on first use.
    pub fn room_sse(&self, room_id: RoomId) -> SseHub {
        self.sse.room(room_id, &self.sessions)
    }

    /// Tear down the SSE channel of `room_id`.
    pub fn release_room_sse(&self, room_id: RoomId) {
        self.sse.release(room_id, &self.sessions);
    }

    /// Number of rooms with an open SSE channel.
    pub fn sse_room_count(&self) -> usize {
        self.sse.room_count()
    }
}
