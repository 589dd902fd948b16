//! Application-level configuration loading: phase pacing, SSE buffering and room limits.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::state::registry::PhaseDelays;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_LIVE_BACK_CONFIG_PATH";
const DEFAULT_SSE_CAPACITY: usize = 64;
const DEFAULT_MAX_PLAYERS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    phase_delays: PhaseDelays,
    sse_capacity: usize,
    max_players_per_room: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration stored at `path`; missing or malformed files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        sse_capacity = app_config.sse_capacity,
                        max_players_per_room = app_config.max_players_per_room,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Pauses between the phases of a live session.
    pub fn phase_delays(&self) -> PhaseDelays {
        self.phase_delays
    }

    /// Buffer size of each room's SSE broadcast channel.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }

    /// Default cap on the number of players a room accepts.
    pub fn max_players_per_room(&self) -> usize {
        self.max_players_per_room
    }

    /// Override the phase delays, mostly useful to speed up tests.
    pub fn with_phase_delays(mut self, phase_delays: PhaseDelays) -> Self {
        self.phase_delays = phase_delays;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    phase_delays: RawPhaseDelays,
    sse_capacity: usize,
    max_players_per_room: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            phase_delays: RawPhaseDelays::default(),
            sse_capacity: DEFAULT_SSE_CAPACITY,
            max_players_per_room: DEFAULT_MAX_PLAYERS,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        // tokio broadcast channels reject a zero capacity.
        let sse_capacity = value.sse_capacity.max(1);
        let max_players_per_room = value.max_players_per_room.max(1);
        Self {
            phase_delays: value.phase_delays.into(),
            sse_capacity,
            max_players_per_room,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPhaseDelays {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    starting_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    reveal_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    leaderboard_ms: Duration,
}

impl Default for RawPhaseDelays {
    fn default() -> Self {
        let delays = PhaseDelays::default();
        Self {
            starting_ms: delays.starting,
            reveal_ms: delays.reveal,
            leaderboard_ms: delays.leaderboard,
        }
    }
}

impl From<RawPhaseDelays> for PhaseDelays {
    fn from(value: RawPhaseDelays) -> Self {
        Self {
            starting: value.starting_ms,
            reveal: value.reveal_ms,
            leaderboard: value.leaderboard_ms,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppConfig {
        serde_json::from_str::<RawConfig>(json).unwrap().into()
    }

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(parse("{}"), AppConfig::default());
        assert_eq!(AppConfig::default().phase_delays(), PhaseDelays::default());
    }

    #[test]
    fn phase_delays_are_read_in_milliseconds() {
        let config = parse(
            r#"{
                "phase_delays": { "starting_ms": 1500, "reveal_ms": 250 },
                "sse_capacity": 8
            }"#,
        );

        let delays = config.phase_delays();
        assert_eq!(delays.starting, Duration::from_millis(1500));
        assert_eq!(delays.reveal, Duration::from_millis(250));
        assert_eq!(delays.leaderboard, PhaseDelays::default().leaderboard);
        assert_eq!(config.sse_capacity(), 8);
        assert_eq!(config.max_players_per_room(), DEFAULT_MAX_PLAYERS);
    }

    #[test]
    fn zero_capacities_are_clamped() {
        let config = parse(r#"{ "sse_capacity": 0, "max_players_per_room": 0 }"#);
        assert_eq!(config.sse_capacity(), 1);
        assert_eq!(config.max_players_per_room(), 1);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(Path::new("does/not/exist.json"));
        assert_eq!(config, AppConfig::default());
    }
}
