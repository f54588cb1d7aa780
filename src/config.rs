//! Server configuration from environment variables
//!
//! `.env` is loaded by `main` before this runs.

use crate::types::GameConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Room lifecycle settings
#[derive(Debug, Clone)]
pub struct RoomsConfig {
    /// Rooms without activity for this long are evicted
    pub idle_timeout: Duration,
    /// How often the eviction sweep runs
    pub sweep_interval: Duration,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Only this origin may connect when set, otherwise CORS is permissive
    pub front_origin: Option<String>,
    pub questions_path: PathBuf,
    pub game: GameConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 10000,
            front_origin: None,
            questions_path: PathBuf::from("questions.json"),
            game: GameConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Read and parse an env var, warning and returning None when it doesn't parse
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

impl ServerConfig {
    /// Load config from environment variables, defaulting anything unset
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let front_origin = std::env::var("FRONT_ORIGIN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let questions_path = std::env::var("QUESTIONS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.questions_path);

        let total_rounds = env_parse::<u32>("TOTAL_ROUNDS")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.game.total_rounds);

        let game = GameConfig {
            round_duration: env_millis("ROUND_TIME_MS").unwrap_or(defaults.game.round_duration),
            vote_step_timeout: env_millis("VOTE_STEP_TIMEOUT_MS")
                .unwrap_or(defaults.game.vote_step_timeout),
            next_round_delay: env_millis("NEXT_ROUND_DELAY_MS")
                .unwrap_or(defaults.game.next_round_delay),
            total_rounds,
        };

        let rooms = RoomsConfig {
            idle_timeout: env_secs("ROOM_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.rooms.idle_timeout),
            sweep_interval: env_secs("ROOM_SWEEP_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.rooms.sweep_interval),
        };

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            front_origin,
            questions_path,
            game,
            rooms,
        }
    }
}
