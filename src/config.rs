//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BINGO_ARENA_CONFIG_PATH";
/// Seconds before a stalled lobby player is auto-readied.
const DEFAULT_READY_COUNTDOWN_SECS: u64 = 30;
/// Buffered events per room change feed.
const DEFAULT_FEED_CAPACITY: usize = 16;
/// Players in the local simulation run.
const DEFAULT_SIMULATED_PLAYERS: usize = 3;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How long a lobby player may stall before being auto-readied.
    pub ready_countdown: Duration,
    /// Broadcast capacity of the in-memory change feeds.
    pub feed_capacity: usize,
    /// Number of simulated participants the demo binary spawns.
    pub simulated_players: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
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
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ready_countdown: Duration::from_secs(DEFAULT_READY_COUNTDOWN_SECS),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            simulated_players: DEFAULT_SIMULATED_PLAYERS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    ready_countdown_secs: Option<u64>,
    feed_capacity: Option<usize>,
    simulated_players: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            ready_countdown: raw
                .ready_countdown_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ready_countdown),
            feed_capacity: raw.feed_capacity.unwrap_or(defaults.feed_capacity),
            simulated_players: raw
                .simulated_players
                .filter(|count| *count >= 2)
                .unwrap_or(defaults.simulated_players),
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
