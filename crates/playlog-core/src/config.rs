use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlaylogError, Result};

pub const DEFAULT_SPOTIFY_BASE_URL: &str = "https://api.spotify.com";
/// The recently-played endpoint never returns more than one page of 50.
pub const MAX_PAGE_LIMIT: u32 = 50;
/// Added to the cutoff (in seconds) before it is sent as `after`.
/// Configurable because its purpose (clock skew guard or boundary
/// de-duplication) is unconfirmed.
pub const CUTOFF_OFFSET_SECS: i64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level config (playlog.toml + PLAYLOG_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylogConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Spotify Web API access for a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// OAuth bearer token with the `user-read-recently-played` scope.
    pub token: Option<String>,
    /// Only used to tag log lines; the endpoint is always `/me/...`.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_cutoff_offset")]
    pub cutoff_offset_secs: i64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            token: None,
            user_id: None,
            base_url: default_base_url(),
            limit: default_limit(),
            cutoff_offset_secs: default_cutoff_offset(),
            timeout_secs: default_timeout(),
        }
    }
}

impl SpotifyConfig {
    /// The bearer token, or a `Config` error when it was never supplied.
    pub fn bearer_token(&self) -> Result<&str> {
        match self.token.as_deref() {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(PlaylogError::Config(
                "spotify.token is required (set PLAYLOG_SPOTIFY__TOKEN)".to_string(),
            )),
        }
    }

    /// Page size actually sent to the API, clamped to `1..=50`.
    pub fn page_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// Daily run policy used by `playlog serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// UTC hour of the daily run.
    #[serde(default)]
    pub hour: u8,
    #[serde(default = "default_minute")]
    pub minute: u8,
    /// When set, run every N seconds instead of once a day.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Named in the failure alert log line.
    #[serde(default = "default_owner")]
    pub owner: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 0,
            minute: default_minute(),
            interval_secs: None,
            retries: default_retries(),
            retry_delay_secs: default_retry_delay(),
            owner: default_owner(),
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.playlog/played_tracks.sqlite", home)
}
fn default_base_url() -> String {
    DEFAULT_SPOTIFY_BASE_URL.to_string()
}
fn default_limit() -> u32 {
    MAX_PAGE_LIMIT
}
fn default_cutoff_offset() -> i64 {
    CUTOFF_OFFSET_SECS
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_minute() -> u8 {
    5
}
fn default_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    60
}
fn default_owner() -> String {
    "playlog".to_string()
}

impl PlaylogConfig {
    /// Load config from a TOML file with PLAYLOG_* env var overrides.
    ///
    /// The file is optional: a missing file yields the defaults, so a fully
    /// env-driven setup (`PLAYLOG_SPOTIFY__TOKEN=...`) works on its own.
    /// Nested keys use a double underscore: `PLAYLOG_SCHEDULE__RETRY_DELAY_SECS`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, "loading config");

        let config: PlaylogConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PLAYLOG_").split("__"))
            .extract()
            .map_err(|e| PlaylogError::Config(e.to_string()))?;

        config.validate()?;
        debug!(
            database = %config.database.path,
            token_set = config.spotify.token.is_some(),
            "config loaded"
        );
        Ok(config)
    }

    /// Reject values the job cannot run with. The token is checked lazily by
    /// [`SpotifyConfig::bearer_token`] so read-only commands work without it.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(PlaylogError::Config(format!(
                "schedule time {:02}:{:02} is out of range",
                self.schedule.hour, self.schedule.minute
            )));
        }
        if self.schedule.interval_secs == Some(0) {
            return Err(PlaylogError::Config(
                "schedule.interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.playlog/playlog.toml", home)
}
