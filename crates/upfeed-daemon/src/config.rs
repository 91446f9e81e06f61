//! Daemon configuration.
//!
//! Loaded from a TOML file; every tuning knob has a serde default matching
//! the production values, so a minimal config only needs the authorize URL
//! and the instrument list.

use crate::error::{AppError, AppResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use upfeed_core::{FeedMode, InstrumentKey};
use upfeed_supervisor::{ActiveWindow, SupervisorConfig};
use upfeed_ws::FeedConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Feed authorization endpoint. Returns the single-use WebSocket URL.
    pub authorize_url: String,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Status store key namespace shared by all supervising processes.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Instrument keys subscribed at startup, e.g. `NSE_EQ|INE002A01018`.
    #[serde(default)]
    pub instruments: Vec<String>,

    #[serde(default)]
    pub mode: FeedMode,

    #[serde(default)]
    pub connection: ConnectionSettings,

    #[serde(default)]
    pub supervision: SupervisionSettings,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_namespace() -> String {
    "upstox:market_data".to_string()
}

/// Connection manager tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_secs")]
    pub reconnect_base_delay_secs: u64,
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_resubscribe_settle_delay_secs")]
    pub resubscribe_settle_delay_secs: u64,
    #[serde(default = "default_authorize_timeout_secs")]
    pub authorize_timeout_secs: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_reconnect_base_delay_secs() -> u64 {
    5
}

fn default_reconnect_max_delay_secs() -> u64 {
    120
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_resubscribe_settle_delay_secs() -> u64 {
    2
}

fn default_authorize_timeout_secs() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_secs: default_reconnect_base_delay_secs(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            resubscribe_settle_delay_secs: default_resubscribe_settle_delay_secs(),
            authorize_timeout_secs: default_authorize_timeout_secs(),
        }
    }
}

/// Supervision tuning, including the active market window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisionSettings {
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
    #[serde(default = "default_control_poll_interval_secs")]
    pub control_poll_interval_secs: u64,
    #[serde(default = "default_stop_poll_interval_secs")]
    pub stop_poll_interval_secs: u64,
    #[serde(default = "default_stop_max_polls")]
    pub stop_max_polls: u32,
    #[serde(default = "default_restart_after_reconnects")]
    pub restart_after_reconnects: u32,
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,
    #[serde(default = "default_restart_verify_delay_secs")]
    pub restart_verify_delay_secs: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    /// Local time of day, `HH:MM`.
    #[serde(default = "default_window_start")]
    pub window_start: String,
    /// Local time of day, `HH:MM`.
    #[serde(default = "default_window_end")]
    pub window_end: String,
    #[serde(default = "default_weekdays_only")]
    pub weekdays_only: bool,
}

fn default_grace_period_secs() -> u64 {
    2
}

fn default_control_poll_interval_secs() -> u64 {
    60
}

fn default_stop_poll_interval_secs() -> u64 {
    1
}

fn default_stop_max_polls() -> u32 {
    30
}

fn default_restart_after_reconnects() -> u32 {
    5
}

fn default_stale_after_secs() -> i64 {
    300
}

fn default_restart_verify_delay_secs() -> u64 {
    5
}

fn default_health_check_interval_secs() -> u64 {
    300
}

fn default_window_start() -> String {
    "09:00".to_string()
}

fn default_window_end() -> String {
    "15:30".to_string()
}

fn default_weekdays_only() -> bool {
    true
}

impl Default for SupervisionSettings {
    fn default() -> Self {
        Self {
            grace_period_secs: default_grace_period_secs(),
            control_poll_interval_secs: default_control_poll_interval_secs(),
            stop_poll_interval_secs: default_stop_poll_interval_secs(),
            stop_max_polls: default_stop_max_polls(),
            restart_after_reconnects: default_restart_after_reconnects(),
            stale_after_secs: default_stale_after_secs(),
            restart_verify_delay_secs: default_restart_verify_delay_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            weekdays_only: default_weekdays_only(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration. Path resolution: explicit argument, then the
    /// `UPFEED_CONFIG` env var, then `config/default.toml`.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var("UPFEED_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Err(AppError::Config(format!(
                "config file not found: {config_path}"
            )));
        }
        Self::from_file(&config_path)
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.authorize_url.is_empty() {
            return Err(AppError::Config("authorize_url must not be empty".into()));
        }
        Ok(())
    }

    pub fn feed_config(&self) -> FeedConfig {
        let c = &self.connection;
        FeedConfig {
            authorize_url: self.authorize_url.clone(),
            max_reconnect_attempts: c.max_reconnect_attempts,
            reconnect_base_delay: Duration::from_secs(c.reconnect_base_delay_secs),
            reconnect_max_delay: Duration::from_secs(c.reconnect_max_delay_secs),
            heartbeat_interval: Duration::from_secs(c.heartbeat_interval_secs),
            resubscribe_settle_delay: Duration::from_secs(c.resubscribe_settle_delay_secs),
            authorize_timeout: Duration::from_secs(c.authorize_timeout_secs),
        }
    }

    pub fn supervisor_config(&self) -> AppResult<SupervisorConfig> {
        let s = &self.supervision;
        Ok(SupervisorConfig {
            feed: self.feed_config(),
            instrument_keys: self
                .instruments
                .iter()
                .map(|key| InstrumentKey::from(key.as_str()))
                .collect(),
            mode: self.mode,
            grace_period: Duration::from_secs(s.grace_period_secs),
            control_poll_interval: Duration::from_secs(s.control_poll_interval_secs),
            stop_poll_interval: Duration::from_secs(s.stop_poll_interval_secs),
            stop_max_polls: s.stop_max_polls,
            restart_after_reconnects: s.restart_after_reconnects,
            stale_after_secs: s.stale_after_secs,
            restart_verify_delay: Duration::from_secs(s.restart_verify_delay_secs),
            active_window: ActiveWindow {
                weekdays_only: s.weekdays_only,
                start: parse_window_time(&s.window_start)?,
                end: parse_window_time(&s.window_end)?,
            },
        })
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.supervision.health_check_interval_secs)
    }
}

fn parse_window_time(raw: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|e| AppError::Config(format!("invalid window time {raw:?}: {e}")))
}
