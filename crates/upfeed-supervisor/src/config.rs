//! Supervision configuration.

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use std::time::Duration;
use upfeed_core::{FeedMode, InstrumentKey};
use upfeed_ws::FeedConfig;

/// Time-of-day window during which the service is expected to be running.
///
/// Health checks outside the window are skipped so the service is left
/// alone overnight and on weekends. Times are compared in the local
/// timezone of the supervising process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindow {
    pub weekdays_only: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ActiveWindow {
    /// Window that is always open, for always-on deployments and tests.
    pub fn always() -> Self {
        Self {
            weekdays_only: false,
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, now: NaiveDateTime) -> bool {
        if self.weekdays_only && now.weekday().number_from_monday() > 5 {
            return false;
        }
        let time = now.time();
        time >= self.start && time <= self.end
    }
}

impl Default for ActiveWindow {
    /// Indian cash market hours with a few minutes of slack on either side
    /// is the expected production setting; the default covers the session
    /// itself.
    fn default() -> Self {
        Self {
            weekdays_only: true,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Everything the supervisor needs to start, watch and stop the service.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Connection settings handed to the manager on every (re)start.
    pub feed: FeedConfig,
    /// Instruments subscribed once the initial connection is up.
    pub instrument_keys: Vec<InstrumentKey>,
    /// Feed mode for the initial subscription.
    pub mode: FeedMode,
    /// Wait after spawning the manager before checking connectivity and
    /// subscribing.
    pub grace_period: Duration,
    /// Interval of the combined stats-publish and stop-poll tick.
    pub control_poll_interval: Duration,
    /// Interval between graceful-stop polls.
    pub stop_poll_interval: Duration,
    /// Graceful-stop polls before the connection is force-closed.
    pub stop_max_polls: u32,
    /// Reconnect attempts at which a health check forces a restart.
    pub restart_after_reconnects: u32,
    /// Feed silence, in seconds, at which a health check forces a restart.
    pub stale_after_secs: i64,
    /// Wait after a restart before reading back the resulting status.
    pub restart_verify_delay: Duration,
    /// When health checks are active at all.
    pub active_window: ActiveWindow,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            instrument_keys: Vec::new(),
            mode: FeedMode::default(),
            grace_period: Duration::from_secs(2),
            control_poll_interval: Duration::from_secs(60),
            stop_poll_interval: Duration::from_secs(1),
            stop_max_polls: 30,
            restart_after_reconnects: 5,
            stale_after_secs: 300,
            restart_verify_delay: Duration::from_secs(5),
            active_window: ActiveWindow::default(),
        }
    }
}
