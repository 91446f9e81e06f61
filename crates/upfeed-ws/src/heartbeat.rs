//! Staleness monitoring for the feed socket.
//!
//! The broker pushes data continuously during market hours, so "no inbound
//! frame for a while" is the health signal: past 3x the heartbeat interval
//! the connection is suspect, past 4x it is treated as dead and force-closed
//! even though the socket still reports open.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;

/// Outcome of one heartbeat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessVerdict {
    Fresh,
    /// Past the warning threshold (3x interval).
    Stale { silent_for_secs: i64 },
    /// Past the force-close threshold (4x interval).
    Dead { silent_for_secs: i64 },
}

#[derive(Debug)]
pub struct StalenessMonitor {
    interval: Duration,
    /// None until the first inbound frame of the current session.
    last_message: RwLock<Option<DateTime<Utc>>>,
}

impl StalenessMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_message: RwLock::new(None),
        }
    }

    /// Arm the monitor at socket open.
    pub fn reset(&self) {
        *self.last_message.write() = Some(Utc::now());
    }

    /// Record an inbound frame of any kind.
    pub fn record_message(&self) {
        *self.last_message.write() = Some(Utc::now());
    }

    pub fn last_message_time(&self) -> Option<DateTime<Utc>> {
        *self.last_message.read()
    }

    pub fn seconds_since_last_message(&self) -> Option<i64> {
        self.last_message
            .read()
            .map(|t| (Utc::now() - t).num_seconds())
    }

    pub fn check(&self) -> StalenessVerdict {
        self.verdict_at(Utc::now())
    }

    fn verdict_at(&self, now: DateTime<Utc>) -> StalenessVerdict {
        let Some(last) = *self.last_message.read() else {
            return StalenessVerdict::Fresh;
        };

        let silent_for_secs = (now - last).num_seconds();
        let interval_secs = self.interval.as_secs() as i64;

        if silent_for_secs > interval_secs * 4 {
            StalenessVerdict::Dead { silent_for_secs }
        } else if silent_for_secs > interval_secs * 3 {
            StalenessVerdict::Stale { silent_for_secs }
        } else {
            StalenessVerdict::Fresh
        }
    }
}
