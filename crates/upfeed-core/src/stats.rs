//! Connection statistics snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the connection manager's state.
///
/// Serialized to JSON and published to the status store so that
/// out-of-process supervisors can evaluate liveness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// Whether a socket is currently open.
    pub connected: bool,
    /// Reconnect attempts in the current failure cycle (0 after a clean open).
    pub reconnect_attempts: u32,
    /// Number of instrument keys in the subscription registry.
    pub subscriptions_count: usize,
    /// When the last inbound frame arrived. None until the first frame.
    pub last_message_time: Option<DateTime<Utc>>,
    /// Seconds elapsed since the last inbound frame. None until the first frame.
    pub seconds_since_last_message: Option<i64>,
}
