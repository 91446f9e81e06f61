//! Status store key names.
//!
//! Keys are namespaced by the store implementation; these are the bare
//! names shared by writers and readers across processes.

pub const STATUS: &str = "status";
pub const ERROR_MESSAGE: &str = "error_message";
pub const ERROR_TIME: &str = "error_time";
pub const LAST_CONNECTED_AT: &str = "last_connected_at";
pub const LAST_DISCONNECTED_AT: &str = "last_disconnected_at";
pub const CONNECTION_STATS: &str = "connection_stats";
pub const RECONNECT_COUNT: &str = "reconnect_count";
pub const LAST_ERROR: &str = "last_error";
pub const LAST_ERROR_TIME: &str = "last_error_time";
