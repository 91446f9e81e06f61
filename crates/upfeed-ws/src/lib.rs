//! WebSocket connection manager for the broker market data feed.
//!
//! Provides robust feed connectivity with:
//! - Fresh single-use feed URL per connection attempt (authorize endpoint)
//! - Automatic reconnection with capped exponential backoff
//! - Subscription registry replayed after every reconnect
//! - Staleness heartbeat that force-closes silently dead sockets
//! - Per-frame decode fallback (protobuf -> JSON -> raw bytes)

pub mod authorize;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod subscription;

pub use authorize::{FeedAuthorizer, HttpAuthorizer};
pub use connection::{ConnectionManager, ConnectionState, FeedConfig};
pub use error::{WsError, WsResult};
pub use message::{ConnectionEvent, ControlFrame, ControlMethod, FeedMessage};
pub use subscription::{SubscriptionRegistry, SubscriptionSnapshot};
