//! Status store adapter.
//!
//! The connection manager's process and the supervisor jobs' processes
//! exchange state exclusively through a shared key/value namespace. This
//! crate provides the `StatusStore` trait, a Redis-backed implementation
//! for production and a DashMap-backed one for tests and single-process
//! runs, plus the typed `StatusBoard` wrapper the supervisor uses.

pub mod board;
pub mod error;
pub mod keys;
pub mod store;

pub use board::StatusBoard;
pub use error::{StoreError, StoreResult};
pub use store::{MemoryStatusStore, RedisStatusStore, ServiceStatus, StatusStore};
