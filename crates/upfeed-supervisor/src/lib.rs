//! Lifecycle supervision for the market data feed service.
//!
//! Wraps the connection manager with the operational jobs the deployment
//! actually runs: start (with a single-instance guard and credential
//! check), stop (graceful with a forced fallback) and a periodic health
//! check that restarts the service when reconnection stops converging or
//! the feed goes silent. All cross-process coordination happens through
//! the status store.

pub mod config;
pub mod error;
pub mod registry;
pub mod supervisor;

pub use config::{ActiveWindow, SupervisorConfig};
pub use error::{SupervisorError, SupervisorResult};
pub use registry::{ServiceHandle, ServiceRegistry};
pub use supervisor::{HealthVerdict, StartOutcome, StopOutcome, Supervisor};
