//! Market data feed daemon.
//!
//! Hosts the connection manager and the supervision jobs behind a small
//! CLI: `start`, `stop`, `health-check` and `run`.

pub mod app;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;

pub use app::Application;
pub use config::DaemonConfig;
pub use credentials::EnvCredentialProvider;
pub use error::{AppError, AppResult};
