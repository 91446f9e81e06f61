//! Core domain types for the upfeed market data service.
//!
//! This crate provides fundamental types used throughout the service:
//! - `InstrumentKey`: Opaque identifier for a tradable instrument
//! - `FeedMode`: Server-side verbosity level for a subscription
//! - `Credential` / `CredentialProvider`: Bearer-token access to the broker
//! - `ConnectionStats`: Snapshot published to the status store

pub mod credential;
pub mod stats;
pub mod types;

pub use credential::{Credential, CredentialError, CredentialProvider};
pub use stats::ConnectionStats;
pub use types::{FeedMode, InstrumentKey};
