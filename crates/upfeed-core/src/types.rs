//! Instrument identifiers and feed modes.

use serde::{Deserialize, Serialize};

/// Opaque identifier for one tradable instrument (e.g., "NSE_EQ|INE020B01018").
///
/// The broker treats this as an opaque string; no structure is assumed here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentKey(String);

impl InstrumentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for InstrumentKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for InstrumentKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl std::fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription verbosity level understood by the feed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Last traded price/qty/time/close only.
    #[default]
    Ltpc,
    /// Full market feed (depth, greeks, OHLC, volume).
    Full,
    /// First depth level plus option greeks.
    OptionGreeks,
    /// Full feed with 30-level depth.
    FullD30,
}

impl FeedMode {
    /// Wire name used in outbound control frames.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Ltpc => "ltpc",
            Self::Full => "full",
            Self::OptionGreeks => "option_greeks",
            Self::FullD30 => "full_d30",
        }
    }
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl std::str::FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ltpc" => Ok(Self::Ltpc),
            "full" => Ok(Self::Full),
            "option_greeks" => Ok(Self::OptionGreeks),
            "full_d30" => Ok(Self::FullD30),
            other => Err(format!("unknown feed mode: {other}")),
        }
    }
}
