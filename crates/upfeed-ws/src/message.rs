//! Outbound control frames and inbound message/event types.

use crate::error::WsResult;
use serde::Serialize;
use upfeed_core::{FeedMode, InstrumentKey};
use upfeed_proto::FeedEnvelope;
use uuid::Uuid;

/// Inbound feed message handed to the downstream sink.
///
/// Decoded envelopes are the normal case; the JSON and raw variants are the
/// per-frame degradation path for frames the protobuf decoder rejects.
#[derive(Debug, Clone)]
pub enum FeedMessage {
    Feed(FeedEnvelope),
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

/// Lifecycle event emitted by the connection manager.
///
/// `Connected` always precedes any [`FeedMessage::Feed`] for a session;
/// `Disconnected` fires exactly once per opened session.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { code: u16, reason: String },
    Error { message: String, fatal: bool },
}

/// Control-frame method understood by the feed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMethod {
    Sub,
    Unsub,
    ChangeMode,
}

#[derive(Debug, Serialize)]
struct ControlData {
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<FeedMode>,
    #[serde(rename = "instrumentKeys")]
    instrument_keys: Vec<String>,
}

/// Outbound subscription control frame.
///
/// The protocol is fire-and-forget: the server never acknowledges these, so
/// the subscription registry is updated before a frame is even queued.
#[derive(Debug, Serialize)]
pub struct ControlFrame {
    guid: String,
    method: ControlMethod,
    data: ControlData,
}

impl ControlFrame {
    pub fn subscribe(keys: &[InstrumentKey], mode: FeedMode) -> Self {
        Self::new(ControlMethod::Sub, Some(mode), keys)
    }

    pub fn unsubscribe(keys: &[InstrumentKey]) -> Self {
        Self::new(ControlMethod::Unsub, None, keys)
    }

    pub fn change_mode(keys: &[InstrumentKey], mode: FeedMode) -> Self {
        Self::new(ControlMethod::ChangeMode, Some(mode), keys)
    }

    fn new(method: ControlMethod, mode: Option<FeedMode>, keys: &[InstrumentKey]) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            method,
            data: ControlData {
                mode,
                instrument_keys: keys.iter().map(|k| k.as_str().to_string()).collect(),
            },
        }
    }

    pub fn method(&self) -> ControlMethod {
        self.method
    }

    /// Serialize for the wire. The server expects JSON carried in a binary
    /// WebSocket frame.
    pub fn to_binary(&self) -> WsResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
