//! Binary feed protocol decoder.
//!
//! The broker multiplexes tick updates for many instruments into one
//! Protocol-Buffers frame. This crate translates a single frame into a
//! typed [`FeedEnvelope`] without holding any state: decoding is a pure
//! function and a malformed frame never affects neighbouring frames.
//!
//! Wire types live in [`wire`]; the decoded representation handed to
//! downstream consumers lives in [`decode`].

pub mod decode;
pub mod error;
pub mod wire;

pub use decode::{
    decode_frame, FeedEnvelope, FeedKind, GreeksTick, IndexFullTick, LtpcTick, MarketFullTick,
    OhlcCandle, OptionGreeksTick, QuoteLevel, SegmentStatus, TickPayload, TickRecord,
};
pub use error::{DecodeError, DecodeResult};
