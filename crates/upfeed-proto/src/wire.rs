//! Wire-level message types for the market data feed protocol.
//!
//! Hand-written prost definitions mirroring the broker's MarketDataFeed v3
//! schema. Leaf fields are proto3 `optional`, so an absent value decodes to
//! `None` and is never conflated with a present zero.

use std::collections::HashMap;

/// Frame type discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FeedResponseType {
    InitialFeed = 0,
    LiveFeed = 1,
    MarketInfo = 2,
}

/// Mode the server is honouring for an instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RequestMode {
    Ltpc = 0,
    Full = 1,
    OptionGreeks = 2,
    FullD30 = 3,
}

/// Trading-segment status values carried by market_info frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MarketStatus {
    PreOpenStart = 0,
    PreOpenEnd = 1,
    NormalOpen = 2,
    NormalClose = 3,
    ClosingStart = 4,
    ClosingEnd = 5,
}

/// Last traded price, time, quantity and previous close.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ltpc {
    #[prost(double, optional, tag = "1")]
    pub ltp: Option<f64>,
    #[prost(int64, optional, tag = "2")]
    pub ltt: Option<i64>,
    #[prost(int64, optional, tag = "3")]
    pub ltq: Option<i64>,
    #[prost(double, optional, tag = "4")]
    pub cp: Option<f64>,
}

/// One bid/ask level of the order book.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Quote {
    #[prost(int64, optional, tag = "1")]
    pub bid_q: Option<i64>,
    #[prost(double, optional, tag = "2")]
    pub bid_p: Option<f64>,
    #[prost(int64, optional, tag = "3")]
    pub ask_q: Option<i64>,
    #[prost(double, optional, tag = "4")]
    pub ask_p: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketLevel {
    #[prost(message, repeated, tag = "1")]
    pub bid_ask_quote: Vec<Quote>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OptionGreeks {
    #[prost(double, optional, tag = "1")]
    pub delta: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub theta: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub gamma: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub vega: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub rho: Option<f64>,
}

/// One OHLC candle for a named interval.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ohlc {
    #[prost(string, optional, tag = "1")]
    pub interval: Option<String>,
    #[prost(double, optional, tag = "2")]
    pub open: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub high: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub low: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub close: Option<f64>,
    #[prost(int64, optional, tag = "6")]
    pub vol: Option<i64>,
    #[prost(int64, optional, tag = "7")]
    pub ts: Option<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketOhlc {
    #[prost(message, repeated, tag = "1")]
    pub ohlc: Vec<Ohlc>,
}

/// Full feed for an exchange-traded instrument.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketFullFeed {
    #[prost(message, optional, tag = "1")]
    pub ltpc: Option<Ltpc>,
    #[prost(message, optional, tag = "2")]
    pub market_level: Option<MarketLevel>,
    #[prost(message, optional, tag = "3")]
    pub option_greeks: Option<OptionGreeks>,
    #[prost(message, optional, tag = "4")]
    pub market_ohlc: Option<MarketOhlc>,
    #[prost(double, optional, tag = "5")]
    pub atp: Option<f64>,
    #[prost(int64, optional, tag = "6")]
    pub vtt: Option<i64>,
    #[prost(double, optional, tag = "7")]
    pub oi: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub iv: Option<f64>,
    #[prost(int64, optional, tag = "9")]
    pub tbq: Option<i64>,
    #[prost(int64, optional, tag = "10")]
    pub tsq: Option<i64>,
}

/// Full feed for an index (no order book or greeks).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IndexFullFeed {
    #[prost(message, optional, tag = "1")]
    pub ltpc: Option<Ltpc>,
    #[prost(message, optional, tag = "2")]
    pub market_ohlc: Option<MarketOhlc>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FullFeed {
    #[prost(oneof = "full_feed::FullFeedUnion", tags = "1, 2")]
    pub full_feed_union: Option<full_feed::FullFeedUnion>,
}

pub mod full_feed {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum FullFeedUnion {
        #[prost(message, tag = "1")]
        MarketFf(super::MarketFullFeed),
        #[prost(message, tag = "2")]
        IndexFf(super::IndexFullFeed),
    }
}

/// Top-of-book plus greeks, without full depth.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FirstLevelWithGreeks {
    #[prost(message, optional, tag = "1")]
    pub ltpc: Option<Ltpc>,
    #[prost(message, optional, tag = "2")]
    pub first_depth: Option<Quote>,
    #[prost(message, optional, tag = "3")]
    pub option_greeks: Option<OptionGreeks>,
    #[prost(int64, optional, tag = "4")]
    pub vtt: Option<i64>,
    #[prost(double, optional, tag = "5")]
    pub oi: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub iv: Option<f64>,
}

/// Per-instrument update, dispatching on the feed union.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Feed {
    #[prost(oneof = "feed::FeedUnion", tags = "1, 2, 3")]
    pub feed_union: Option<feed::FeedUnion>,
    #[prost(enumeration = "RequestMode", tag = "4")]
    pub request_mode: i32,
}

pub mod feed {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum FeedUnion {
        #[prost(message, tag = "1")]
        Ltpc(super::Ltpc),
        #[prost(message, tag = "2")]
        FullFeed(super::FullFeed),
        #[prost(message, tag = "3")]
        FirstLevelWithGreeks(super::FirstLevelWithGreeks),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketInfo {
    #[prost(map = "string, enumeration(MarketStatus)", tag = "1")]
    pub segment_status: HashMap<String, i32>,
}

/// One multiplexed frame from the feed socket.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeedResponse {
    #[prost(enumeration = "FeedResponseType", tag = "1")]
    pub r#type: i32,
    #[prost(map = "string, message", tag = "2")]
    pub feeds: HashMap<String, Feed>,
    #[prost(int64, tag = "3")]
    pub current_ts: i64,
    #[prost(message, optional, tag = "4")]
    pub market_info: Option<MarketInfo>,
}
