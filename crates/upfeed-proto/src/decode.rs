//! Typed decode layer over the wire messages.
//!
//! `decode_frame` turns one binary frame into a [`FeedEnvelope`] whose
//! per-instrument records preserve the wire's unset/present distinction:
//! every optional leaf stays `Option`, so a missing price is never read as
//! a real zero.

use crate::error::{DecodeError, DecodeResult};
use crate::wire;
use prost::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use upfeed_core::{FeedMode, InstrumentKey};

/// Frame-level discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    InitialFeed,
    LiveFeed,
    MarketInfo,
}

impl From<wire::FeedResponseType> for FeedKind {
    fn from(t: wire::FeedResponseType) -> Self {
        match t {
            wire::FeedResponseType::InitialFeed => Self::InitialFeed,
            wire::FeedResponseType::LiveFeed => Self::LiveFeed,
            wire::FeedResponseType::MarketInfo => Self::MarketInfo,
        }
    }
}

/// Trading-segment status, decoded from market_info frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    PreOpenStart,
    PreOpenEnd,
    NormalOpen,
    NormalClose,
    ClosingStart,
    ClosingEnd,
}

impl From<wire::MarketStatus> for SegmentStatus {
    fn from(s: wire::MarketStatus) -> Self {
        match s {
            wire::MarketStatus::PreOpenStart => Self::PreOpenStart,
            wire::MarketStatus::PreOpenEnd => Self::PreOpenEnd,
            wire::MarketStatus::NormalOpen => Self::NormalOpen,
            wire::MarketStatus::NormalClose => Self::NormalClose,
            wire::MarketStatus::ClosingStart => Self::ClosingStart,
            wire::MarketStatus::ClosingEnd => Self::ClosingEnd,
        }
    }
}

/// Last traded price/time/quantity and previous close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LtpcTick {
    pub ltp: Option<f64>,
    pub ltt: Option<i64>,
    pub ltq: Option<i64>,
    pub cp: Option<f64>,
}

/// One order-book level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteLevel {
    pub bid_quantity: Option<i64>,
    pub bid_price: Option<f64>,
    pub ask_quantity: Option<i64>,
    pub ask_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionGreeksTick {
    pub delta: Option<f64>,
    pub theta: Option<f64>,
    pub gamma: Option<f64>,
    pub vega: Option<f64>,
    pub rho: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcCandle {
    pub interval: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub timestamp: Option<i64>,
}

/// Full market feed: LTPC, depth, greeks, candles and volume fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketFullTick {
    pub ltpc: Option<LtpcTick>,
    pub depth: Vec<QuoteLevel>,
    pub option_greeks: Option<OptionGreeksTick>,
    pub ohlc: Vec<OhlcCandle>,
    /// Average traded price.
    pub atp: Option<f64>,
    /// Volume traded today.
    pub vtt: Option<i64>,
    /// Open interest.
    pub oi: Option<f64>,
    /// Implied volatility.
    pub iv: Option<f64>,
    /// Total buy quantity.
    pub tbq: Option<i64>,
    /// Total sell quantity.
    pub tsq: Option<i64>,
}

/// Full index feed: LTPC and candles only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexFullTick {
    pub ltpc: Option<LtpcTick>,
    pub ohlc: Vec<OhlcCandle>,
}

/// Top-of-book with greeks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreeksTick {
    pub ltpc: Option<LtpcTick>,
    pub first_depth: Option<QuoteLevel>,
    pub option_greeks: Option<OptionGreeksTick>,
    pub vtt: Option<i64>,
    pub oi: Option<f64>,
    pub iv: Option<f64>,
}

/// Discriminated per-instrument payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickPayload {
    Ltpc(LtpcTick),
    MarketFull(MarketFullTick),
    IndexFull(IndexFullTick),
    FirstLevelWithGreeks(GreeksTick),
    /// Union member this decoder does not recognize; the record is kept so
    /// the rest of the frame still reaches consumers.
    Unsupported,
}

/// Decoded update for one instrument. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub request_mode: FeedMode,
    pub payload: TickPayload,
}

/// Decoded representation of one multiplexed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEnvelope {
    pub kind: FeedKind,
    pub feeds: HashMap<InstrumentKey, TickRecord>,
    pub current_ts: i64,
    pub market_status: Option<HashMap<String, SegmentStatus>>,
}

/// Decode one binary frame into a typed envelope. Pure and stateless.
pub fn decode_frame(bytes: &[u8]) -> DecodeResult<FeedEnvelope> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyFrame);
    }

    let response = wire::FeedResponse::decode(bytes)?;

    let kind = wire::FeedResponseType::try_from(response.r#type)
        .map(FeedKind::from)
        .unwrap_or(FeedKind::LiveFeed);

    let feeds = response
        .feeds
        .into_iter()
        .map(|(key, feed)| (InstrumentKey::from(key), decode_feed(feed)))
        .collect();

    let market_status = response.market_info.map(|info| {
        info.segment_status
            .into_iter()
            .filter_map(|(segment, raw)| {
                wire::MarketStatus::try_from(raw)
                    .ok()
                    .map(|s| (segment, SegmentStatus::from(s)))
            })
            .collect()
    });

    Ok(FeedEnvelope {
        kind,
        feeds,
        current_ts: response.current_ts,
        market_status,
    })
}

fn decode_feed(feed: wire::Feed) -> TickRecord {
    let request_mode = decode_request_mode(feed.request_mode);

    let payload = match feed.feed_union {
        Some(wire::feed::FeedUnion::Ltpc(ltpc)) => TickPayload::Ltpc(decode_ltpc(ltpc)),
        Some(wire::feed::FeedUnion::FullFeed(full)) => match full.full_feed_union {
            Some(wire::full_feed::FullFeedUnion::MarketFf(market)) => {
                TickPayload::MarketFull(decode_market_full(market))
            }
            Some(wire::full_feed::FullFeedUnion::IndexFf(index)) => {
                TickPayload::IndexFull(decode_index_full(index))
            }
            None => TickPayload::Unsupported,
        },
        Some(wire::feed::FeedUnion::FirstLevelWithGreeks(flwg)) => {
            TickPayload::FirstLevelWithGreeks(decode_first_level(flwg))
        }
        None => TickPayload::Unsupported,
    };

    TickRecord {
        request_mode,
        payload,
    }
}

fn decode_request_mode(raw: i32) -> FeedMode {
    match wire::RequestMode::try_from(raw) {
        Ok(wire::RequestMode::Ltpc) | Err(_) => FeedMode::Ltpc,
        Ok(wire::RequestMode::Full) => FeedMode::Full,
        Ok(wire::RequestMode::OptionGreeks) => FeedMode::OptionGreeks,
        Ok(wire::RequestMode::FullD30) => FeedMode::FullD30,
    }
}

fn decode_ltpc(ltpc: wire::Ltpc) -> LtpcTick {
    LtpcTick {
        ltp: ltpc.ltp,
        ltt: ltpc.ltt,
        ltq: ltpc.ltq,
        cp: ltpc.cp,
    }
}

fn decode_quote(quote: wire::Quote) -> QuoteLevel {
    QuoteLevel {
        bid_quantity: quote.bid_q,
        bid_price: quote.bid_p,
        ask_quantity: quote.ask_q,
        ask_price: quote.ask_p,
    }
}

fn decode_greeks(greeks: wire::OptionGreeks) -> OptionGreeksTick {
    OptionGreeksTick {
        delta: greeks.delta,
        theta: greeks.theta,
        gamma: greeks.gamma,
        vega: greeks.vega,
        rho: greeks.rho,
    }
}

fn decode_ohlc(ohlc: wire::Ohlc) -> OhlcCandle {
    OhlcCandle {
        interval: ohlc.interval,
        open: ohlc.open,
        high: ohlc.high,
        low: ohlc.low,
        close: ohlc.close,
        volume: ohlc.vol,
        timestamp: ohlc.ts,
    }
}

fn decode_market_full(market: wire::MarketFullFeed) -> MarketFullTick {
    MarketFullTick {
        ltpc: market.ltpc.map(decode_ltpc),
        depth: market
            .market_level
            .map(|level| level.bid_ask_quote.into_iter().map(decode_quote).collect())
            .unwrap_or_default(),
        option_greeks: market.option_greeks.map(decode_greeks),
        ohlc: market
            .market_ohlc
            .map(|ohlc| ohlc.ohlc.into_iter().map(decode_ohlc).collect())
            .unwrap_or_default(),
        atp: market.atp,
        vtt: market.vtt,
        oi: market.oi,
        iv: market.iv,
        tbq: market.tbq,
        tsq: market.tsq,
    }
}

fn decode_index_full(index: wire::IndexFullFeed) -> IndexFullTick {
    IndexFullTick {
        ltpc: index.ltpc.map(decode_ltpc),
        ohlc: index
            .market_ohlc
            .map(|ohlc| ohlc.ohlc.into_iter().map(decode_ohlc).collect())
            .unwrap_or_default(),
    }
}

fn decode_first_level(flwg: wire::FirstLevelWithGreeks) -> GreeksTick {
    GreeksTick {
        ltpc: flwg.ltpc.map(decode_ltpc),
        first_depth: flwg.first_depth.map(decode_quote),
        option_greeks: flwg.option_greeks.map(decode_greeks),
        vtt: flwg.vtt,
        oi: flwg.oi,
        iv: flwg.iv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    fn ltpc_frame(key: &str, ltp: Option<f64>) -> Vec<u8> {
        let mut feeds = HashMap::new();
        feeds.insert(
            key.to_string(),
            wire::Feed {
                feed_union: Some(wire::feed::FeedUnion::Ltpc(wire::Ltpc {
                    ltp,
                    ltt: Some(1_700_000_000_000),
                    ltq: Some(10),
                    cp: None,
                })),
                request_mode: wire::RequestMode::Ltpc as i32,
            },
        );
        wire::FeedResponse {
            r#type: wire::FeedResponseType::LiveFeed as i32,
            feeds,
            current_ts: 1_700_000_000_123,
            market_info: None,
        }
        .encode_to_vec()
    }

    #[test]
    fn test_decode_ltpc_frame() {
        let envelope = decode_frame(&ltpc_frame("NSE_EQ|INE020B01018", Some(102.5))).unwrap();

        assert_eq!(envelope.kind, FeedKind::LiveFeed);
        assert_eq!(envelope.current_ts, 1_700_000_000_123);
        let record = &envelope.feeds[&InstrumentKey::from("NSE_EQ|INE020B01018")];
        assert_eq!(record.request_mode, FeedMode::Ltpc);
        match &record.payload {
            TickPayload::Ltpc(tick) => {
                assert_eq!(tick.ltp, Some(102.5));
                assert_eq!(tick.ltq, Some(10));
            }
            other => panic!("expected ltpc payload, got {other:?}"),
        }
    }

    #[test]
    fn test_unset_field_is_not_zero() {
        // ltp absent on the wire must decode to None, while an explicit zero
        // must stay Some(0.0).
        let envelope = decode_frame(&ltpc_frame("A", None)).unwrap();
        let TickPayload::Ltpc(unset) = &envelope.feeds[&InstrumentKey::from("A")].payload else {
            panic!("expected ltpc payload");
        };
        assert_eq!(unset.ltp, None);
        assert_eq!(unset.cp, None);

        let envelope = decode_frame(&ltpc_frame("A", Some(0.0))).unwrap();
        let TickPayload::Ltpc(zero) = &envelope.feeds[&InstrumentKey::from("A")].payload else {
            panic!("expected ltpc payload");
        };
        assert_eq!(zero.ltp, Some(0.0));
    }

    #[test]
    fn test_decode_market_full_feed() {
        let mut feeds = HashMap::new();
        feeds.insert(
            "NSE_FO|54321".to_string(),
            wire::Feed {
                feed_union: Some(wire::feed::FeedUnion::FullFeed(wire::FullFeed {
                    full_feed_union: Some(wire::full_feed::FullFeedUnion::MarketFf(
                        wire::MarketFullFeed {
                            ltpc: Some(wire::Ltpc {
                                ltp: Some(250.0),
                                ltt: Some(1),
                                ltq: Some(5),
                                cp: Some(248.0),
                            }),
                            market_level: Some(wire::MarketLevel {
                                bid_ask_quote: vec![wire::Quote {
                                    bid_q: Some(100),
                                    bid_p: Some(249.5),
                                    ask_q: Some(80),
                                    ask_p: Some(250.5),
                                }],
                            }),
                            option_greeks: Some(wire::OptionGreeks {
                                delta: Some(0.42),
                                theta: None,
                                gamma: None,
                                vega: None,
                                rho: None,
                            }),
                            market_ohlc: None,
                            atp: Some(249.8),
                            vtt: Some(1_000_000),
                            oi: None,
                            iv: Some(0.22),
                            tbq: Some(5000),
                            tsq: Some(4200),
                        },
                    )),
                })),
                request_mode: wire::RequestMode::Full as i32,
            },
        );
        let bytes = wire::FeedResponse {
            r#type: wire::FeedResponseType::InitialFeed as i32,
            feeds,
            current_ts: 7,
            market_info: None,
        }
        .encode_to_vec();

        let envelope = decode_frame(&bytes).unwrap();
        assert_eq!(envelope.kind, FeedKind::InitialFeed);
        let record = &envelope.feeds[&InstrumentKey::from("NSE_FO|54321")];
        assert_eq!(record.request_mode, FeedMode::Full);
        match &record.payload {
            TickPayload::MarketFull(tick) => {
                assert_eq!(tick.depth.len(), 1);
                assert_eq!(tick.depth[0].bid_price, Some(249.5));
                assert_eq!(tick.option_greeks.as_ref().unwrap().delta, Some(0.42));
                assert_eq!(tick.option_greeks.as_ref().unwrap().theta, None);
                assert!(tick.ohlc.is_empty());
                assert_eq!(tick.oi, None);
                assert_eq!(tick.iv, Some(0.22));
            }
            other => panic!("expected market full payload, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_index_and_greeks_variants() {
        let mut feeds = HashMap::new();
        feeds.insert(
            "NSE_INDEX|Nifty 50".to_string(),
            wire::Feed {
                feed_union: Some(wire::feed::FeedUnion::FullFeed(wire::FullFeed {
                    full_feed_union: Some(wire::full_feed::FullFeedUnion::IndexFf(
                        wire::IndexFullFeed {
                            ltpc: Some(wire::Ltpc {
                                ltp: Some(22_000.0),
                                ltt: None,
                                ltq: None,
                                cp: None,
                            }),
                            market_ohlc: Some(wire::MarketOhlc {
                                ohlc: vec![wire::Ohlc {
                                    interval: Some("1d".to_string()),
                                    open: Some(21_900.0),
                                    high: Some(22_050.0),
                                    low: Some(21_850.0),
                                    close: Some(22_000.0),
                                    vol: None,
                                    ts: Some(9),
                                }],
                            }),
                        },
                    )),
                })),
                request_mode: wire::RequestMode::Full as i32,
            },
        );
        feeds.insert(
            "NSE_FO|OPT1".to_string(),
            wire::Feed {
                feed_union: Some(wire::feed::FeedUnion::FirstLevelWithGreeks(
                    wire::FirstLevelWithGreeks {
                        ltpc: None,
                        first_depth: Some(wire::Quote {
                            bid_q: Some(50),
                            bid_p: Some(12.5),
                            ask_q: Some(75),
                            ask_p: Some(12.7),
                        }),
                        option_greeks: Some(wire::OptionGreeks {
                            delta: Some(-0.3),
                            theta: Some(-0.05),
                            gamma: None,
                            vega: None,
                            rho: None,
                        }),
                        vtt: None,
                        oi: Some(1500.0),
                        iv: None,
                    },
                )),
                request_mode: wire::RequestMode::OptionGreeks as i32,
            },
        );
        let bytes = wire::FeedResponse {
            r#type: wire::FeedResponseType::LiveFeed as i32,
            feeds,
            current_ts: 0,
            market_info: None,
        }
        .encode_to_vec();

        let envelope = decode_frame(&bytes).unwrap();
        assert_eq!(envelope.feeds.len(), 2);

        match &envelope.feeds[&InstrumentKey::from("NSE_INDEX|Nifty 50")].payload {
            TickPayload::IndexFull(tick) => {
                assert_eq!(tick.ohlc.len(), 1);
                assert_eq!(tick.ohlc[0].volume, None);
                assert_eq!(tick.ohlc[0].interval.as_deref(), Some("1d"));
            }
            other => panic!("expected index payload, got {other:?}"),
        }

        match &envelope.feeds[&InstrumentKey::from("NSE_FO|OPT1")].payload {
            TickPayload::FirstLevelWithGreeks(tick) => {
                assert!(tick.ltpc.is_none());
                assert_eq!(tick.first_depth.as_ref().unwrap().ask_price, Some(12.7));
                assert_eq!(tick.oi, Some(1500.0));
            }
            other => panic!("expected greeks payload, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_market_info_frame() {
        let mut segment_status = HashMap::new();
        segment_status.insert(
            "NSE_EQ".to_string(),
            wire::MarketStatus::NormalOpen as i32,
        );
        let bytes = wire::FeedResponse {
            r#type: wire::FeedResponseType::MarketInfo as i32,
            feeds: HashMap::new(),
            current_ts: 1,
            market_info: Some(wire::MarketInfo { segment_status }),
        }
        .encode_to_vec();

        let envelope = decode_frame(&bytes).unwrap();
        assert_eq!(envelope.kind, FeedKind::MarketInfo);
        let status = envelope.market_status.unwrap();
        assert_eq!(status["NSE_EQ"], SegmentStatus::NormalOpen);
    }

    #[test]
    fn test_missing_union_member_is_unsupported() {
        let mut feeds = HashMap::new();
        feeds.insert(
            "X".to_string(),
            wire::Feed {
                feed_union: None,
                request_mode: wire::RequestMode::Full as i32,
            },
        );
        let bytes = wire::FeedResponse {
            r#type: wire::FeedResponseType::LiveFeed as i32,
            feeds,
            current_ts: 0,
            market_info: None,
        }
        .encode_to_vec();

        let envelope = decode_frame(&bytes).unwrap();
        let record = &envelope.feeds[&InstrumentKey::from("X")];
        assert_eq!(record.payload, TickPayload::Unsupported);
        assert_eq!(record.request_mode, FeedMode::Full);
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        assert!(matches!(decode_frame(&[]), Err(DecodeError::EmptyFrame)));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = decode_frame(&[0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
