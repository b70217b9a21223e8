//! Downstream collaborators: narrow interfaces the session forwards normalized events to.
//!
//! Persistence and analytics are out of scope for this crate (see spec.md §1); these traits are
//! the seam a caller plugs its own consumer into. Only a no-op sink and an in-process channel
//! sink (for tests and the demo binary) are provided here.

use crate::book::{Level, Side};
use crate::translate::TradeEvent;

/// The error a downstream consumer can raise when it refuses an event. The core does not retry
/// sinks; callers surface this upward.
#[derive(Debug, thiserror::Error)]
#[error("sink refused event: {0}")]
pub struct SinkError(pub String);

/// Receives order book snapshot/delta events for one market.
pub trait BookSink: Send + Sync {
    fn on_snapshot(&self, market_tag: &str, bids: &[Level], asks: &[Level]) -> Result<(), SinkError>;
    fn on_deltas(&self, market_tag: &str, deltas: &[(Side, f64, f64)]) -> Result<(), SinkError>;
}

/// Receives trade prints for one market.
pub trait TradeSink: Send + Sync {
    fn on_trade(&self, market_tag: &str, side: TradeDirection, trade: &TradeEvent) -> Result<(), SinkError>;
}

/// Which side of the trade took liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// Discards everything. Useful where only the in-memory book mirror matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl BookSink for NullSink {
    fn on_snapshot(&self, _market_tag: &str, _bids: &[Level], _asks: &[Level]) -> Result<(), SinkError> {
        Ok(())
    }

    fn on_deltas(&self, _market_tag: &str, _deltas: &[(Side, f64, f64)]) -> Result<(), SinkError> {
        Ok(())
    }
}

impl TradeSink for NullSink {
    fn on_trade(&self, _market_tag: &str, _side: TradeDirection, _trade: &TradeEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// An event forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Snapshot { market_tag: String, bids: Vec<Level>, asks: Vec<Level> },
    Deltas { market_tag: String, deltas: Vec<(Side, f64, f64)> },
    Trade { market_tag: String, side: TradeDirection, trade: TradeEvent },
}

/// Forwards every event onto a bounded `tokio::sync::mpsc` channel. Used by tests and the demo
/// binary in place of a real persistence layer.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<SinkEvent>) -> Self {
        Self { tx }
    }
}

impl BookSink for ChannelSink {
    fn on_snapshot(&self, market_tag: &str, bids: &[Level], asks: &[Level]) -> Result<(), SinkError> {
        self.tx
            .try_send(SinkEvent::Snapshot {
                market_tag: market_tag.to_string(),
                bids: bids.to_vec(),
                asks: asks.to_vec(),
            })
            .map_err(|e| SinkError(e.to_string()))
    }

    fn on_deltas(&self, market_tag: &str, deltas: &[(Side, f64, f64)]) -> Result<(), SinkError> {
        self.tx
            .try_send(SinkEvent::Deltas { market_tag: market_tag.to_string(), deltas: deltas.to_vec() })
            .map_err(|e| SinkError(e.to_string()))
    }
}

impl TradeSink for ChannelSink {
    fn on_trade(&self, market_tag: &str, side: TradeDirection, trade: &TradeEvent) -> Result<(), SinkError> {
        self.tx
            .try_send(SinkEvent::Trade { market_tag: market_tag.to_string(), side, trade: *trade })
            .map_err(|e| SinkError(e.to_string()))
    }
}
