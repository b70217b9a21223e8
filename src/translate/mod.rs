//! The per-venue translation layer: pure strategies converting decoded venue payloads into a
//! single normalized instruction stream.

pub mod bitfinex;
pub mod okx;
pub mod poloniex;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::book::{Level, Side};

/// A frame the [`crate::session::Session`] should write to the transport verbatim.
pub type OutboundFrame = Value;

/// Errors surfaced by [`Translator::translate`].
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The frame was not valid JSON, or matched none of this venue's message patterns.
    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    /// A message arrived on a channel we understand, in a shape we don't. Unlike an entirely
    /// unrecognized message (which is a harmless `NoOp`), this means our understanding of the
    /// venue's wire format is wrong and the translation state may now be stale.
    #[error("message on a known channel did not match any expected shape")]
    UnrecognizedShape,
}

/// One buy or sell print.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeEvent {
    pub price: f64,
    pub size: f64,
    pub timestamp: DateTime<Utc>,
}

impl TradeEvent {
    pub fn new(price: f64, size: f64, timestamp: DateTime<Utc>) -> Self {
        Self { price, size, timestamp }
    }
}

/// A normalized instruction emitted by a [`Translator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Advisory/heartbeat/subscription acknowledgement; no effect on the book.
    NoOp,
    /// Replace the book entirely.
    Snapshot { bids: Vec<Level>, asks: Vec<Level> },
    /// Apply each delta in order.
    Deltas(Vec<(Side, f64, f64)>),
    /// Forward as market-buy prints.
    Buys(Vec<TradeEvent>),
    /// Forward as market-sell prints.
    Sells(Vec<TradeEvent>),
}

/// A pluggable, pure per-venue strategy.
///
/// Implementations hold no state of their own — the translation state lives in `Self::State`,
/// owned by the `Session` and threaded through every call. `translate` must be pure: no I/O, no
/// mutation outside the returned state, and unknown or uninteresting messages must yield
/// `[NoOp]` with the state unchanged.
pub trait Translator {
    /// The per-venue translation state, e.g. subscription channel ids or sequence numbers.
    type State: Clone + Send + Sync + 'static;

    /// The starting translation state for a freshly (re)connected session.
    fn initial_state(&self, base: &str, quote: &str) -> Self::State;

    /// The one-time frames to send right after connecting.
    fn subscribe_msg(&self, base: &str, quote: &str) -> Vec<OutboundFrame>;

    /// Keepalive frames to emit on the ping timer. May be empty if subscription isn't confirmed
    /// yet.
    fn ping_msg(&self, state: &Self::State) -> Vec<OutboundFrame>;

    /// Whether the mirror is currently trusted to be consistent with the venue.
    fn synchronised(&self, state: &Self::State) -> bool;

    /// Consume one decoded message, producing zero or more instructions and the next state.
    fn translate(
        &self,
        message: &Value,
        state: Self::State,
    ) -> Result<(Vec<Instruction>, Self::State), TranslateError>;
}

pub(crate) fn micros_from_epoch_ms(epoch_ms: f64) -> Option<DateTime<Utc>> {
    let micros = (epoch_ms * 1000.0) as i64;
    DateTime::from_timestamp_micros(micros)
}
