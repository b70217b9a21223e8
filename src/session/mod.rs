//! The per-market session state machine: owns the transport, drives the translator, mutates the
//! book.
//!
//! States: Disconnected (reset book + translation state) → Connecting → Subscribing → Streaming
//! → Terminal. The transition from Subscribing to Streaming is implicit: any data frame that
//! yields a `Snapshot` or `Deltas` implies the session is now streaming, and only then does the
//! ping timer start firing.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

use crate::book::OrderBook;
use crate::market::MarketDescriptor;
use crate::sink::{BookSink, SinkError, TradeDirection, TradeSink};
use crate::translate::{Instruction, TranslateError, Translator};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors a session can encounter. All are handled internally (logged, reconnected); callers
/// see lifecycle events only, never these directly, except through tracing output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("failed to decode inbound frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("downstream sink refused event: {0}")]
    Sink(#[from] SinkError),

    #[error("transport closed")]
    Closed,
}

/// Tunables for the ping timer and reconnect backoff.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub ping_interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(32),
        }
    }
}

/// Owns one venue connection for one market.
pub struct Session<T: Translator> {
    market: MarketDescriptor,
    translator: T,
    book: Arc<OrderBook>,
    book_sink: Arc<dyn BookSink>,
    trade_sink: Arc<dyn TradeSink>,
    config: SessionConfig,
}

impl<T> Session<T>
where
    T: Translator,
{
    pub fn new(
        market: MarketDescriptor,
        translator: T,
        book: Arc<OrderBook>,
        book_sink: Arc<dyn BookSink>,
        trade_sink: Arc<dyn TradeSink>,
        config: SessionConfig,
    ) -> Self {
        Self { market, translator, book, book_sink, trade_sink, config }
    }

    /// Spawns the session's event loop on its own task and returns a shutdown handle.
    pub fn spawn(self) -> (tokio::task::JoinHandle<()>, mpsc::Sender<()>)
    where
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move { self.run(rx).await });
        (handle, tx)
    }

    /// Runs the Disconnected → Connecting → Subscribing → Streaming cycle until `shutdown`
    /// fires, reconnecting with exponential backoff on any transport or decode failure.
    pub async fn run(&self, mut shutdown: mpsc::Receiver<()>) {
        let mut backoff = self.config.initial_backoff;

        loop {
            // Disconnected: always begin with a clean book and fresh translation state.
            self.book.clear();
            let state = self.translator.initial_state(&self.market.base_symbol, &self.market.quote_symbol);

            // `run_connected` already selects on `shutdown` internally and returns `Ok(())` once
            // it observes shutdown; no outer `select!` is needed (and one here would hold two
            // concurrent `&mut shutdown` borrows across sibling branches).
            match self.run_connected(state, &mut shutdown).await {
                Ok(()) => return, // clean shutdown requested mid-stream
                Err(reached_streaming) => {
                    if reached_streaming {
                        backoff = self.config.initial_backoff;
                    } else {
                        backoff = (backoff * 2).min(self.config.max_backoff);
                    }
                }
            }

            tracing::warn!(market = %self.market.tag(), backoff_ms = backoff.as_millis(), "reconnecting");
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown.recv() => return,
            }
        }
    }

    /// Connecting + Subscribing + Streaming, as one connection attempt. Returns `Ok(())` only on
    /// a shutdown signal observed mid-stream; any transport/decode/translate failure is an `Err`
    /// carrying whether Streaming was ever reached (used to decide backoff reset vs. growth).
    async fn run_connected(
        &self,
        mut state: T::State,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> std::result::Result<(), bool> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.market.endpoint)
            .await
            .map_err(|e| {
                tracing::error!(market = %self.market.tag(), error = %e, "connect failed");
                false
            })?;

        let (mut write, mut read) = ws_stream.split();

        for frame in self.translator.subscribe_msg(&self.market.base_symbol, &self.market.quote_symbol) {
            if write.send(tungstenite::Message::Text(frame.to_string())).await.is_err() {
                return Err(false);
            }
        }

        let mut ping_timer = tokio::time::interval(self.config.ping_interval);
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut streaming = false;

        loop {
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),

                _ = ping_timer.tick(), if streaming && self.market.ping_required => {
                    for frame in self.translator.ping_msg(&state) {
                        if write.send(tungstenite::Message::Text(frame.to_string())).await.is_err() {
                            return Err(streaming);
                        }
                    }
                }

                next = read.next() => {
                    match next {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            let value: Value = match serde_json::from_str(&text) {
                                Ok(v) => v,
                                Err(e) => {
                                    tracing::error!(market = %self.market.tag(), error = %e, "decode failure, reconnecting");
                                    return Err(streaming);
                                }
                            };

                            match self.translator.translate(&value, state.clone()) {
                                Ok((instructions, next_state)) => {
                                    state = next_state;
                                    for instruction in instructions {
                                        if self.is_data(&instruction) {
                                            streaming = true;
                                        }
                                        if let Err(e) = self.apply(&instruction) {
                                            tracing::error!(market = %self.market.tag(), error = %e, "sink refused event");
                                            return Err(streaming);
                                        }
                                    }
                                }
                                Err(e) => {
                                    tracing::error!(market = %self.market.tag(), error = %e, "translation error, reconnecting");
                                    return Err(streaming);
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Ping(payload))) => {
                            tracing::debug!(market = %self.market.tag(), "received PING frame");
                            let _ = write.send(tungstenite::Message::Pong(payload)).await;
                        }
                        Some(Ok(tungstenite::Message::Pong(_) | tungstenite::Message::Frame(_) | tungstenite::Message::Binary(_))) => {}
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            tracing::warn!(market = %self.market.tag(), ?frame, "connection closed");
                            return Err(streaming);
                        }
                        Some(Err(e)) => {
                            tracing::error!(market = %self.market.tag(), error = %e, "transport error");
                            return Err(streaming);
                        }
                        None => {
                            tracing::error!(market = %self.market.tag(), "connection closed unexpectedly");
                            return Err(streaming);
                        }
                    }
                }
            }
        }
    }

    fn is_data(&self, instruction: &Instruction) -> bool {
        matches!(instruction, Instruction::Snapshot { .. } | Instruction::Deltas(_))
    }

    fn apply(&self, instruction: &Instruction) -> std::result::Result<(), SinkError> {
        let tag = self.market.tag();
        match instruction {
            Instruction::NoOp => Ok(()),
            Instruction::Snapshot { bids, asks } => {
                self.book.apply_snapshot(bids.clone(), asks.clone());
                self.book_sink.on_snapshot(&tag, bids, asks)
            }
            Instruction::Deltas(deltas) => {
                for (side, price, liquidity) in deltas {
                    self.book.apply_delta(*side, *price, *liquidity);
                }
                self.book_sink.on_deltas(&tag, deltas)
            }
            Instruction::Buys(trades) => {
                for trade in trades {
                    self.trade_sink.on_trade(&tag, TradeDirection::Buy, trade)?;
                }
                Ok(())
            }
            Instruction::Sells(trades) => {
                for trade in trades {
                    self.trade_sink.on_trade(&tag, TradeDirection::Sell, trade)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketType, TranslatorSelector};
    use crate::sink::NullSink;
    use crate::translate::bitfinex::BitfinexTranslator;

    fn market() -> MarketDescriptor {
        MarketDescriptor {
            exchange_name: "bitfinex".to_string(),
            market_type: MarketType::spot(),
            base_symbol: "btc".to_string(),
            quote_symbol: "usd".to_string(),
            endpoint: "wss://invalid.invalid/ws".to_string(),
            translator: TranslatorSelector::Bitfinex,
            ping_required: true,
        }
    }

    #[tokio::test]
    async fn shutdown_before_connect_returns_promptly() {
        let session = Session::new(
            market(),
            BitfinexTranslator,
            Arc::new(OrderBook::new()),
            Arc::new(NullSink),
            Arc::new(NullSink),
            SessionConfig { initial_backoff: Duration::from_millis(1), ..SessionConfig::default() },
        );

        let (handle, shutdown) = session.spawn();
        shutdown.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
