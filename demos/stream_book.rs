use std::sync::Arc;

use l2_mirror::book::OrderBook;
use l2_mirror::market::{MarketDescriptor, MarketType, TranslatorSelector};
use l2_mirror::session::{Session, SessionConfig};
use l2_mirror::sink::{ChannelSink, NullSink, SinkEvent};
use l2_mirror::translate::bitfinex::BitfinexTranslator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let market = MarketDescriptor {
        exchange_name: "bitfinex".to_string(),
        market_type: MarketType::spot(),
        base_symbol: "BTC".to_string(),
        quote_symbol: "USD".to_string(),
        endpoint: "wss://api-pub.bitfinex.com/ws/2".to_string(),
        translator: TranslatorSelector::Bitfinex,
        ping_required: true,
    };

    let book = Arc::new(OrderBook::new());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<SinkEvent>(1024);

    let session = Session::new(
        market,
        BitfinexTranslator,
        Arc::clone(&book),
        Arc::new(ChannelSink::new(tx)),
        Arc::new(NullSink),
        SessionConfig::default(),
    );

    let (handle, _shutdown) = session.spawn();

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(?event, "sink event");
        }
    });

    tokio::select! {
        _ = handle => {}
        _ = printer => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    let (bids, asks) = book.book();
    tracing::info!(best_bid = ?bids.first(), best_ask = ?asks.first(), "final book state");

    Ok(())
}
