//! Market descriptors: the immutable configuration tuple identifying one data feed.

use serde::{Deserialize, Serialize};

/// The kind of instrument a market trades: `spot`, `perp`, or any venue-specific string
/// (spec.md leaves the set open: "spot, perp, …").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketType(pub String);

impl MarketType {
    pub fn spot() -> Self {
        Self("spot".to_string())
    }

    pub fn perp() -> Self {
        Self("perp".to_string())
    }

    fn tag_fragment(&self) -> String {
        self.0.to_uppercase()
    }
}

/// A (exchange, market-type, base symbol, quote symbol, transport, translator, ping) tuple
/// identifying one data feed. Created at configuration time and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub exchange_name: String,
    pub market_type: MarketType,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub endpoint: String,
    pub translator: TranslatorSelector,
    pub ping_required: bool,
}

/// Which [`crate::translate::Translator`] a market should be driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorSelector {
    Bitfinex,
    Poloniex,
    Okx,
}

impl MarketDescriptor {
    /// The canonical downstream identifier: `<EXCHANGE>.<TYPE>:<BASE>-<QUOTE>`, fully uppercased.
    pub fn tag(&self) -> String {
        format!(
            "{}.{}:{}-{}",
            self.exchange_name.to_uppercase(),
            self.market_type.tag_fragment(),
            self.base_symbol.to_uppercase(),
            self.quote_symbol.to_uppercase(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_uppercased_and_shaped() {
        let market = MarketDescriptor {
            exchange_name: "bitfinex".to_string(),
            market_type: MarketType::spot(),
            base_symbol: "btc".to_string(),
            quote_symbol: "usd".to_string(),
            endpoint: "wss://api-pub.bitfinex.com/ws/2".to_string(),
            translator: TranslatorSelector::Bitfinex,
            ping_required: true,
        };
        assert_eq!(market.tag(), "BITFINEX.SPOT:BTC-USD");
    }
}
