//! The order book mirror: two ordered sides, delta and snapshot application, ordered queries.
//!
//! [`OrderBook`] is pure data with no I/O. It never fails: numerically degenerate inputs are the
//! caller's responsibility, and a delete of a price that isn't present is silently a no-op.

mod price;

use std::collections::BTreeMap;

use parking_lot::RwLock;
use price::PriceKey;

/// Which side of the book a level or delta belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

/// A single (price, liquidity) level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub price: f64,
    pub liquidity: f64,
}

impl Level {
    pub fn new(price: f64, liquidity: f64) -> Self {
        Self { price, liquidity }
    }
}

/// Returned by [`OrderBook::best_bid`] / [`OrderBook::best_ask`] when the requested side has no
/// levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("side is empty")]
pub struct SideEmpty;

struct BookState {
    bids: BTreeMap<PriceKey, f64>,
    asks: BTreeMap<PriceKey, f64>,
}

impl BookState {
    fn empty() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }
}

/// The two-sided order book mirror for one market.
///
/// Both sides live behind a single lock so that `book()` can never observe a torn snapshot
/// across a concurrent delta: readers see either the state before or after a write, never a mix.
pub struct OrderBook {
    inner: RwLock<BookState>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BookState::empty()),
        }
    }

    /// Bids ordered highest price first.
    pub fn bids(&self) -> Vec<Level> {
        let guard = self.inner.read();
        guard
            .bids
            .iter()
            .rev()
            .map(|(p, l)| Level::new(p.0, *l))
            .collect()
    }

    /// Asks ordered lowest price first.
    pub fn asks(&self) -> Vec<Level> {
        let guard = self.inner.read();
        guard
            .asks
            .iter()
            .map(|(p, l)| Level::new(p.0, *l))
            .collect()
    }

    /// Both sides, read under one lock acquisition.
    pub fn book(&self) -> (Vec<Level>, Vec<Level>) {
        let guard = self.inner.read();
        let bids = guard.bids.iter().rev().map(|(p, l)| Level::new(p.0, *l)).collect();
        let asks = guard.asks.iter().map(|(p, l)| Level::new(p.0, *l)).collect();
        (bids, asks)
    }

    pub fn best_bid(&self) -> Result<Level, SideEmpty> {
        let guard = self.inner.read();
        guard
            .bids
            .iter()
            .next_back()
            .map(|(p, l)| Level::new(p.0, *l))
            .ok_or(SideEmpty)
    }

    pub fn best_ask(&self) -> Result<Level, SideEmpty> {
        let guard = self.inner.read();
        guard
            .asks
            .iter()
            .next()
            .map(|(p, l)| Level::new(p.0, *l))
            .ok_or(SideEmpty)
    }

    pub fn bids_empty(&self) -> bool {
        self.inner.read().bids.is_empty()
    }

    pub fn asks_empty(&self) -> bool {
        self.inner.read().asks.is_empty()
    }

    /// Insert-or-replace at `price`, or delete it if `liquidity <= 0`. Deleting a price that
    /// isn't present is a no-op.
    pub fn apply_delta(&self, side: Side, price: f64, liquidity: f64) {
        let mut guard = self.inner.write();
        let map = match side {
            Side::Bid => &mut guard.bids,
            Side::Ask => &mut guard.asks,
        };
        let key = PriceKey(price);
        if liquidity <= 0.0 {
            map.remove(&key);
        } else {
            map.insert(key, liquidity);
        }
    }

    /// Atomically replace both sides. Levels need not be pre-sorted; duplicate prices within a
    /// side collapse last-write-wins.
    pub fn apply_snapshot<B, A>(&self, bids: B, asks: A)
    where
        B: IntoIterator<Item = Level>,
        A: IntoIterator<Item = Level>,
    {
        let mut new_bids = BTreeMap::new();
        for level in bids {
            if level.liquidity > 0.0 {
                new_bids.insert(PriceKey(level.price), level.liquidity);
            }
        }
        let mut new_asks = BTreeMap::new();
        for level in asks {
            if level.liquidity > 0.0 {
                new_asks.insert(PriceKey(level.price), level.liquidity);
            }
        }

        let mut guard = self.inner.write();
        guard.bids = new_bids;
        guard.asks = new_asks;
    }

    /// Discard all state. Used by the session on reconnect.
    pub fn clear(&self) {
        let mut guard = self.inner.write();
        guard.bids.clear();
        guard.asks.clear();
    }
}
