use std::cmp::Ordering;

/// A price used as a `BTreeMap` key.
///
/// Ordered with [`f64::total_cmp`] rather than `PartialOrd` so the side maps stay well-formed
/// even if a venue ever hands us a degenerate value (NaN sorts to one consistent place instead
/// of making the map's invariants undefined).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceKey(pub f64);

impl Eq for PriceKey {}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for PriceKey {
    fn from(price: f64) -> Self {
        Self(price)
    }
}
