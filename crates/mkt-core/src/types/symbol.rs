//! Canonical trading pair on one exchange.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// A tradable pair, e.g. `BTCUSDT` = `BTC` quoted in `USDT`.
///
/// `id` is always `base + quote` (uppercase, no separator). The empty symbol
/// (`Symbol::default()`) means "unresolved" rather than an error.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
pub struct Symbol {
    pub id: String,
    pub base: String,
    pub quote: String,
}

impl Symbol {
    /// Build a symbol from its legs; the id is derived.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        let base = base.into();
        let quote = quote.into();
        Self {
            id: format!("{base}{quote}"),
            base,
            quote,
        }
    }

    /// `false` for the empty symbol returned when resolution fails.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        !self.id.is_empty()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_resolved() {
            write!(f, "{}/{}", self.base, self.quote)
        } else {
            write!(f, "<unresolved>")
        }
    }
}
