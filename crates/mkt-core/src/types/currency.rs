//! Quote currencies used for USD triangulation.

use serde::{Deserialize, Serialize};

/// The fixed set of quote currencies a price can be bridged through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteCurrency {
    /// Internal canonical USD-pegged quote.
    Usd,
    Btc,
    Eth,
}

impl QuoteCurrency {
    /// Lookup order when resolving a bare asset into a pair.
    pub const PRIORITY: [QuoteCurrency; 3] = [Self::Usd, Self::Btc, Self::Eth];

    /// Canonical ticker code as it appears in pair ids.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USDT",
            Self::Btc => "BTC",
            Self::Eth => "ETH",
        }
    }

    /// Exact, case-sensitive membership check against the canonical codes.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|q| q.code() == code)
    }
}

impl std::fmt::Display for QuoteCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
