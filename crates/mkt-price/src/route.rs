//! Pricing plans and strict-mode errors.

use mkt_core::QuoteCurrency;

/// How an identifier's value is turned into USD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The value is already USD-denominated; returned unchanged.
    Identity,
    /// One hop: multiply by the close of a USD-quoted pair.
    Direct(String),
    /// Two hops through BTC or ETH: `leg` is quoted in the bridge currency,
    /// `bridge` prices that currency in USD.
    Bridged { leg: String, bridge: String },
    /// No pair matched the identifier.
    Unresolved,
}

impl Route {
    /// USD-quoted pair id for `base`.
    pub fn usd_pair(base: &str) -> String {
        format!("{base}{}", QuoteCurrency::Usd.code())
    }

    /// Two-hop route for `base` quoted in `via`.
    pub fn bridged(base: &str, via: QuoteCurrency) -> Self {
        Route::Bridged {
            leg: format!("{base}{}", via.code()),
            bridge: Self::usd_pair(via.code()),
        }
    }

    /// Pair ids whose prices this route multiplies, in order.
    pub fn pairs(&self) -> Vec<&str> {
        match self {
            Route::Identity | Route::Unresolved => Vec::new(),
            Route::Direct(pair) => vec![pair.as_str()],
            Route::Bridged { leg, bridge } => vec![leg.as_str(), bridge.as_str()],
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Identity => write!(f, "identity"),
            Route::Direct(pair) => write!(f, "{pair}"),
            Route::Bridged { leg, bridge } => write!(f, "{leg} -> {bridge}"),
            Route::Unresolved => write!(f, "<unresolved>"),
        }
    }
}

/// Why a strict conversion could not produce a USD amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no pair found for {0}")]
    Unresolved(String),

    #[error("no price for {0}")]
    MissingPrice(String),
}
