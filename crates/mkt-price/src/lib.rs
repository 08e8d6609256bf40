//! # mkt-price
//!
//! Symbol normalization and USD triangulation over the market metadata cache.
//!
//! ## Architecture
//!
//! [`PriceResolver`] reads exclusively from a [`MarketDataCache`](mkt_store::MarketDataCache)
//! and holds no state of its own, so concurrent calls never race. Every
//! conversion first computes a [`Route`]: the pairs whose latest closes
//! multiply into a USD amount.
//!
//! ```text
//! "LINK" ──convert_symbol──► LINK/BTC ──route──► Bridged { LINKBTC, BTCUSDT }
//!                                                   │
//!               convert_usd:        value * close(LINKBTC) * close(BTCUSDT)
//!               convert_usd_strict: same, Err(MissingPrice) if a leg has no candles
//! ```
//!
//! - [`resolver`] — `convert_symbol`, `convert_usd`, `convert_usd_strict`
//! - [`route`] — the resolved pricing plan and strict-mode errors

pub mod resolver;
pub mod route;

pub use resolver::PriceResolver;
pub use route::{ResolveError, Route};
