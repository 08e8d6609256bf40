//! Events relayed between service instances over the pub/sub channels.
//!
//! Events carry no market payload: a [`MarketEvent`] only says that a
//! symbol's data changed, consumers re-read the cache.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

use super::trading::Report;

/// A symbol's cached data changed on an exchange.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct MarketEvent {
    pub symbol: String,
    pub exchange: String,
}

/// A completed trade report for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
pub struct TradingEvent {
    pub exchange: String,
    pub user_id: String,
    pub report: Report,
}

/// A user's API credentials changed. Relayed only; never stored here.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct KeyEvent {
    pub user_id: String,
    pub exchange: String,
    pub public_key: String,
    pub secret_key: String,
}

/// The event kinds carried by the relay, one channel each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Market,
    Trading,
    Key,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Trading => write!(f, "trading"),
            Self::Key => write!(f, "key"),
        }
    }
}

impl std::fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarketEvent({}@{})", self.symbol, self.exchange)
    }
}

impl std::fmt::Display for TradingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TradingEvent({}@{} {})", self.user_id, self.exchange, self.report)
    }
}

impl std::fmt::Display for KeyEvent {
    // Never print key material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyEvent({}@{})", self.user_id, self.exchange)
    }
}
