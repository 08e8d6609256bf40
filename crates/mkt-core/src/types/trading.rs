//! Trade execution reports relayed to audit and notification consumers.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(
    Debug,
    Clone,
    Copy,
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
#[repr(u8)]
pub enum Side {
    #[default]
    Buy = 0,
    Sell = 1,
}

/// A completed fill as reported by an execution service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
pub struct Report {
    /// Pair id (e.g. `"BTCUSDT"`).
    pub symbol: String,
    /// Exchange-assigned order id.
    pub order_id: String,
    pub side: Side,
    /// Average fill price.
    pub price: f64,
    /// Filled quantity.
    pub quantity: f64,
    pub fee: f64,
    pub fee_asset: String,
    /// Fill time, milliseconds since Unix epoch.
    pub timestamp_ms: i64,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = match self.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        write!(
            f,
            "Report({} {side} {:.8}x{:.4} order={})",
            self.symbol, self.price, self.quantity, self.order_id
        )
    }
}
