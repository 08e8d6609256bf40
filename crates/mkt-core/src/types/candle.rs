//! OHLC candle history.
//!
//! A [`Candles`] sequence is stored newest-first: index 0 is the most recent
//! candle and its close is the "current price". The cache never re-sorts, so
//! writers must supply the sequence already ordered.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// One OHLCV bar.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct Candle {
    /// Bar open time, milliseconds since Unix epoch.
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle history for one (symbol, exchange), newest first.
pub type Candles = Vec<Candle>;

/// Close of the newest candle, or `None` for an empty history.
#[inline]
pub fn latest_close(candles: &[Candle]) -> Option<f64> {
    candles.first().map(|c| c.close)
}

impl std::fmt::Display for Candle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Candle(t={} o={:.8} h={:.8} l={:.8} c={:.8} v={:.4})",
            self.open_time_ms, self.open, self.high, self.low, self.close, self.volume
        )
    }
}
