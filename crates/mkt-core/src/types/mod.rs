//! Core data types: symbols, candles, quote currencies, and relay events.
//!
//! Every record that is persisted or published derives `rkyv::Archive` so it
//! can go through [`Codec`](crate::codec::Codec) unchanged.

pub mod candle;
pub mod currency;
pub mod events;
pub mod symbol;
pub mod trading;

pub use candle::*;
pub use currency::*;
pub use events::*;
pub use symbol::*;
pub use trading::*;
