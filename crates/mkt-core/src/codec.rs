//! The single binary format for every persisted and published record.
//!
//! Records are serialized with `rkyv`. Decoding copies the payload into an
//! aligned buffer and runs validated deserialization, so a corrupt or foreign
//! payload surfaces as [`MktError::Decode`] instead of undefined behaviour.
//!
//! There is no schema evolution: adding or removing a field changes the wire
//! layout, and old payloads stop decoding.

use crate::error::MktError;
use crate::types::{Candles, KeyEvent, MarketEvent, Symbol, TradingEvent};

/// Symmetric encode/decode for a stored or published record.
pub trait Codec: Sized {
    fn encode(&self) -> Result<Vec<u8>, MktError>;
    fn decode(bytes: &[u8]) -> Result<Self, MktError>;
}

/// Implement [`Codec`] for concrete rkyv-archivable types.
macro_rules! impl_codec {
    ($($T:ty => $name:literal),* $(,)?) => {
        $(
            impl Codec for $T {
                fn encode(&self) -> Result<Vec<u8>, MktError> {
                    rkyv::to_bytes::<rkyv::rancor::Error>(self)
                        .map(|bytes| bytes.to_vec())
                        .map_err(|e| MktError::Encode(format!("{}: {e}", $name)))
                }

                fn decode(bytes: &[u8]) -> Result<Self, MktError> {
                    let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
                    aligned.extend_from_slice(bytes);
                    rkyv::from_bytes::<$T, rkyv::rancor::Error>(&aligned)
                        .map_err(|e| MktError::Decode(format!("{}: {e}", $name)))
                }
            }
        )*
    };
}

impl_codec! {
    Symbol => "symbol",
    Candles => "candles",
    MarketEvent => "market event",
    TradingEvent => "trading event",
    KeyEvent => "key event",
}
