//! # mkt-core
//!
//! Core crate for the market metadata cache, providing:
//!
//! - **Types** (`types`) — symbols, candles, quote currencies, relay events
//! - **Codec** (`codec`) — the single rkyv binary format for stored and published records
//! - **Error types** (`error`) — domain-specific `MktError` via thiserror
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Backoff** (`backoff`) — exponential retry delays with jitter
//! - **Time utilities** (`time_util`) — epoch millis and RFC3339 helpers
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod backoff;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;

pub use codec::Codec;
pub use error::MktError;
// Re-export types at crate root for convenience.
pub use types::*;
