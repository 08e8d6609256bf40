//! Typed error definitions for the market cache and event relay.
//!
//! [`MktError`] mirrors the failure taxonomy callers branch on: a missing
//! record, a malformed payload, and transport failures. Only [`MktError::Closed`]
//! is fatal; every other transport error is treated as transient by retry
//! loops.

use thiserror::Error;

/// Domain-specific errors for the cache, codec, and relay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MktError {
    /// No record stored under `key` / `field`.
    #[error("not found: {key}/{field}")]
    NotFound { key: String, field: String },

    /// A record could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// A payload was present but malformed.
    #[error("decode error: {0}")]
    Decode(String),

    /// Transport-level failure on a read or write.
    #[error("store error: {0}")]
    Store(String),

    /// Transport-level failure while publishing.
    #[error("publish error: {0}")]
    Publish(String),

    /// A stored scalar (e.g. a timestamp) did not parse.
    #[error("parse error: {0}")]
    Parse(String),

    /// The underlying connection is irrecoverably closed.
    #[error("connection closed: {0}")]
    Closed(String),

    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),
}

impl MktError {
    pub fn not_found(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.into(),
            field: field.into(),
        }
    }

    /// Returns `true` when retrying cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
