//! # mkt-store
//!
//! Market metadata cache and cross-instance event relay.
//!
//! ## Architecture
//!
//! Business logic is written once against the [`Backend`] capability set
//! (hash get/set, key/value, publish, subscribe). The concrete transport is
//! injected at composition time:
//!
//! ```text
//! ingesters ──► MarketDataCache ──► Backend (hash maps, no-expiry keys)
//!           ──► EventBus.announce_* ──► Backend.publish
//! Backend.subscribe ──► EventBus relay loop ──► EventQueue per kind ──► consumers
//! ```
//!
//! - [`cache`] — symbols, candles, change history
//! - [`bus`] — announce + supervised receive loop
//! - [`queue`] — bounded local queues with an explicit overflow policy
//! - [`memory`] — in-process [`Backend`] implementation
//! - [`keys`] — key namespacing

pub mod bus;
pub mod cache;
pub mod keys;
pub mod memory;
pub mod queue;

use async_trait::async_trait;
use mkt_core::MktError;

pub use bus::{EventBus, RelayHandle, RelayStats};
pub use cache::{MarketDataCache, SymbolListing};
pub use memory::MemoryBackend;
pub use queue::EventQueue;

/// A message received from a pub/sub channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// Storage and messaging primitives the cache and relay are built on.
///
/// Implementations must be safe to call concurrently from any number of
/// tasks. Transient failures are reported as [`MktError::Store`] /
/// [`MktError::Publish`]; [`MktError::Closed`] means the connection is gone
/// for good.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Set one field of the hash at `key`.
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<(), MktError>;

    /// Set several fields of the hash at `key` as one atomic unit: either all
    /// fields are written or none are.
    async fn hset_many(&self, key: &str, entries: Vec<(String, Vec<u8>)>) -> Result<(), MktError>;

    /// Get one field of the hash at `key`; `None` if key or field is absent.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, MktError>;

    /// All values of the hash at `key`, in no particular order.
    async fn hvals(&self, key: &str) -> Result<Vec<Vec<u8>>, MktError>;

    /// Set a plain string key with no expiry.
    async fn set(&self, key: &str, value: String) -> Result<(), MktError>;

    /// Get a plain string key.
    async fn get(&self, key: &str) -> Result<Option<String>, MktError>;

    /// Publish to a channel. Returns the number of subscribers reached, as
    /// reported by the transport; zero subscribers is not an error.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize, MktError>;

    /// Open a subscription to the given channels.
    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn Subscription>, MktError>;
}

/// An open pub/sub subscription.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next message on any subscribed channel.
    async fn next_message(&mut self) -> Result<Message, MktError>;
}
