//! Per-exchange market metadata cache.
//!
//! Symbols and candle histories are stored as hash fields keyed by symbol id
//! under exchange-scoped keys (see [`keys`](crate::keys)); change-history
//! timestamps are plain no-expiry keys holding RFC3339 strings. Every value
//! returned is an owned copy decoded from the store.
//!
//! Errors are returned to the caller with two deliberate exceptions:
//! [`get_symbols`](MarketDataCache::get_symbols) skips records that fail to
//! decode, and [`get_price`](MarketDataCache::get_price) maps every failure,
//! including "no candles", to `0.0`. Use [`price`](MarketDataCache::price)
//! to tell absence apart from a real zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mkt_core::time_util::{now_rfc3339, parse_rfc3339};
use mkt_core::{Candles, Codec, MktError, Symbol, latest_close};
use tracing::{debug, warn};

use crate::Backend;
use crate::keys::{candles_key, change_history_key, symbols_key};

/// Result of listing all symbols on an exchange.
///
/// Corrupt records are skipped rather than failing the whole listing, so
/// `symbols` may be incomplete; `skipped` and `last_error` say by how much
/// and why.
#[derive(Debug, Clone, Default)]
pub struct SymbolListing {
    pub symbols: Vec<Symbol>,
    pub skipped: usize,
    pub last_error: Option<MktError>,
}

impl SymbolListing {
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// Market metadata cache over an injected [`Backend`].
///
/// Cheap to clone. No client-side locking: batch atomicity is the backend's
/// [`hset_many`](Backend::hset_many).
#[derive(Clone)]
pub struct MarketDataCache {
    backend: Arc<dyn Backend>,
}

impl MarketDataCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    // -----------------------------------------------------------------------
    // Symbols
    // -----------------------------------------------------------------------

    /// Upsert one symbol, keyed by its id.
    pub async fn set_symbol(&self, symbol: &Symbol, exchange: &str) -> Result<(), MktError> {
        let bytes = symbol.encode()?;
        self.backend.hset(&symbols_key(exchange), &symbol.id, bytes).await
    }

    /// Upsert a batch as one atomic unit.
    ///
    /// Every record is encoded before anything is written, so an encode
    /// failure writes nothing either.
    pub async fn set_symbols(&self, symbols: &[Symbol], exchange: &str) -> Result<(), MktError> {
        if symbols.is_empty() {
            return Ok(());
        }
        let entries = symbols
            .iter()
            .map(|s| Ok((s.id.clone(), s.encode()?)))
            .collect::<Result<Vec<_>, MktError>>()?;
        debug!("[cache] writing {} symbol(s) to {exchange}", entries.len());
        self.backend.hset_many(&symbols_key(exchange), entries).await
    }

    pub async fn get_symbol(&self, id: &str, exchange: &str) -> Result<Symbol, MktError> {
        let key = symbols_key(exchange);
        match self.backend.hget(&key, id).await? {
            Some(bytes) => Symbol::decode(&bytes),
            None => Err(MktError::not_found(key, id)),
        }
    }

    /// All symbols on `exchange`, in no particular order.
    ///
    /// A transport failure fails the call; a record that does not decode is
    /// logged, counted and skipped.
    pub async fn get_symbols(&self, exchange: &str) -> Result<SymbolListing, MktError> {
        let values = self.backend.hvals(&symbols_key(exchange)).await?;
        let mut listing = SymbolListing {
            symbols: Vec::with_capacity(values.len()),
            ..Default::default()
        };

        for bytes in values {
            match Symbol::decode(&bytes) {
                Ok(symbol) => listing.symbols.push(symbol),
                Err(e) => {
                    warn!("[cache] skipping undecodable symbol on {exchange}: {e}");
                    listing.skipped += 1;
                    listing.last_error = Some(e);
                }
            }
        }

        Ok(listing)
    }

    // -----------------------------------------------------------------------
    // Candles
    // -----------------------------------------------------------------------

    /// Replace the candle history of `id`. Must already be newest-first.
    pub async fn set_candles(&self, candles: &Candles, id: &str, exchange: &str) -> Result<(), MktError> {
        let bytes = candles.encode()?;
        self.backend.hset(&candles_key(exchange), id, bytes).await
    }

    pub async fn get_candles(&self, id: &str, exchange: &str) -> Result<Candles, MktError> {
        let key = candles_key(exchange);
        match self.backend.hget(&key, id).await? {
            Some(bytes) => Candles::decode(&bytes),
            None => Err(MktError::not_found(key, id)),
        }
    }

    /// Close of the newest candle, or `None` when there is no usable history.
    pub async fn price(&self, id: &str, exchange: &str) -> Option<f64> {
        match self.get_candles(id, exchange).await {
            Ok(candles) => latest_close(&candles),
            Err(e) => {
                if !e.is_not_found() {
                    debug!("[cache] no price for {id}@{exchange}: {e}");
                }
                None
            }
        }
    }

    /// Close of the newest candle, `0.0` when there is none.
    ///
    /// A missing history and a genuine zero close are indistinguishable here.
    pub async fn get_price(&self, id: &str, exchange: &str) -> f64 {
        self.price(id, exchange).await.unwrap_or(0.0)
    }

    // -----------------------------------------------------------------------
    // Change history
    // -----------------------------------------------------------------------

    /// Record "now" as the last change time of `id` on `exchange`. No expiry.
    pub async fn set_change_history(&self, id: &str, exchange: &str) -> Result<(), MktError> {
        self.backend.set(&change_history_key(id, exchange), now_rfc3339()).await
    }

    pub async fn get_change_history(&self, id: &str, exchange: &str) -> Result<DateTime<Utc>, MktError> {
        let key = change_history_key(id, exchange);
        match self.backend.get(&key).await? {
            Some(raw) => parse_rfc3339(&raw),
            None => Err(MktError::not_found(key, "")),
        }
    }
}
