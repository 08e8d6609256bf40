//! Identifier normalization and USD conversion.
//!
//! Two conversion flavours share one [`Route`]:
//!
//! - [`PriceResolver::convert_usd`] never fails. An unresolved identifier
//!   yields `0.0` and a missing leg multiplies in as `0.0`, so "no data" and
//!   "priced at zero" look the same to the caller.
//! - [`PriceResolver::convert_usd_strict`] reports both cases as a
//!   [`ResolveError`] and only returns `Ok(0.0)` for a genuine zero.

use mkt_core::{QuoteCurrency, Symbol};
use mkt_store::MarketDataCache;
use tracing::debug;

use crate::route::{ResolveError, Route};

/// Identifiers at least this long are taken as full pair ids.
const PAIR_ID_MIN_LEN: usize = 6;

/// Stateless resolver over a [`MarketDataCache`]. Cheap to clone.
#[derive(Clone)]
pub struct PriceResolver {
    cache: MarketDataCache,
}

impl PriceResolver {
    pub fn new(cache: MarketDataCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &MarketDataCache {
        &self.cache
    }

    /// Normalize `text` into a canonical pair on `exchange`.
    ///
    /// - Six or more characters: a direct pair-id lookup, no fallback.
    /// - A quote currency code: that currency quoted in USD, built without a
    ///   lookup. The USD code itself maps to `BTC/USD`.
    /// - Anything else: the first stored pair of `text` quoted in USD, BTC,
    ///   then ETH.
    ///
    /// Returns the empty symbol when nothing matches.
    pub async fn convert_symbol(&self, text: &str, exchange: &str) -> Symbol {
        if text.len() >= PAIR_ID_MIN_LEN {
            return self.lookup(text, exchange).await.unwrap_or_default();
        }

        if let Some(quote) = QuoteCurrency::from_code(text) {
            let base = match quote {
                QuoteCurrency::Usd => QuoteCurrency::Btc,
                other => other,
            };
            return Symbol::new(base.code(), QuoteCurrency::Usd.code());
        }

        for quote in QuoteCurrency::PRIORITY {
            let id = format!("{text}{}", quote.code());
            if let Some(symbol) = self.lookup(&id, exchange).await {
                return symbol;
            }
        }

        debug!("[resolver] no pair for {text}@{exchange}");
        Symbol::default()
    }

    /// Work out which pairs price `id` in USD on `exchange`.
    pub async fn route(&self, id: &str, exchange: &str) -> Route {
        match QuoteCurrency::from_code(id) {
            Some(QuoteCurrency::Usd) => return Route::Identity,
            Some(_) => return Route::Direct(Route::usd_pair(id)),
            None => {}
        }

        let symbol = self.convert_symbol(id, exchange).await;
        if !symbol.is_resolved() {
            return Route::Unresolved;
        }

        match QuoteCurrency::from_code(&symbol.quote) {
            Some(QuoteCurrency::Usd) => Route::Direct(Route::usd_pair(&symbol.base)),
            Some(via) => Route::bridged(&symbol.base, via),
            // Assumed to be USD-denominated already.
            None => Route::Identity,
        }
    }

    /// USD value of `value` units of `id` on `exchange`.
    ///
    /// Never fails: unresolved identifiers give `0.0`, and a leg without
    /// candles prices at `0.0`.
    pub async fn convert_usd(&self, id: &str, exchange: &str, value: f64) -> f64 {
        if value == 0.0 {
            return value;
        }

        match self.route(id, exchange).await {
            Route::Identity => value,
            Route::Direct(pair) => value * self.cache.get_price(&pair, exchange).await,
            Route::Bridged { leg, bridge } => {
                value
                    * self.cache.get_price(&leg, exchange).await
                    * self.cache.get_price(&bridge, exchange).await
            }
            Route::Unresolved => 0.0,
        }
    }

    /// Like [`convert_usd`](Self::convert_usd), but reports an unresolved
    /// identifier or a leg without candles instead of returning `0.0`.
    pub async fn convert_usd_strict(&self, id: &str, exchange: &str, value: f64) -> Result<f64, ResolveError> {
        if value == 0.0 {
            return Ok(value);
        }

        let route = self.route(id, exchange).await;
        if route == Route::Unresolved {
            return Err(ResolveError::Unresolved(id.to_string()));
        }

        let mut amount = value;
        for pair in route.pairs() {
            let price = self
                .cache
                .price(pair, exchange)
                .await
                .ok_or_else(|| ResolveError::MissingPrice(pair.to_string()))?;
            amount *= price;
        }
        Ok(amount)
    }

    async fn lookup(&self, id: &str, exchange: &str) -> Option<Symbol> {
        match self.cache.get_symbol(id, exchange).await {
            Ok(symbol) if symbol.is_resolved() => Some(symbol),
            Ok(_) => None,
            Err(e) => {
                if !e.is_not_found() {
                    debug!("[resolver] lookup {id}@{exchange} failed: {e}");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mkt_core::Candle;
    use mkt_store::MemoryBackend;

    use super::*;

    const EX: &str = "binance";

    fn resolver() -> PriceResolver {
        PriceResolver::new(MarketDataCache::new(Arc::new(MemoryBackend::new())))
    }

    async fn add_symbol(r: &PriceResolver, base: &str, quote: &str) {
        r.cache().set_symbol(&Symbol::new(base, quote), EX).await.unwrap();
    }

    async fn set_close(r: &PriceResolver, id: &str, close: f64) {
        let candles = vec![
            Candle { open_time_ms: 2, close, ..Default::default() },
            Candle { open_time_ms: 1, close: close * 2.0 + 1.0, ..Default::default() },
        ];
        r.cache().set_candles(&candles, id, EX).await.unwrap();
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    // -----------------------------------------------------------------------
    // convert_symbol
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn quote_currency_resolves_without_lookup() {
        let r = resolver();
        for ex in [EX, "okx", ""] {
            assert_eq!(r.convert_symbol("BTC", ex).await, Symbol::new("BTC", "USDT"));
            assert_eq!(r.convert_symbol("ETH", ex).await, Symbol::new("ETH", "USDT"));
        }
    }

    #[tokio::test]
    async fn usd_code_maps_to_btc() {
        let r = resolver();
        let symbol = r.convert_symbol("USDT", EX).await;
        assert_eq!(symbol.id, "BTCUSDT");
        assert_eq!(symbol.base, "BTC");
        assert_eq!(symbol.quote, "USDT");
    }

    #[tokio::test]
    async fn third_priority_hit_wins_when_first_two_absent() {
        let r = resolver();
        add_symbol(&r, "DOGE", "ETH").await;
        assert_eq!(r.convert_symbol("DOGE", EX).await, Symbol::new("DOGE", "ETH"));
    }

    #[tokio::test]
    async fn priority_order_is_usd_btc_eth() {
        let r = resolver();
        add_symbol(&r, "DOGE", "ETH").await;
        add_symbol(&r, "DOGE", "BTC").await;
        assert_eq!(r.convert_symbol("DOGE", EX).await.id, "DOGEBTC");

        add_symbol(&r, "DOGE", "USDT").await;
        assert_eq!(r.convert_symbol("DOGE", EX).await.id, "DOGEUSDT");
    }

    #[tokio::test]
    async fn long_text_is_a_direct_lookup() {
        let r = resolver();
        add_symbol(&r, "ETH", "BTC").await;
        assert_eq!(r.convert_symbol("ETHBTC", EX).await, Symbol::new("ETH", "BTC"));
        assert_eq!(r.convert_symbol("ETHBTC", "okx").await, Symbol::default());
    }

    #[tokio::test]
    async fn long_text_has_no_fallback() {
        let r = resolver();
        add_symbol(&r, "anything-with-6-or-more-chars", "USDT").await;
        let symbol = r.convert_symbol("anything-with-6-or-more-chars", EX).await;
        assert_eq!(symbol, Symbol::default());
        assert!(!symbol.is_resolved());
    }

    #[tokio::test]
    async fn unknown_short_text_is_unresolved() {
        let r = resolver();
        assert_eq!(r.convert_symbol("XYZ", EX).await, Symbol::default());
        assert_eq!(r.convert_symbol("", EX).await, Symbol::default());
    }

    #[tokio::test]
    async fn lookups_match_case_exactly() {
        let r = resolver();
        add_symbol(&r, "DOGE", "USDT").await;
        assert!(!r.convert_symbol("doge", EX).await.is_resolved());
        assert_eq!(r.convert_symbol("usdt", EX).await, Symbol::default());
    }

    // -----------------------------------------------------------------------
    // route
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn routes() {
        let r = resolver();
        add_symbol(&r, "SOL", "USDT").await;
        add_symbol(&r, "LINK", "BTC").await;
        add_symbol(&r, "ABC", "EUR").await;

        assert_eq!(r.route("USDT", EX).await, Route::Identity);
        assert_eq!(r.route("BTC", EX).await, Route::Direct("BTCUSDT".into()));
        assert_eq!(r.route("ETH", EX).await, Route::Direct("ETHUSDT".into()));
        assert_eq!(r.route("SOL", EX).await, Route::Direct("SOLUSDT".into()));
        assert_eq!(r.route("LINK", EX).await, Route::bridged("LINK", QuoteCurrency::Btc));
        assert_eq!(r.route("ABCEUR", EX).await, Route::Identity);
        assert_eq!(r.route("NOPE", EX).await, Route::Unresolved);
    }

    // -----------------------------------------------------------------------
    // convert_usd
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn zero_value_short_circuits() {
        let r = resolver();
        set_close(&r, "BTCUSDT", 20_000.0).await;
        for id in ["BTC", "ETH", "USDT", "NOPE", "anything-with-6-or-more-chars"] {
            assert_eq!(r.convert_usd(id, EX, 0.0).await, 0.0);
            assert_eq!(r.convert_usd(id, "okx", 0.0).await, 0.0);
            assert_eq!(r.convert_usd_strict(id, EX, 0.0).await, Ok(0.0));
        }
    }

    #[tokio::test]
    async fn usd_is_identity() {
        let r = resolver();
        assert_close(r.convert_usd("USDT", EX, 12.5).await, 12.5);
    }

    #[tokio::test]
    async fn btc_single_hop() {
        let r = resolver();
        set_close(&r, "BTCUSDT", 20_000.0).await;
        assert_close(r.convert_usd("BTC", EX, 2.0).await, 40_000.0);
    }

    #[tokio::test]
    async fn eth_single_hop_needs_no_symbol() {
        let r = resolver();
        set_close(&r, "ETHUSDT", 1_500.0).await;
        assert_close(r.convert_usd("ETH", EX, 3.0).await, 4_500.0);
    }

    #[tokio::test]
    async fn usd_quoted_single_hop() {
        let r = resolver();
        add_symbol(&r, "SOL", "USDT").await;
        set_close(&r, "SOLUSDT", 150.0).await;
        assert_close(r.convert_usd("SOL", EX, 2.0).await, 300.0);
        assert_close(r.convert_usd("SOLUSDT", EX, 2.0).await, 300.0);
    }

    #[tokio::test]
    async fn btc_quoted_two_hop() {
        let r = resolver();
        add_symbol(&r, "LINK", "BTC").await;
        set_close(&r, "LINKBTC", 0.05).await;
        set_close(&r, "BTCUSDT", 20_000.0).await;
        assert_close(r.convert_usd("LINK", EX, 10.0).await, 10_000.0);
    }

    #[tokio::test]
    async fn eth_quoted_two_hop() {
        let r = resolver();
        add_symbol(&r, "DOGE", "ETH").await;
        set_close(&r, "DOGEETH", 0.0001).await;
        set_close(&r, "ETHUSDT", 2_000.0).await;
        assert_close(r.convert_usd("DOGE", EX, 1_000.0).await, 200.0);
    }

    #[tokio::test]
    async fn unknown_quote_passes_through() {
        let r = resolver();
        add_symbol(&r, "ABC", "EUR").await;
        assert_close(r.convert_usd("ABCEUR", EX, 7.0).await, 7.0);
        assert_eq!(r.convert_usd_strict("ABCEUR", EX, 7.0).await, Ok(7.0));
    }

    #[tokio::test]
    async fn unresolved_is_zero() {
        let r = resolver();
        assert_eq!(r.convert_usd("NOPE", EX, 5.0).await, 0.0);
    }

    #[tokio::test]
    async fn missing_leg_and_zero_price_are_indistinguishable() {
        let missing = resolver();
        add_symbol(&missing, "LINK", "BTC").await;
        set_close(&missing, "LINKBTC", 0.05).await;

        let zero = resolver();
        add_symbol(&zero, "LINK", "BTC").await;
        set_close(&zero, "LINKBTC", 0.05).await;
        set_close(&zero, "BTCUSDT", 0.0).await;

        let a = missing.convert_usd("LINK", EX, 10.0).await;
        let b = zero.convert_usd("LINK", EX, 10.0).await;
        assert_eq!(a, 0.0);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn prices_are_per_exchange() {
        let r = resolver();
        set_close(&r, "BTCUSDT", 20_000.0).await;
        assert_eq!(r.convert_usd("BTC", "okx", 1.0).await, 0.0);
    }

    // -----------------------------------------------------------------------
    // convert_usd_strict
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn strict_matches_lenient_when_data_present() {
        let r = resolver();
        add_symbol(&r, "LINK", "BTC").await;
        set_close(&r, "LINKBTC", 0.05).await;
        set_close(&r, "BTCUSDT", 20_000.0).await;

        let strict = r.convert_usd_strict("LINK", EX, 10.0).await.unwrap();
        assert_close(strict, r.convert_usd("LINK", EX, 10.0).await);
        assert_eq!(r.convert_usd_strict("USDT", EX, 4.0).await, Ok(4.0));
    }

    #[tokio::test]
    async fn strict_reports_missing_leg() {
        let r = resolver();
        add_symbol(&r, "LINK", "BTC").await;
        set_close(&r, "LINKBTC", 0.05).await;
        assert_eq!(
            r.convert_usd_strict("LINK", EX, 10.0).await,
            Err(ResolveError::MissingPrice("BTCUSDT".into()))
        );
    }

    #[tokio::test]
    async fn strict_reports_unresolved() {
        let r = resolver();
        assert_eq!(
            r.convert_usd_strict("NOPE", EX, 1.0).await,
            Err(ResolveError::Unresolved("NOPE".into()))
        );
    }

    #[tokio::test]
    async fn strict_keeps_genuine_zero() {
        let r = resolver();
        set_close(&r, "BTCUSDT", 0.0).await;
        assert_eq!(r.convert_usd_strict("BTC", EX, 3.0).await, Ok(0.0));
    }

    #[tokio::test]
    async fn empty_candle_history_is_missing() {
        let r = resolver();
        r.cache().set_candles(&Vec::new(), "BTCUSDT", EX).await.unwrap();
        assert_eq!(r.convert_usd("BTC", EX, 1.0).await, 0.0);
        assert_eq!(
            r.convert_usd_strict("BTC", EX, 1.0).await,
            Err(ResolveError::MissingPrice("BTCUSDT".into()))
        );
    }
}
