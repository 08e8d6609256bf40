//! Key namespacing. Every key is scoped by exchange; symbols and candles are
//! separate hashes whose fields are symbol ids.

/// Hash of encoded [`Symbol`](mkt_core::Symbol)s for one exchange.
pub fn symbols_key(exchange: &str) -> String {
    format!("S:{exchange}")
}

/// Hash of encoded [`Candles`](mkt_core::Candles) for one exchange.
pub fn candles_key(exchange: &str) -> String {
    format!("C:{exchange}")
}

/// Plain key holding the last change time for one (symbol, exchange).
pub fn change_history_key(id: &str, exchange: &str) -> String {
    format!("CH:{id}:{exchange}")
}
