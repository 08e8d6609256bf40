//! Configuration parsing for the market cache and event relay.
//!
//! Settings come from a single JSON file. Every field has a default, so an
//! empty object is a valid config.
//!
//! # Example config
//!
//! ```json
//! {
//!   "logging": { "level": "debug", "dir": "/tmp/log", "module_name": "mkt-relay" },
//!   "bus": {
//!     "market_channel": "market-events",
//!     "trading_channel": "trading-events",
//!     "key_channel": "key-store-events",
//!     "queue_capacity": 64,
//!     "overflow": "drop_oldest",
//!     "backoff": { "initial_ms": 100, "max_ms": 30000, "jitter": 0.2 }
//!   }
//! }
//! ```

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::error::MktError;
use crate::types::EventKind;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub bus: BusConfig,
}

impl AppConfig {
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.bus.validate()?;
        Ok(config)
    }
}

/// Logging block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level if `RUST_LOG` is not set.
    pub level: String,
    /// Optional directory for daily-rotating log files.
    pub dir: Option<String>,
    /// Log file prefix.
    pub module_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            dir: None,
            module_name: "mkt".into(),
        }
    }
}

/// What a full local event queue does with a new event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Hold the receive loop until a consumer makes room.
    #[default]
    Block,
    /// Evict the oldest queued event to make room.
    DropOldest,
}

/// Retry delay settings for the relay receive loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    /// Multiplicative jitter fraction in `[0, 1]`.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 100,
            max_ms: 30_000,
            jitter: 0.2,
        }
    }
}

impl BackoffConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Event relay block. Channel names are shared by every producer and consumer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub market_channel: String,
    pub trading_channel: String,
    pub key_channel: String,
    /// Capacity of each local per-kind queue.
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    pub backoff: BackoffConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            market_channel: "market-events".into(),
            trading_channel: "trading-events".into(),
            key_channel: "key-store-events".into(),
            queue_capacity: 64,
            overflow: OverflowPolicy::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl BusConfig {
    /// Channel name carrying the given event kind.
    pub fn channel(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::Market => &self.market_channel,
            EventKind::Trading => &self.trading_channel,
            EventKind::Key => &self.key_channel,
        }
    }

    /// Reverse of [`channel`](Self::channel); `None` for foreign channels.
    pub fn kind_of(&self, channel: &str) -> Option<EventKind> {
        [EventKind::Market, EventKind::Trading, EventKind::Key]
            .into_iter()
            .find(|k| self.channel(*k) == channel)
    }

    pub fn validate(&self) -> Result<(), MktError> {
        if self.queue_capacity == 0 {
            return Err(MktError::Config("queue_capacity must be > 0".into()));
        }
        let names = [&self.market_channel, &self.trading_channel, &self.key_channel];
        if names.iter().any(|n| n.is_empty()) {
            return Err(MktError::Config("channel names must not be empty".into()));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(MktError::Config("channel names must be distinct".into()));
        }
        if self.backoff.initial_ms > self.backoff.max_ms {
            return Err(MktError::Config(format!(
                "backoff initial_ms ({}) exceeds max_ms ({})",
                self.backoff.initial_ms, self.backoff.max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(MktError::Config(format!("backoff jitter {} outside [0, 1]", self.backoff.jitter)));
        }
        Ok(())
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = AppConfig::from_json(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(
        "[config] loaded {} (channels: {}, {}, {}; queue_capacity={}, overflow={:?})",
        path.display(),
        config.bus.market_channel,
        config.bus.trading_channel,
        config.bus.key_channel,
        config.bus.queue_capacity,
        config.bus.overflow,
    );
    Ok(config)
}
