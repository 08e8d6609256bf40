//! Cross-instance event relay.
//!
//! Producers publish encoded events on one channel per [`EventKind`]. A relay
//! loop subscribes to all three channels, decodes each message by its channel
//! and hands it to the matching local [`EventQueue`].
//!
//! # Delivery
//!
//! At-most-once: no acknowledgement, no replay, no dead-letter path. A payload
//! that fails to decode is dropped and counted. Within one loop events reach
//! their queue in transport order; there is no ordering across kinds.
//!
//! # Lifecycle
//!
//! ```text
//! subscribe ──► receive ──► decode ──► EventQueue::push
//!     ▲            │ transient error: backoff + jitter, retry receive
//!     │            │ Closed: return Err (fatal)
//!     └─ transient subscribe error: backoff + jitter
//! shutdown signal (watch) ends the loop at any await point
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Receiver;
use mkt_core::backoff::Backoff;
use mkt_core::config::BusConfig;
use mkt_core::{Codec, EventKind, KeyEvent, MarketEvent, MktError, TradingEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::queue::{EventQueue, shutdown_signalled};
use crate::{Backend, Message};

/// Snapshot of relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Events handed to a local queue.
    pub delivered: u64,
    /// Messages dropped because they did not decode.
    pub decode_failures: u64,
    /// Events evicted from full `DropOldest` queues.
    pub dropped: u64,
    /// Transient subscribe/receive failures retried.
    pub retries: u64,
    /// Successful subscriptions opened.
    pub subscriptions: u64,
}

impl std::fmt::Display for RelayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "delivered={} decode_failures={} dropped={} retries={} subscriptions={}",
            self.delivered, self.decode_failures, self.dropped, self.retries, self.subscriptions
        )
    }
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    decode_failures: AtomicU64,
    retries: AtomicU64,
    subscriptions: AtomicU64,
}

struct BusInner {
    backend: Arc<dyn Backend>,
    config: BusConfig,
    market: EventQueue<MarketEvent>,
    trading: EventQueue<TradingEvent>,
    keys: EventQueue<KeyEvent>,
    counters: Counters,
}

/// Publish side and local delivery queues of the relay. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(backend: Arc<dyn Backend>, config: BusConfig) -> Result<Self, MktError> {
        config.validate()?;
        let cap = config.queue_capacity;
        let policy = config.overflow;
        Ok(Self {
            inner: Arc::new(BusInner {
                backend,
                market: EventQueue::new("market", cap, policy),
                trading: EventQueue::new("trading", cap, policy),
                keys: EventQueue::new("key", cap, policy),
                config,
                counters: Counters::default(),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Publish
    // -----------------------------------------------------------------------

    /// Announce that a symbol's cached data changed.
    pub async fn announce_event(&self, event: &MarketEvent) -> Result<(), MktError> {
        self.announce(EventKind::Market, event).await
    }

    /// Broadcast a completed trade report.
    pub async fn announce_report(&self, event: &TradingEvent) -> Result<(), MktError> {
        self.announce(EventKind::Trading, event).await
    }

    /// Broadcast a credential update.
    pub async fn announce_keys(&self, event: &KeyEvent) -> Result<(), MktError> {
        self.announce(EventKind::Key, event).await
    }

    async fn announce<T: Codec>(&self, kind: EventKind, event: &T) -> Result<(), MktError> {
        let payload = event.encode()?;
        let channel = self.inner.config.channel(kind);
        let receivers = self
            .inner
            .backend
            .publish(channel, payload)
            .await
            .map_err(|e| match e {
                MktError::Store(msg) => MktError::Publish(msg),
                other => other,
            })?;
        debug!("[bus] published {kind} event on {channel} ({receivers} receiver(s))");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Local queues
    // -----------------------------------------------------------------------

    pub fn market_chan(&self) -> Receiver<MarketEvent> {
        self.inner.market.receiver()
    }

    pub fn trading_chan(&self) -> Receiver<TradingEvent> {
        self.inner.trading.receiver()
    }

    pub fn key_chan(&self) -> Receiver<KeyEvent> {
        self.inner.keys.receiver()
    }

    pub fn stats(&self) -> RelayStats {
        let c = &self.inner.counters;
        RelayStats {
            delivered: c.delivered.load(Ordering::Relaxed),
            decode_failures: c.decode_failures.load(Ordering::Relaxed),
            dropped: self.inner.market.dropped() + self.inner.trading.dropped() + self.inner.keys.dropped(),
            retries: c.retries.load(Ordering::Relaxed),
            subscriptions: c.subscriptions.load(Ordering::Relaxed),
        }
    }

    // -----------------------------------------------------------------------
    // Receive loop
    // -----------------------------------------------------------------------

    /// Run the relay until shutdown or an irrecoverable connection loss.
    ///
    /// Returns `Ok(())` once `shutdown` flips to `true` or its sender is
    /// dropped, and `Err(MktError::Closed)` if the transport closes for good.
    /// Transient failures are retried with exponential backoff and jitter.
    pub async fn subscribe_events(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), MktError> {
        let config = &self.inner.config;
        let channels: Vec<String> = [EventKind::Market, EventKind::Trading, EventKind::Key]
            .into_iter()
            .map(|k| config.channel(k).to_string())
            .collect();
        let mut backoff = Backoff::from_config(&config.backoff);

        info!("[relay] starting on channels {channels:?}");

        loop {
            if *shutdown.borrow() {
                info!("[relay] shutdown requested");
                return Ok(());
            }

            let mut sub = match self.inner.backend.subscribe(&channels).await {
                Ok(sub) => {
                    self.inner.counters.subscriptions.fetch_add(1, Ordering::Relaxed);
                    info!("[relay] subscribed");
                    sub
                }
                Err(e) if e.is_fatal() => {
                    error!("[relay] subscribe failed, connection closed: {e}");
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    self.inner.counters.retries.fetch_add(1, Ordering::Relaxed);
                    warn!("[relay] subscribe failed: {e}, retrying in {delay:?}");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {},
                        _ = shutdown_signalled(&mut shutdown) => return Ok(()),
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = shutdown_signalled(&mut shutdown) => {
                        info!("[relay] shutdown signal received ({})", self.stats());
                        return Ok(());
                    }

                    msg = sub.next_message() => match msg {
                        Ok(msg) => {
                            backoff.reset();
                            if !self.dispatch(msg, &mut shutdown).await {
                                info!("[relay] shutdown during handoff ({})", self.stats());
                                return Ok(());
                            }
                        }
                        Err(e) if e.is_fatal() => {
                            error!("[relay] connection closed: {e} ({})", self.stats());
                            return Err(e);
                        }
                        Err(e) => {
                            let delay = backoff.next_delay();
                            self.inner.counters.retries.fetch_add(1, Ordering::Relaxed);
                            warn!("[relay] receive error: {e}, retrying in {delay:?}");
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {},
                                _ = shutdown_signalled(&mut shutdown) => return Ok(()),
                            }
                        }
                    },
                }
            }
        }
    }

    /// Start [`subscribe_events`](Self::subscribe_events) on a tokio task.
    pub fn spawn(&self) -> RelayHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let bus = self.clone();
        let task = tokio::spawn(async move { bus.subscribe_events(shutdown_rx).await });
        RelayHandle {
            bus: self.clone(),
            shutdown_tx,
            task,
        }
    }

    /// Route one message to its queue. Returns `false` on shutdown.
    async fn dispatch(&self, msg: Message, shutdown: &mut watch::Receiver<bool>) -> bool {
        let Some(kind) = self.inner.config.kind_of(&msg.channel) else {
            debug!("[relay] ignoring message on unknown channel {}", msg.channel);
            return true;
        };

        match kind {
            EventKind::Market => {
                self.deliver(&self.inner.market, MarketEvent::decode(&msg.payload), kind, shutdown)
                    .await
            }
            EventKind::Trading => {
                self.deliver(&self.inner.trading, TradingEvent::decode(&msg.payload), kind, shutdown)
                    .await
            }
            EventKind::Key => {
                self.deliver(&self.inner.keys, KeyEvent::decode(&msg.payload), kind, shutdown)
                    .await
            }
        }
    }

    async fn deliver<T: Send>(
        &self,
        queue: &EventQueue<T>,
        decoded: Result<T, MktError>,
        kind: EventKind,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        match decoded {
            Ok(event) => {
                let pushed = queue.push(event, shutdown).await;
                if pushed {
                    self.inner.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                pushed
            }
            Err(e) => {
                self.inner.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!("[relay] dropping undecodable {kind} event: {e}");
                true
            }
        }
    }
}

/// A relay loop running on a tokio task.
///
/// Dropping the handle also stops the loop, since it drops the shutdown sender.
pub struct RelayHandle {
    bus: EventBus,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<Result<(), MktError>>,
}

impl RelayHandle {
    pub fn stats(&self) -> RelayStats {
        self.bus.stats()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) -> Result<(), MktError> {
        let _ = self.shutdown_tx.send(true);
        Self::await_task(self.task).await
    }

    /// Wait for the loop to exit on its own (i.e. a fatal transport error).
    pub async fn join(self) -> Result<(), MktError> {
        let RelayHandle { task, shutdown_tx, .. } = self;
        let result = Self::await_task(task).await;
        drop(shutdown_tx);
        result
    }

    async fn await_task(task: tokio::task::JoinHandle<Result<(), MktError>>) -> Result<(), MktError> {
        task.await
            .map_err(|e| MktError::Store(format!("relay task failed: {e}")))?
    }
}
