//! Bounded local event queues.
//!
//! Each event kind gets its own [`EventQueue`] so a slow consumer of one kind
//! only stalls that kind's handoff. What happens when a queue is full is an
//! explicit [`OverflowPolicy`]:
//!
//! - `Block` — the producer waits until a consumer makes room or shutdown is
//!   signalled; nothing is lost. Consumers take events straight off the
//!   crossbeam receiver, which has no wake-up hook, so the producer re-polls
//!   with a growing sleep capped at [`BLOCK_POLL_MAX`]. A freed slot is taken
//!   at most that long after it frees.
//! - `DropOldest` — the oldest queued event is evicted and counted.
//!
//! Consumers read through cloned `crossbeam_channel::Receiver`s and may block
//! on `recv()` from their own threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use mkt_core::config::OverflowPolicy;
use tokio::sync::watch;
use tracing::warn;

const BLOCK_POLL_MIN: Duration = Duration::from_millis(1);
/// Upper bound on how long a blocked producer takes to notice a freed slot.
pub const BLOCK_POLL_MAX: Duration = Duration::from_millis(10);

/// Resolves once `shutdown` reads `true` or its sender is dropped. Other
/// values sent on the channel are ignored.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

pub struct EventQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    policy: OverflowPolicy,
    dropped: AtomicU64,
    label: &'static str,
}

impl<T: Send> EventQueue<T> {
    pub fn new(label: &'static str, capacity: usize, policy: OverflowPolicy) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            tx,
            rx,
            policy,
            dropped: AtomicU64::new(0),
            label,
        }
    }

    /// A consumer handle. Every clone competes for the same events.
    pub fn receiver(&self) -> Receiver<T> {
        self.rx.clone()
    }

    /// Enqueue without waiting.
    ///
    /// Under `Block` a full queue hands the event back as `Err`; under
    /// `DropOldest` room is always made and the call succeeds.
    pub fn offer(&self, item: T) -> Result<(), T> {
        let mut item = item;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => match self.policy {
                    OverflowPolicy::Block => return Err(back),
                    OverflowPolicy::DropOldest => {
                        if self.rx.try_recv().is_ok() {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                            warn!("[queue:{}] full, dropped oldest event", self.label);
                        }
                        item = back;
                    }
                },
                // We hold a receiver, so the channel cannot disconnect.
                Err(TrySendError::Disconnected(back)) => return Err(back),
            }
        }
    }

    /// Enqueue according to the overflow policy.
    ///
    /// Returns `false` if shutdown was signalled while waiting for room; the
    /// event is then discarded.
    pub async fn push(&self, item: T, shutdown: &mut watch::Receiver<bool>) -> bool {
        let mut item = item;
        let mut wait = BLOCK_POLL_MIN;
        loop {
            match self.offer(item) {
                Ok(()) => return true,
                Err(back) => item = back,
            }
            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = shutdown_signalled(shutdown) => return false,
            }
            wait = (wait * 2).min(BLOCK_POLL_MAX);
        }
    }

    /// Events evicted under `DropOldest`.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}
