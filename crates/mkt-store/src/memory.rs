//! In-process [`Backend`] implementation.
//!
//! Hashes and plain keys live in `AHashMap`s behind a lock; pub/sub is a
//! single `tokio::sync::broadcast` hub whose subscribers filter by channel.
//! Intended for single-process deployments and tests. [`MemoryBackend::close`]
//! simulates an irrecoverable connection loss, and a subscriber that falls
//! more than `pubsub_capacity` messages behind gets a transient error, as a
//! dropped network subscriber would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use mkt_core::MktError;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{Backend, Message, Subscription};

const DEFAULT_PUBSUB_CAPACITY: usize = 1024;

type HashTable = AHashMap<String, AHashMap<String, Vec<u8>>>;

struct Inner {
    hashes: RwLock<HashTable>,
    strings: RwLock<AHashMap<String, String>>,
    hub: RwLock<Option<broadcast::Sender<Message>>>,
    /// Open subscriptions per channel.
    listeners: RwLock<AHashMap<String, usize>>,
    fail_writes: AtomicBool,
}

/// Cloneable handle to one shared in-memory store.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_pubsub_capacity(DEFAULT_PUBSUB_CAPACITY)
    }

    /// `capacity` bounds how far a subscriber may lag before it loses messages.
    pub fn with_pubsub_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                hashes: RwLock::new(AHashMap::new()),
                strings: RwLock::new(AHashMap::new()),
                hub: RwLock::new(Some(tx)),
                listeners: RwLock::new(AHashMap::new()),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Drop the pub/sub hub. Open subscriptions drain what is buffered and then
    /// report [`MktError::Closed`]; new subscriptions fail.
    pub fn close(&self) {
        if let Ok(mut hub) = self.inner.hub.write() {
            hub.take();
        }
        debug!("memory backend pub/sub closed");
    }

    /// Make every write fail with [`MktError::Store`] without applying it.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), MktError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(MktError::Store("write rejected by backend".into()));
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, MktError> {
    lock.read().map_err(|_| MktError::Store("lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, MktError> {
    lock.write().map_err(|_| MktError::Store("lock poisoned".into()))
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<(), MktError> {
        self.check_writable()?;
        write(&self.inner.hashes)?
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hset_many(&self, key: &str, entries: Vec<(String, Vec<u8>)>) -> Result<(), MktError> {
        self.check_writable()?;
        // One write guard for the whole batch.
        let mut hashes = write(&self.inner.hashes)?;
        let hash = hashes.entry(key.to_string()).or_default();
        for (field, value) in entries {
            hash.insert(field, value);
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, MktError> {
        Ok(read(&self.inner.hashes)?
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hvals(&self, key: &str) -> Result<Vec<Vec<u8>>, MktError> {
        Ok(read(&self.inner.hashes)?
            .get(key)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), MktError> {
        self.check_writable()?;
        write(&self.inner.strings)?.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, MktError> {
        Ok(read(&self.inner.strings)?.get(key).cloned())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize, MktError> {
        let hub = read(&self.inner.hub)?;
        let tx = hub
            .as_ref()
            .ok_or_else(|| MktError::Publish("connection closed".into()))?;
        let msg = Message {
            channel: channel.to_string(),
            payload,
        };
        // No subscribers is fine for pub/sub.
        if tx.send(msg).is_err() {
            return Ok(0);
        }
        Ok(read(&self.inner.listeners)?.get(channel).copied().unwrap_or(0))
    }

    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn Subscription>, MktError> {
        let hub = read(&self.inner.hub)?;
        let tx = hub
            .as_ref()
            .ok_or_else(|| MktError::Closed("memory backend closed".into()))?;
        let channels: AHashSet<String> = channels.iter().cloned().collect();
        let mut listeners = write(&self.inner.listeners)?;
        for channel in &channels {
            *listeners.entry(channel.clone()).or_default() += 1;
        }
        Ok(Box::new(MemorySubscription {
            rx: tx.subscribe(),
            channels,
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Subscription over the shared hub, filtered to a channel set.
pub struct MemorySubscription {
    rx: broadcast::Receiver<Message>,
    channels: AHashSet<String>,
    inner: Arc<Inner>,
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        let Ok(mut listeners) = self.inner.listeners.write() else {
            return;
        };
        for channel in &self.channels {
            if let Some(n) = listeners.get_mut(channel) {
                *n -= 1;
                if *n == 0 {
                    listeners.remove(channel);
                }
            }
        }
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_message(&mut self) -> Result<Message, MktError> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if self.channels.contains(&msg.channel) => return Ok(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(MktError::Store(format!("subscriber lagged, {n} message(s) lost")));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(MktError::Closed("memory backend closed".into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_set_get_vals() {
        let b = MemoryBackend::new();
        b.hset("S:x", "A", vec![1]).await.unwrap();
        b.hset("S:x", "B", vec![2]).await.unwrap();
        b.hset("S:y", "A", vec![3]).await.unwrap();

        assert_eq!(b.hget("S:x", "A").await.unwrap(), Some(vec![1]));
        assert_eq!(b.hget("S:x", "Z").await.unwrap(), None);
        assert_eq!(b.hget("S:none", "A").await.unwrap(), None);

        let mut vals = b.hvals("S:x").await.unwrap();
        vals.sort();
        assert_eq!(vals, vec![vec![1], vec![2]]);
        assert!(b.hvals("S:none").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let b = MemoryBackend::new();
        b.set_fail_writes(true);
        let err = b
            .hset_many("S:x", vec![("A".into(), vec![1]), ("B".into(), vec![2])])
            .await
            .unwrap_err();
        assert!(matches!(err, MktError::Store(_)));
        assert!(b.hvals("S:x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn plain_keys() {
        let b = MemoryBackend::new();
        assert_eq!(b.get("CH:a:b").await.unwrap(), None);
        b.set("CH:a:b", "v".into()).await.unwrap();
        assert_eq!(b.get("CH:a:b").await.unwrap(), Some("v".into()));
    }

    #[tokio::test]
    async fn subscription_filters_channels() {
        let b = MemoryBackend::new();
        let mut sub = b.subscribe(&["wanted".to_string()]).await.unwrap();
        b.publish("other", vec![0]).await.unwrap();
        b.publish("wanted", vec![7]).await.unwrap();
        let msg = sub.next_message().await.unwrap();
        assert_eq!(msg.channel, "wanted");
        assert_eq!(msg.payload, vec![7]);
    }

    #[tokio::test]
    async fn publish_counts_only_matching_subscribers() {
        let b = MemoryBackend::new();
        let a1 = b.subscribe(&["a".to_string()]).await.unwrap();
        let _a2 = b.subscribe(&["a".to_string(), "b".to_string()]).await.unwrap();
        let _c = b.subscribe(&["c".to_string()]).await.unwrap();

        assert_eq!(b.publish("a", vec![1]).await.unwrap(), 2);
        assert_eq!(b.publish("b", vec![1]).await.unwrap(), 1);
        assert_eq!(b.publish("z", vec![1]).await.unwrap(), 0);

        drop(a1);
        assert_eq!(b.publish("a", vec![1]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers() {
        let b = MemoryBackend::new();
        assert_eq!(b.publish("nobody", vec![1]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lag_is_transient() {
        let b = MemoryBackend::with_pubsub_capacity(2);
        let mut sub = b.subscribe(&["c".to_string()]).await.unwrap();
        for i in 0..5u8 {
            b.publish("c", vec![i]).await.unwrap();
        }
        let err = sub.next_message().await.unwrap_err();
        assert!(matches!(err, MktError::Store(_)));
        // The subscription keeps working after the lag report.
        let msg = sub.next_message().await.unwrap();
        assert_eq!(msg.payload, vec![3]);
    }

    #[tokio::test]
    async fn close_is_fatal() {
        let b = MemoryBackend::new();
        let mut sub = b.subscribe(&["c".to_string()]).await.unwrap();
        b.close();
        assert!(sub.next_message().await.unwrap_err().is_fatal());
        assert!(b.subscribe(&["c".to_string()]).await.is_err());
        assert!(matches!(b.publish("c", vec![]).await, Err(MktError::Publish(_))));
    }
}
