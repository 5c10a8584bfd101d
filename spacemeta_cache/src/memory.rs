use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{Error, Result, SharedCache};

const CHANNEL_BUFFER_SIZE: usize = 10_000;

/// Process local [`SharedCache`] backed by hash maps, with broadcast channels for notifications.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    published: Mutex<Vec<(String, String)>>,
    fail_writes: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str, field: &str) -> Option<String> {
        self.hashes.read().get(key)?.get(field).cloned()
    }

    /// Snapshot of the whole hash `key`.
    pub fn hash(&self, key: &str) -> HashMap<String, String> {
        self.hashes.read().get(key).cloned().unwrap_or_default()
    }

    /// Subscribe to notifications on `channel`.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.channels
            .lock()
            .entry_ref(channel)
            .or_insert_with(|| broadcast::channel(CHANNEL_BUFFER_SIZE).0)
            .subscribe()
    }

    /// Every `(channel, message)` published so far, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }

    pub fn clear_published(&self) {
        self.published.lock().clear();
    }

    /// Make writes and publishes fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SharedCache for InMemoryCache {
    async fn set(&self, key: &str, field: &str, value: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Write {
                key: key.to_string(),
                field: field.to_string(),
                reason: "cache marked read only".to_string(),
            });
        }
        debug!(key, field, "set cache field");
        self.hashes
            .write()
            .entry_ref(key)
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Publish {
                channel: channel.to_string(),
                reason: "cache marked read only".to_string(),
            });
        }
        self.published
            .lock()
            .push((channel.to_string(), message.to_string()));
        if let Some(tx) = self.channels.lock().get(channel) {
            // no receivers is not an error, the message is simply dropped
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn set_overwrites_and_notifies() {
        let cache = InMemoryCache::new();
        let mut rx = cache.subscribe("k:channel");

        cache.set("k", "f", "1".to_string()).await.unwrap();
        cache.set("k", "f", "2".to_string()).await.unwrap();
        cache.publish("k:channel", "f").await.unwrap();

        assert_eq!(cache.get("k", "f").as_deref(), Some("2"));
        assert_eq!(cache.hash("k").len(), 1);
        assert_eq!(rx.recv().await.unwrap(), "f");
        assert_eq!(
            cache.published(),
            vec![("k:channel".to_string(), "f".to_string())]
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers() {
        let cache = InMemoryCache::new();
        cache.publish("nobody", "m").await.unwrap();
        assert_eq!(cache.published().len(), 1);
    }

    #[tokio::test]
    async fn failing_writes() {
        let cache = InMemoryCache::new();
        cache.set_fail_writes(true);
        assert!(matches!(
            cache.set("k", "f", "v".to_string()).await,
            Err(Error::Write { .. })
        ));
        assert!(matches!(
            cache.publish("c", "m").await,
            Err(Error::Publish { .. })
        ));
        assert!(cache.get("k", "f").is_none());

        cache.set_fail_writes(false);
        cache.set("k", "f", "v".to_string()).await.unwrap();
    }
}
