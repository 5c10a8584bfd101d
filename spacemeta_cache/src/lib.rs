//! The shared routing cache the query layer reads from.
//!
//! Values are stored in hashes addressed by `(key, field)`. Every hash has a companion
//! notification channel, `<key>:channel`, on which the updated field is announced.

use std::fmt::Debug;

use async_trait::async_trait;

mod keys;
pub use keys::{CacheKeys, CacheKind, DEFAULT_KEY_PREFIX};
mod memory;
pub use memory::InMemoryCache;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to set field {field} of {key}: {reason}")]
    Write {
        key: String,
        field: String,
        reason: String,
    },

    #[error("failed to publish on channel {channel}: {reason}")]
    Publish { channel: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Write side of the shared cache.
///
/// Writes are overwrites, so repeating a write with the same value is a no-op for readers.
#[async_trait]
pub trait SharedCache: Debug + Send + Sync + 'static {
    /// Set `field` of the hash `key` to `value`.
    async fn set(&self, key: &str, field: &str, value: String) -> Result<()>;

    /// Announce `message` to the subscribers of `channel`.
    async fn publish(&self, channel: &str, message: &str) -> Result<()>;
}
