//! CLI config for the shared routing cache.

/// Configuration of the shared cache keys.
#[derive(Debug, Clone, clap::Parser)]
#[allow(missing_copy_implementations)]
pub struct CacheConfig {
    /// Prefix of every hash and channel written to the shared cache.
    #[clap(
        long = "space-cache-key-prefix",
        env = "SPACE_CACHE_KEY_PREFIX",
        default_value = "bkmonitorv3:spaces",
        action
    )]
    pub key_prefix: String,
}
