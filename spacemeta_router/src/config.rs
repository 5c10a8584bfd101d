use std::{num::NonZeroUsize, time::Duration};

use hashbrown::HashSet;
use spacemeta_cache::CacheKeys;
use spacemeta_clap_blocks::{cache::CacheConfig, routing::RoutingConfig};
use spacemeta_id::{DataId, SpaceKey, TableId};

const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    }
}

pub const DEFAULT_CONCURRENCY: NonZeroUsize = non_zero(10);
pub const DEFAULT_CATALOG_BATCH_SIZE: NonZeroUsize = non_zero(1000);
pub const DEFAULT_RESERVED_TABLE_PREFIX: &str = "dbm_system";
pub const DEFAULT_SYSTEM_TABLE_PREFIX: &str = "system.";
pub const DEFAULT_PROJECT_EXCLUDED_DATA_ID: DataId = DataId::new(1_110_000);
pub const DEFAULT_TIME_SERIES_METRIC_EXPIRY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Settings of the space router, fixed at construction.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Spaces resolved concurrently by a full refresh.
    pub concurrency: NonZeroUsize,
    /// Upper bound of ids in one catalog lookup.
    pub catalog_batch_size: NonZeroUsize,
    /// Route tables of data sources created by the requesting space without a filter.
    pub skip_filter_for_owned_data_sources: bool,
    /// Tables with these prefixes are only routed to `reserved_table_allow_spaces`.
    pub reserved_table_prefixes: Vec<String>,
    pub reserved_table_allow_spaces: HashSet<SpaceKey>,
    /// Host level tables a project group sees through its linked business.
    pub system_table_prefix: String,
    /// Data sources never routed to a project group.
    pub project_excluded_data_ids: HashSet<DataId>,
    pub time_series_metric_expiry: Duration,
    pub cache_keys: CacheKeys,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            catalog_batch_size: DEFAULT_CATALOG_BATCH_SIZE,
            skip_filter_for_owned_data_sources: false,
            reserved_table_prefixes: vec![DEFAULT_RESERVED_TABLE_PREFIX.to_string()],
            reserved_table_allow_spaces: HashSet::new(),
            system_table_prefix: DEFAULT_SYSTEM_TABLE_PREFIX.to_string(),
            project_excluded_data_ids: HashSet::from([DEFAULT_PROJECT_EXCLUDED_DATA_ID]),
            time_series_metric_expiry: DEFAULT_TIME_SERIES_METRIC_EXPIRY,
            cache_keys: CacheKeys::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_clap(routing: &RoutingConfig, cache: &CacheConfig) -> Self {
        Self {
            concurrency: routing.concurrency,
            catalog_batch_size: routing.catalog_batch_size,
            skip_filter_for_owned_data_sources: routing.skip_filter_for_owned_data_sources,
            reserved_table_prefixes: routing.reserved_table_prefixes.clone(),
            reserved_table_allow_spaces: routing
                .reserved_table_allow_spaces
                .iter()
                .cloned()
                .collect(),
            system_table_prefix: routing.system_table_prefix.clone(),
            project_excluded_data_ids: routing.project_excluded_data_ids.iter().copied().collect(),
            time_series_metric_expiry: routing.time_series_metric_expiry,
            cache_keys: CacheKeys::new(&cache.key_prefix),
        }
    }

    /// Whether `table_id` is reserved and `space` is not allowed to see it.
    pub fn is_reserved_for(&self, table_id: &TableId, space: &SpaceKey) -> bool {
        self.reserved_table_prefixes
            .iter()
            .any(|p| table_id.as_str().starts_with(p.as_str()))
            && !self.reserved_table_allow_spaces.contains(space)
    }

    pub fn is_system_table(&self, table_id: &TableId) -> bool {
        table_id
            .as_str()
            .starts_with(self.system_table_prefix.as_str())
    }
}
