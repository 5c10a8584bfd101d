//! CLI config for space route resolution.

use std::{num::NonZeroUsize, time::Duration};

use spacemeta_id::{DataId, SpaceKey};

/// Configuration of the space router.
#[derive(Debug, Clone, clap::Parser)]
#[allow(missing_copy_implementations)]
pub struct RoutingConfig {
    /// Maximum number of spaces resolved concurrently by a full refresh.
    #[clap(
        long = "space-router-concurrency",
        env = "SPACE_ROUTER_CONCURRENCY",
        default_value = "10",
        action
    )]
    pub concurrency: NonZeroUsize,

    /// Maximum number of ids sent to the catalog in one lookup.
    #[clap(
        long = "catalog-batch-size",
        env = "SPACE_ROUTER_CATALOG_BATCH_SIZE",
        default_value = "1000",
        action
    )]
    pub catalog_batch_size: NonZeroUsize,

    /// Route tables written by a data source the space created itself without a filter,
    /// whatever their measurement type.
    #[clap(
        long = "skip-filter-for-owned-data-sources",
        env = "SPACE_ROUTER_SKIP_FILTER_FOR_OWNED_DATA_SOURCES",
        default_value = "false",
        action
    )]
    pub skip_filter_for_owned_data_sources: bool,

    /// A comma-delimited set of table id prefixes that are only routed to the spaces listed in
    /// `--reserved-table-allow-space`.
    #[clap(
        long = "reserved-table-prefix",
        env = "SPACE_ROUTER_RESERVED_TABLE_PREFIX",
        default_value = "dbm_system",
        num_args = 1..,
        value_delimiter = ',',
    )]
    pub reserved_table_prefixes: Vec<String>,

    /// A comma-delimited set of space uids allowed to see reserved tables.
    ///
    /// Example: "bkcc__2,bkci__devops"
    #[clap(
        long = "reserved-table-allow-space",
        env = "SPACE_ROUTER_RESERVED_TABLE_ALLOW_SPACE",
        required = false,
        num_args = 1..,
        value_delimiter = ',',
    )]
    pub reserved_table_allow_spaces: Vec<SpaceKey>,

    /// Prefix of host level system tables, routed to project groups through their linked
    /// business.
    #[clap(
        long = "system-table-prefix",
        env = "SPACE_ROUTER_SYSTEM_TABLE_PREFIX",
        default_value = "system.",
        action
    )]
    pub system_table_prefix: String,

    /// A comma-delimited set of data ids never routed to project groups.
    #[clap(
        long = "project-excluded-data-id",
        env = "SPACE_ROUTER_PROJECT_EXCLUDED_DATA_ID",
        default_value = "1110000",
        num_args = 1..,
        value_delimiter = ',',
    )]
    pub project_excluded_data_ids: Vec<DataId>,

    /// Custom time-series metrics not reported within this window are left out of the table
    /// detail field list.
    #[clap(
        long = "time-series-metric-expiry",
        env = "SPACE_ROUTER_TIME_SERIES_METRIC_EXPIRY",
        default_value = "30d",
        value_parser = humantime::parse_duration,
    )]
    pub time_series_metric_expiry: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults() {
        let config = RoutingConfig::try_parse_from(["my_binary"]).unwrap();
        assert_eq!(config.concurrency.get(), 10);
        assert_eq!(config.catalog_batch_size.get(), 1000);
        assert!(!config.skip_filter_for_owned_data_sources);
        assert_eq!(config.reserved_table_prefixes, vec!["dbm_system".to_string()]);
        assert!(config.reserved_table_allow_spaces.is_empty());
        assert_eq!(config.system_table_prefix, "system.");
        assert_eq!(config.project_excluded_data_ids, vec![DataId::new(1110000)]);
        assert_eq!(
            config.time_series_metric_expiry,
            Duration::from_secs(30 * 24 * 60 * 60)
        );
    }

    #[test]
    fn lists() {
        let config = RoutingConfig::try_parse_from([
            "my_binary",
            "--reserved-table-allow-space",
            "bkcc__2,bkci__devops",
            "--project-excluded-data-id",
            "1110000,1100001",
            "--skip-filter-for-owned-data-sources",
            "true",
        ])
        .unwrap();
        assert_eq!(
            config.reserved_table_allow_spaces,
            vec![SpaceKey::business("2"), SpaceKey::project("devops")]
        );
        assert_eq!(config.project_excluded_data_ids.len(), 2);
        assert!(config.skip_filter_for_owned_data_sources);
    }

    #[test]
    fn invalid_space_uid() {
        let error = RoutingConfig::try_parse_from([
            "my_binary",
            "--reserved-table-allow-space",
            "bkcc2",
        ])
        .unwrap_err()
        .to_string();
        assert!(error.contains("invalid space uid [bkcc2]"), "{error}");
    }

    #[test]
    fn zero_concurrency_rejected() {
        assert!(
            RoutingConfig::try_parse_from(["my_binary", "--space-router-concurrency", "0"])
                .is_err()
        );
    }
}
