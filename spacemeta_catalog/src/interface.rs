//! This module contains the read API the routing engine consumes from the catalog.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spacemeta_id::{DataId, SpaceKey, SpaceType, TableId};

use crate::model::{
    BcsClusterInfo, DataSource, DataSourceOption, DataSourceResultTable, FieldTag,
    InfluxdbStorage, ResultTable, ResultTableField, ResultTableOption, Space, SpaceDataSource,
    SpaceResource, TimeSeriesGroup, TimeSeriesMetric,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {relation}: {source}")]
    Read {
        relation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A specialized `Error` for catalog reads
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Read only access to the relational catalog.
///
/// Lookups by id list are expected to be called with bounded lists; callers chunk large id
/// sets before calling in. Rows for ids that do not exist are simply absent from the result.
#[async_trait]
pub trait CatalogReader: Debug + Send + Sync + 'static {
    /// List spaces, optionally restricted to one space type.
    async fn list_spaces(&self, space_type: Option<SpaceType>) -> Result<Vec<Space>>;

    /// Resource bindings of `space` with the given resource type.
    async fn space_resources(
        &self,
        space: &SpaceKey,
        resource_type: SpaceType,
    ) -> Result<Vec<SpaceResource>>;

    /// Data source grants of `space`. `from_authorization` restricts to one kind of grant when
    /// set.
    async fn space_data_sources(
        &self,
        space: &SpaceKey,
        from_authorization: Option<bool>,
    ) -> Result<Vec<SpaceDataSource>>;

    /// Platform data sources whose scope is one of `scopes`.
    async fn platform_data_sources(&self, scopes: &[SpaceType]) -> Result<Vec<DataSource>>;

    async fn data_sources(&self, data_ids: &[DataId]) -> Result<Vec<DataSource>>;

    /// Options named `name` of the given data sources.
    async fn data_source_options(
        &self,
        data_ids: &[DataId],
        name: &str,
    ) -> Result<Vec<DataSourceOption>>;

    async fn data_source_result_tables(
        &self,
        data_ids: &[DataId],
    ) -> Result<Vec<DataSourceResultTable>>;

    async fn data_source_result_tables_by_table(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<DataSourceResultTable>>;

    async fn result_tables(&self, table_ids: &[TableId]) -> Result<Vec<ResultTable>>;

    /// Result tables carrying at least one of `labels`.
    async fn result_tables_with_labels(&self, labels: &[String]) -> Result<Vec<ResultTable>>;

    /// Every result table, including disabled and deleted ones.
    async fn list_result_tables(&self) -> Result<Vec<ResultTable>>;

    /// Options named `name` of the given tables.
    async fn result_table_options(
        &self,
        table_ids: &[TableId],
        name: &str,
    ) -> Result<Vec<ResultTableOption>>;

    /// Fields with the given tag of the given tables.
    async fn result_table_fields(
        &self,
        table_ids: &[TableId],
        tag: FieldTag,
    ) -> Result<Vec<ResultTableField>>;

    async fn time_series_groups(&self, table_ids: &[TableId]) -> Result<Vec<TimeSeriesGroup>>;

    /// Metrics of the given groups modified at or after `since`.
    async fn time_series_metrics(
        &self,
        group_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesMetric>>;

    async fn influxdb_storages(&self, table_ids: &[TableId]) -> Result<Vec<InfluxdbStorage>>;

    /// Every registered cluster, whatever its status.
    async fn list_bcs_clusters(&self) -> Result<Vec<BcsClusterInfo>>;

    /// Every registered cluster in the running state.
    async fn running_bcs_clusters(&self) -> Result<Vec<BcsClusterInfo>>;
}
