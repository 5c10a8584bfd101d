//! This module implements an in-memory implementation of the catalog read API. It is used by
//! tests and by deployments that load a catalog snapshot at startup.

use std::fmt::Formatter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use parking_lot::RwLock;
use spacemeta_id::{DataId, SpaceKey, SpaceType, TableId};
use tracing::debug;

use crate::{
    interface::{CatalogReader, Error, Result},
    model::{
        BcsClusterInfo, DataSource, DataSourceOption, DataSourceResultTable, FieldTag,
        InfluxdbStorage, ResultTable, ResultTableField, ResultTableOption, Space,
        SpaceDataSource, SpaceResource, TimeSeriesGroup, TimeSeriesMetric,
    },
};

/// In-memory catalog implementing [`CatalogReader`].
#[derive(Default)]
pub struct MemCatalog {
    collections: RwLock<MemCollections>,
}

impl std::fmt::Debug for MemCatalog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemCatalog").finish_non_exhaustive()
    }
}

#[derive(Default, Debug, Clone)]
struct MemCollections {
    spaces: Vec<Space>,
    space_resources: Vec<SpaceResource>,
    space_data_sources: Vec<SpaceDataSource>,
    data_sources: Vec<DataSource>,
    data_source_options: Vec<DataSourceOption>,
    data_source_result_tables: Vec<DataSourceResultTable>,
    result_tables: Vec<ResultTable>,
    result_table_options: Vec<ResultTableOption>,
    result_table_fields: Vec<ResultTableField>,
    time_series_groups: Vec<TimeSeriesGroup>,
    time_series_metrics: Vec<TimeSeriesMetric>,
    influxdb_storages: Vec<InfluxdbStorage>,
    bcs_clusters: Vec<BcsClusterInfo>,

    unavailable: bool,
    failing_spaces: HashSet<SpaceKey>,
}

impl MemCollections {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::Unavailable("memory catalog marked unavailable".to_string()));
        }
        Ok(())
    }

    fn check_space(&self, space: &SpaceKey) -> Result<()> {
        self.check_available()?;
        if self.failing_spaces.contains(space) {
            return Err(Error::Unavailable(format!("reads for space {space} failing")));
        }
        Ok(())
    }
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_space(&self, space: Space) {
        self.collections.write().spaces.push(space);
    }

    pub fn add_space_resource(&self, resource: SpaceResource) {
        self.collections.write().space_resources.push(resource);
    }

    pub fn add_space_data_source(&self, grant: SpaceDataSource) {
        let mut collections = self.collections.write();
        collections
            .space_data_sources
            .retain(|g| !(g.space == grant.space && g.data_id == grant.data_id));
        collections.space_data_sources.push(grant);
    }

    /// Insert or replace a data source.
    pub fn add_data_source(&self, data_source: DataSource) {
        let mut collections = self.collections.write();
        collections
            .data_sources
            .retain(|d| d.data_id != data_source.data_id);
        collections.data_sources.push(data_source);
    }

    pub fn add_data_source_option(&self, data_id: DataId, name: &str, value: serde_json::Value) {
        let mut collections = self.collections.write();
        collections
            .data_source_options
            .retain(|o| !(o.data_id == data_id && o.name == name));
        collections.data_source_options.push(DataSourceOption {
            data_id,
            name: name.to_string(),
            value,
        });
    }

    /// Insert or replace a result table.
    pub fn add_result_table(&self, table: ResultTable) {
        let mut collections = self.collections.write();
        collections
            .result_tables
            .retain(|t| t.table_id != table.table_id);
        collections.result_tables.push(table);
    }

    /// Link `table_id` to `data_id`. A table is written by at most one data source, so any
    /// previous link of the table is replaced.
    pub fn link_result_table(&self, data_id: DataId, table_id: impl Into<TableId>) {
        let table_id = table_id.into();
        let mut collections = self.collections.write();
        collections
            .data_source_result_tables
            .retain(|l| l.table_id != table_id);
        collections
            .data_source_result_tables
            .push(DataSourceResultTable { data_id, table_id });
    }

    pub fn add_result_table_option(
        &self,
        table_id: impl Into<TableId>,
        name: &str,
        value: serde_json::Value,
    ) {
        let table_id = table_id.into();
        let mut collections = self.collections.write();
        collections
            .result_table_options
            .retain(|o| !(o.table_id == table_id && o.name == name));
        collections.result_table_options.push(ResultTableOption {
            table_id,
            name: name.to_string(),
            value,
        });
    }

    pub fn add_result_table_field(&self, field: ResultTableField) {
        self.collections.write().result_table_fields.push(field);
    }

    pub fn add_time_series_group(&self, group: TimeSeriesGroup) {
        self.collections.write().time_series_groups.push(group);
    }

    pub fn add_time_series_metric(&self, metric: TimeSeriesMetric) {
        self.collections.write().time_series_metrics.push(metric);
    }

    pub fn add_influxdb_storage(&self, storage: InfluxdbStorage) {
        let mut collections = self.collections.write();
        collections
            .influxdb_storages
            .retain(|s| s.table_id != storage.table_id);
        collections.influxdb_storages.push(storage);
    }

    pub fn add_bcs_cluster(&self, cluster: BcsClusterInfo) {
        let mut collections = self.collections.write();
        collections
            .bcs_clusters
            .retain(|c| c.cluster_id != cluster.cluster_id);
        collections.bcs_clusters.push(cluster);
    }

    /// Make every read fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.collections.write().unavailable = unavailable;
    }

    /// Make the space scoped reads of `space` fail.
    pub fn fail_reads_for_space(&self, space: SpaceKey) {
        self.collections.write().failing_spaces.insert(space);
    }
}

#[async_trait]
impl CatalogReader for MemCatalog {
    async fn list_spaces(&self, space_type: Option<SpaceType>) -> Result<Vec<Space>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .spaces
            .iter()
            .filter(|s| space_type.is_none_or(|t| s.space_type == t))
            .cloned()
            .collect())
    }

    async fn space_resources(
        &self,
        space: &SpaceKey,
        resource_type: SpaceType,
    ) -> Result<Vec<SpaceResource>> {
        let collections = self.collections.read();
        collections.check_space(space)?;
        Ok(collections
            .space_resources
            .iter()
            .filter(|r| &r.space == space && r.resource_type == resource_type)
            .cloned()
            .collect())
    }

    async fn space_data_sources(
        &self,
        space: &SpaceKey,
        from_authorization: Option<bool>,
    ) -> Result<Vec<SpaceDataSource>> {
        let collections = self.collections.read();
        collections.check_space(space)?;
        Ok(collections
            .space_data_sources
            .iter()
            .filter(|g| &g.space == space)
            .filter(|g| from_authorization.is_none_or(|a| g.from_authorization == a))
            .cloned()
            .collect())
    }

    async fn platform_data_sources(&self, scopes: &[SpaceType]) -> Result<Vec<DataSource>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .data_sources
            .iter()
            .filter(|d| d.is_platform_data_id && scopes.contains(&d.space_type_id))
            .cloned()
            .collect())
    }

    async fn data_sources(&self, data_ids: &[DataId]) -> Result<Vec<DataSource>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .data_sources
            .iter()
            .filter(|d| data_ids.contains(&d.data_id))
            .cloned()
            .collect())
    }

    async fn data_source_options(
        &self,
        data_ids: &[DataId],
        name: &str,
    ) -> Result<Vec<DataSourceOption>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .data_source_options
            .iter()
            .filter(|o| o.name == name && data_ids.contains(&o.data_id))
            .cloned()
            .collect())
    }

    async fn data_source_result_tables(
        &self,
        data_ids: &[DataId],
    ) -> Result<Vec<DataSourceResultTable>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .data_source_result_tables
            .iter()
            .filter(|l| data_ids.contains(&l.data_id))
            .cloned()
            .collect())
    }

    async fn data_source_result_tables_by_table(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<DataSourceResultTable>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .data_source_result_tables
            .iter()
            .filter(|l| table_ids.contains(&l.table_id))
            .cloned()
            .collect())
    }

    async fn result_tables(&self, table_ids: &[TableId]) -> Result<Vec<ResultTable>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .result_tables
            .iter()
            .filter(|t| table_ids.contains(&t.table_id))
            .cloned()
            .collect())
    }

    async fn result_tables_with_labels(&self, labels: &[String]) -> Result<Vec<ResultTable>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .result_tables
            .iter()
            .filter(|t| t.data_labels().any(|l| labels.iter().any(|x| x == l)))
            .cloned()
            .collect())
    }

    async fn list_result_tables(&self) -> Result<Vec<ResultTable>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections.result_tables.clone())
    }

    async fn result_table_options(
        &self,
        table_ids: &[TableId],
        name: &str,
    ) -> Result<Vec<ResultTableOption>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .result_table_options
            .iter()
            .filter(|o| o.name == name && table_ids.contains(&o.table_id))
            .cloned()
            .collect())
    }

    async fn result_table_fields(
        &self,
        table_ids: &[TableId],
        tag: FieldTag,
    ) -> Result<Vec<ResultTableField>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .result_table_fields
            .iter()
            .filter(|f| f.tag == tag && table_ids.contains(&f.table_id))
            .cloned()
            .collect())
    }

    async fn time_series_groups(&self, table_ids: &[TableId]) -> Result<Vec<TimeSeriesGroup>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .time_series_groups
            .iter()
            .filter(|g| table_ids.contains(&g.table_id))
            .cloned()
            .collect())
    }

    async fn time_series_metrics(
        &self,
        group_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesMetric>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .time_series_metrics
            .iter()
            .filter(|m| group_ids.contains(&m.group_id) && m.last_modify_time >= since)
            .cloned()
            .collect())
    }

    async fn influxdb_storages(&self, table_ids: &[TableId]) -> Result<Vec<InfluxdbStorage>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections
            .influxdb_storages
            .iter()
            .filter(|s| table_ids.contains(&s.table_id))
            .cloned()
            .collect())
    }

    async fn list_bcs_clusters(&self) -> Result<Vec<BcsClusterInfo>> {
        let collections = self.collections.read();
        collections.check_available()?;
        Ok(collections.bcs_clusters.clone())
    }

    async fn running_bcs_clusters(&self) -> Result<Vec<BcsClusterInfo>> {
        let collections = self.collections.read();
        collections.check_available()?;
        let clusters: Vec<_> = collections
            .bcs_clusters
            .iter()
            .filter(|c| c.is_running())
            .cloned()
            .collect();
        debug!(n_clusters = clusters.len(), "listed running clusters");
        Ok(clusters)
    }
}
