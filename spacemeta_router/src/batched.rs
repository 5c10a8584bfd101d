//! Catalog lookups by id list, split into batches of bounded size.

use std::{future::Future, num::NonZeroUsize, sync::Arc};

use chrono::{DateTime, Utc};
use spacemeta_catalog::{
    CatalogReader, Result,
    model::{
        BcsClusterInfo, DataSource, DataSourceOption, DataSourceResultTable, FieldTag,
        InfluxdbStorage, ResultTable, ResultTableField, ResultTableOption, Space,
        SpaceDataSource, SpaceResource, TimeSeriesGroup, TimeSeriesMetric,
    },
};
use spacemeta_id::{DataId, SpaceKey, SpaceType, TableId};

async fn chunked<'a, I, T, F, Fut>(
    ids: &'a [I],
    batch_size: NonZeroUsize,
    mut load: F,
) -> Result<Vec<T>>
where
    I: Sync,
    T: Send,
    F: FnMut(&'a [I]) -> Fut + Send,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    let mut out = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(batch_size.get()) {
        out.extend(load(chunk).await?);
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub(crate) struct BatchedCatalog {
    inner: Arc<dyn CatalogReader>,
    batch_size: NonZeroUsize,
}

impl BatchedCatalog {
    pub(crate) fn new(inner: Arc<dyn CatalogReader>, batch_size: NonZeroUsize) -> Self {
        Self { inner, batch_size }
    }

    pub(crate) async fn list_spaces(&self, space_type: Option<SpaceType>) -> Result<Vec<Space>> {
        self.inner.list_spaces(space_type).await
    }

    pub(crate) async fn space_resources(
        &self,
        space: &SpaceKey,
        resource_type: SpaceType,
    ) -> Result<Vec<SpaceResource>> {
        self.inner.space_resources(space, resource_type).await
    }

    pub(crate) async fn space_data_sources(
        &self,
        space: &SpaceKey,
        from_authorization: Option<bool>,
    ) -> Result<Vec<SpaceDataSource>> {
        self.inner
            .space_data_sources(space, from_authorization)
            .await
    }

    pub(crate) async fn platform_data_sources(
        &self,
        scopes: &[SpaceType],
    ) -> Result<Vec<DataSource>> {
        self.inner.platform_data_sources(scopes).await
    }

    pub(crate) async fn list_result_tables(&self) -> Result<Vec<ResultTable>> {
        self.inner.list_result_tables().await
    }

    pub(crate) async fn list_bcs_clusters(&self) -> Result<Vec<BcsClusterInfo>> {
        self.inner.list_bcs_clusters().await
    }

    pub(crate) async fn running_bcs_clusters(&self) -> Result<Vec<BcsClusterInfo>> {
        self.inner.running_bcs_clusters().await
    }

    pub(crate) async fn data_sources(&self, data_ids: &[DataId]) -> Result<Vec<DataSource>> {
        chunked(data_ids, self.batch_size, |c| self.inner.data_sources(c)).await
    }

    pub(crate) async fn data_source_options(
        &self,
        data_ids: &[DataId],
        name: &str,
    ) -> Result<Vec<DataSourceOption>> {
        chunked(data_ids, self.batch_size, |c| {
            self.inner.data_source_options(c, name)
        })
        .await
    }

    pub(crate) async fn data_source_result_tables(
        &self,
        data_ids: &[DataId],
    ) -> Result<Vec<DataSourceResultTable>> {
        chunked(data_ids, self.batch_size, |c| {
            self.inner.data_source_result_tables(c)
        })
        .await
    }

    pub(crate) async fn data_source_result_tables_by_table(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<DataSourceResultTable>> {
        chunked(table_ids, self.batch_size, |c| {
            self.inner.data_source_result_tables_by_table(c)
        })
        .await
    }

    pub(crate) async fn result_tables(&self, table_ids: &[TableId]) -> Result<Vec<ResultTable>> {
        chunked(table_ids, self.batch_size, |c| self.inner.result_tables(c)).await
    }

    pub(crate) async fn result_tables_with_labels(
        &self,
        labels: &[String],
    ) -> Result<Vec<ResultTable>> {
        let mut tables = chunked(labels, self.batch_size, |c| {
            self.inner.result_tables_with_labels(c)
        })
        .await?;
        // a multi label table matches in every batch holding one of its labels
        tables.sort_unstable_by(|a, b| a.table_id.cmp(&b.table_id));
        tables.dedup_by(|a, b| a.table_id == b.table_id);
        Ok(tables)
    }

    pub(crate) async fn result_table_options(
        &self,
        table_ids: &[TableId],
        name: &str,
    ) -> Result<Vec<ResultTableOption>> {
        chunked(table_ids, self.batch_size, |c| {
            self.inner.result_table_options(c, name)
        })
        .await
    }

    pub(crate) async fn result_table_fields(
        &self,
        table_ids: &[TableId],
        tag: FieldTag,
    ) -> Result<Vec<ResultTableField>> {
        chunked(table_ids, self.batch_size, |c| {
            self.inner.result_table_fields(c, tag)
        })
        .await
    }

    pub(crate) async fn time_series_groups(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<TimeSeriesGroup>> {
        chunked(table_ids, self.batch_size, |c| {
            self.inner.time_series_groups(c)
        })
        .await
    }

    pub(crate) async fn time_series_metrics(
        &self,
        group_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesMetric>> {
        chunked(group_ids, self.batch_size, |c| {
            self.inner.time_series_metrics(c, since)
        })
        .await
    }

    pub(crate) async fn influxdb_storages(
        &self,
        table_ids: &[TableId],
    ) -> Result<Vec<InfluxdbStorage>> {
        chunked(table_ids, self.batch_size, |c| {
            self.inner.influxdb_storages(c)
        })
        .await
    }
}
