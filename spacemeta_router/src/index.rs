//! Indexes published next to the routes: data label to tables, and table to the physical
//! storage it is read from.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use serde::Serialize;
use spacemeta_catalog::{
    Result,
    model::{FieldTag, InfluxdbStorage, StorageType},
};
use spacemeta_id::{ClusterId, DataId, TableId};
use tracing::{debug, warn};

use crate::{
    batched::BatchedCatalog,
    classifier::{MeasurementKind, option_enabled},
    slice::TableSlice,
};

pub(crate) const OPTION_ENABLE_FIELD_BLACK_LIST: &str = "enable_field_black_list";
pub(crate) const OPTION_SEGMENTED_QUERY_ENABLE: &str = "segmented_query_enable";

/// data label -> active time-series tables carrying it
pub type DataLabelIndex = BTreeMap<String, BTreeSet<TableId>>;

pub type TableDetails = BTreeMap<TableId, TableDetail>;

/// Where and how the query layer reads a time-series table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDetail {
    pub measurement_type: MeasurementKind,
    pub storage_type: StorageType,
    pub storage_id: i64,
    pub cluster_name: String,
    pub db: String,
    pub measurement: String,
    pub tags_key: Vec<String>,
    pub fields: Vec<String>,
    /// Empty unless the table is written by a container cluster data source.
    pub bcs_cluster_id: String,
    pub data_label: String,
    pub bk_data_id: String,
    pub segmented_enable: bool,
}

/// Index every label in `labels`. A label no active time-series table carries any more maps to
/// an empty set, replacing what was published for it before.
pub(crate) async fn data_labels(
    catalog: &BatchedCatalog,
    labels: BTreeSet<String>,
) -> Result<DataLabelIndex> {
    let mut index: DataLabelIndex = labels.into_iter().map(|l| (l, BTreeSet::new())).collect();
    if index.is_empty() {
        return Ok(index);
    }

    let labels: Vec<String> = index.keys().cloned().collect();
    for table in catalog.result_tables_with_labels(&labels).await? {
        if !table.is_active() || !table.is_time_series() || !table.table_id.is_qualified() {
            continue;
        }
        for label in table.data_labels() {
            if let Some(tables) = index.get_mut(label) {
                tables.insert(table.table_id.clone());
            }
        }
    }
    Ok(index)
}

/// Detail of the time-series tables of `slice`. A table without a storage locator is left out.
pub(crate) async fn table_details(
    catalog: &BatchedCatalog,
    slice: &TableSlice,
    metrics_since: DateTime<Utc>,
) -> Result<TableDetails> {
    let tables: Vec<_> = slice
        .iter()
        .filter(|(_, t)| t.table.is_time_series())
        .collect();
    if tables.is_empty() {
        return Ok(TableDetails::new());
    }

    let table_ids: Vec<TableId> = tables.iter().map(|(t, _)| (*t).clone()).collect();
    let storages: HashMap<TableId, InfluxdbStorage> = catalog
        .influxdb_storages(&table_ids)
        .await?
        .into_iter()
        .map(|s| (s.table_id.clone(), s))
        .collect();
    let cluster_of: HashMap<DataId, ClusterId> = catalog
        .running_bcs_clusters()
        .await?
        .into_iter()
        .flat_map(|c| {
            c.data_ids()
                .map(|id| (id, c.cluster_id.clone()))
                .collect::<Vec<_>>()
        })
        .collect();
    let mut fields = metric_fields(catalog, &table_ids, metrics_since).await?;
    let segmented: HashSet<TableId> = catalog
        .result_table_options(&table_ids, OPTION_SEGMENTED_QUERY_ENABLE)
        .await?
        .into_iter()
        .filter(|o| option_enabled(&o.value))
        .map(|o| o.table_id)
        .collect();

    let mut details = TableDetails::new();
    for (table_id, table) in tables {
        let Some(storage) = storages.get(table_id) else {
            warn!(%table_id, "no storage locator for time-series table, skipping detail");
            continue;
        };
        let fields = fields.remove(table_id).unwrap_or_default();
        if fields.is_empty() {
            debug!(%table_id, "table has no metric fields");
        }
        let data_id = table.data_source.data_id;

        details.insert(
            table_id.clone(),
            TableDetail {
                measurement_type: table.kind,
                storage_type: table.table.default_storage,
                storage_id: storage.storage_cluster_id,
                cluster_name: storage.proxy_cluster_name.clone(),
                db: storage.database.clone(),
                measurement: storage.real_table_name.clone(),
                tags_key: storage.tags_key(),
                fields,
                bcs_cluster_id: cluster_of
                    .get(&data_id)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                data_label: table.table.data_label.clone().unwrap_or_default(),
                bk_data_id: data_id.to_string(),
                segmented_enable: segmented.contains(table_id),
            },
        );
    }
    Ok(details)
}

/// Metric field names per table, sorted.
///
/// Tables with the field black list switched off expose every metric field. Custom time-series
/// tables expose the metrics reported since `since`, older ones are considered abandoned. Any
/// other table exposes its metric fields.
async fn metric_fields(
    catalog: &BatchedCatalog,
    table_ids: &[TableId],
    since: DateTime<Utc>,
) -> Result<HashMap<TableId, Vec<String>>> {
    let white_listed: HashSet<TableId> = catalog
        .result_table_options(table_ids, OPTION_ENABLE_FIELD_BLACK_LIST)
        .await?
        .into_iter()
        .filter(|o| !option_enabled(&o.value))
        .map(|o| o.table_id)
        .collect();
    let rest: Vec<TableId> = table_ids
        .iter()
        .filter(|t| !white_listed.contains(*t))
        .cloned()
        .collect();

    let groups: HashMap<i64, TableId> = catalog
        .time_series_groups(&rest)
        .await?
        .into_iter()
        .map(|g| (g.group_id, g.table_id))
        .collect();
    let group_tables: HashSet<&TableId> = groups.values().collect();

    let mut fields: HashMap<TableId, Vec<String>> = HashMap::new();
    let group_ids: Vec<i64> = groups.keys().copied().sorted().collect();
    for metric in catalog.time_series_metrics(&group_ids, since).await? {
        if let Some(table_id) = groups.get(&metric.group_id) {
            fields
                .entry(table_id.clone())
                .or_default()
                .push(metric.field_name);
        }
    }

    let others: Vec<TableId> = table_ids
        .iter()
        .filter(|t| !group_tables.contains(t))
        .cloned()
        .collect();
    for field in catalog
        .result_table_fields(&others, FieldTag::Metric)
        .await?
    {
        fields
            .entry(field.table_id)
            .or_default()
            .push(field.field_name);
    }

    for names in fields.values_mut() {
        names.sort_unstable();
        names.dedup();
    }
    Ok(fields)
}

/// Start of the window in which a custom time-series metric counts as live.
pub(crate) fn metrics_since(now: DateTime<Utc>, expiry: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(expiry)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
