//! Row types of the relational catalog, as seen by the routing engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use spacemeta_id::{ClusterId, DataId, SpaceKey, SpaceType, TableId};
use tracing::warn;

/// A tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub space_type: SpaceType,
    pub space_id: Arc<str>,
    pub space_name: String,
}

impl Space {
    pub fn new(key: &SpaceKey, space_name: impl Into<String>) -> Self {
        Self {
            space_type: key.space_type,
            space_id: Arc::clone(&key.space_id),
            space_name: space_name.into(),
        }
    }

    pub fn key(&self) -> SpaceKey {
        SpaceKey {
            space_type: self.space_type,
            space_id: Arc::clone(&self.space_id),
        }
    }
}

/// Binding of a space to a resource of another space type, e.g. the business a project group
/// is linked to, or the container clusters it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceResource {
    pub space: SpaceKey,
    pub resource_type: SpaceType,
    pub resource_id: Option<String>,
    /// JSON encoded list of [`DimensionValue`].
    pub dimension_values: String,
}

impl SpaceResource {
    /// Decode the dimension values of the binding.
    ///
    /// An empty column is treated as an empty list.
    pub fn dimensions(&self) -> Result<Vec<DimensionValue>, serde_json::Error> {
        if self.dimension_values.trim().is_empty() {
            return Ok(vec![]);
        }
        serde_json::from_str(&self.dimension_values)
    }
}

/// How a container cluster is shared between spaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ClusterType {
    /// The whole cluster belongs to one space.
    #[default]
    #[serde(rename = "single")]
    Dedicated,
    /// The cluster is shared and each space owns a set of namespaces.
    #[serde(rename = "shared")]
    Shared,
}

impl ClusterType {
    /// Interpret the catalog value; unknown values are treated as dedicated.
    pub fn from_catalog(value: &str) -> Self {
        match value {
            "single" => Self::Dedicated,
            "shared" => Self::Shared,
            other => {
                warn!(cluster_type = other, "unknown cluster type, treating as dedicated");
                Self::Dedicated
            }
        }
    }
}

fn deserialize_cluster_type<'de, D>(deserializer: D) -> Result<ClusterType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(ClusterType::from_catalog)
        .unwrap_or_default())
}

/// One cluster binding inside [`SpaceResource::dimension_values`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionValue {
    pub cluster_id: ClusterId,
    #[serde(default, deserialize_with = "deserialize_cluster_type")]
    pub cluster_type: ClusterType,
    #[serde(default, alias = "namespace_list")]
    pub namespace: Option<Vec<String>>,
}

/// Grant of a data source to a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceDataSource {
    pub space: SpaceKey,
    pub data_id: DataId,
    /// Set when the grant was derived from a cross-space authorization rather than ownership.
    pub from_authorization: bool,
}

/// Format the ingestion pipeline of a data source writes in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EtlConfig {
    StandardV2TimeSeries,
    Exporter,
    Standard,
    Other(String),
}

impl EtlConfig {
    pub fn as_str(&self) -> &str {
        match self {
            Self::StandardV2TimeSeries => "bk_standard_v2_time_series",
            Self::Exporter => "bk_exporter",
            Self::Standard => "bk_standard",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for EtlConfig {
    fn from(value: &str) -> Self {
        match value {
            "bk_standard_v2_time_series" => Self::StandardV2TimeSeries,
            "bk_exporter" => Self::Exporter,
            "bk_standard" => Self::Standard,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EtlConfig {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EtlConfig> for String {
    fn from(value: EtlConfig) -> Self {
        value.as_str().to_string()
    }
}

/// An ingestion pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub data_id: DataId,
    pub data_name: String,
    pub etl_config: EtlConfig,
    /// The space that created the data source, if any.
    pub space_uid: Option<SpaceKey>,
    pub is_platform_data_id: bool,
    /// Platform scope: [`SpaceType::All`] or the space type whose spaces all see the source.
    pub space_type_id: SpaceType,
}

impl DataSource {
    pub fn new(data_id: DataId, etl_config: EtlConfig) -> Self {
        Self {
            data_id,
            data_name: format!("data_{data_id}"),
            etl_config,
            space_uid: None,
            is_platform_data_id: false,
            space_type_id: SpaceType::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceOption {
    pub data_id: DataId,
    pub name: String,
    pub value: serde_json::Value,
}

/// Shape of the rows of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    Fixed,
    Free,
    #[serde(other)]
    Unknown,
}

/// Storage engine the result table is written to by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Influxdb,
    Elasticsearch,
    Kafka,
    #[serde(other)]
    Unknown,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Influxdb => "influxdb",
            Self::Elasticsearch => "elasticsearch",
            Self::Kafka => "kafka",
            Self::Unknown => "unknown",
        }
    }
}

/// A physical result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    pub table_id: TableId,
    pub schema_type: SchemaType,
    /// Zero or more comma separated labels.
    pub data_label: Option<String>,
    pub default_storage: StorageType,
    pub is_enable: bool,
    pub is_deleted: bool,
}

impl ResultTable {
    pub fn new(table_id: impl Into<TableId>, schema_type: SchemaType) -> Self {
        Self {
            table_id: table_id.into(),
            schema_type,
            data_label: None,
            default_storage: StorageType::Influxdb,
            is_enable: true,
            is_deleted: false,
        }
    }

    /// Enabled and not deleted.
    pub fn is_active(&self) -> bool {
        self.is_enable && !self.is_deleted
    }

    pub fn is_time_series(&self) -> bool {
        self.default_storage == StorageType::Influxdb
    }

    pub fn data_labels(&self) -> impl Iterator<Item = &str> {
        self.data_label
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// Link of a result table to the data source writing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceResultTable {
    pub data_id: DataId,
    pub table_id: TableId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTableOption {
    pub table_id: TableId,
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    Metric,
    Dimension,
    Timestamp,
    Group,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTableField {
    pub table_id: TableId,
    pub field_name: String,
    pub tag: FieldTag,
}

/// Group of custom time-series metrics stored in one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesGroup {
    pub group_id: i64,
    pub table_id: TableId,
    pub data_id: DataId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesMetric {
    pub group_id: i64,
    pub field_name: String,
    pub last_modify_time: DateTime<Utc>,
}

/// Physical locator of a time-series result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxdbStorage {
    pub table_id: TableId,
    pub storage_cluster_id: i64,
    pub database: String,
    pub real_table_name: String,
    pub proxy_cluster_name: String,
    /// Comma separated tag keys the table is partitioned by.
    pub partition_tags: String,
}

impl InfluxdbStorage {
    pub fn tags_key(&self) -> Vec<String> {
        self.partition_tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// A registered container cluster and the data sources that collect from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BcsClusterInfo {
    pub cluster_id: ClusterId,
    pub k8s_metric_data_id: DataId,
    pub custom_metric_data_id: DataId,
    pub k8s_event_data_id: DataId,
    pub status: String,
}

impl BcsClusterInfo {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }

    /// The cluster's data sources. Zero marks a data source that was never created.
    pub fn data_ids(&self) -> impl Iterator<Item = DataId> {
        [
            self.k8s_metric_data_id,
            self.custom_metric_data_id,
            self.k8s_event_data_id,
        ]
        .into_iter()
        .filter(|id| id.as_u32() != 0)
    }
}
