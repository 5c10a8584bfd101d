//! Classification of a result table by how its rows are laid out in physical storage.

use serde::{Deserialize, Serialize};
use spacemeta_catalog::model::{EtlConfig, SchemaType};

/// Physical storage shape of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    /// Fixed schema, one table shared by every tenant writing it.
    #[serde(rename = "bk_traditional_measurement")]
    Traditional,
    /// Free schema with generic metric name and value columns.
    #[serde(rename = "bk_exporter")]
    Exporter,
    /// One measurement per metric.
    #[serde(rename = "bk_split_measurement")]
    Split,
    /// Free schema with dedicated typed metric columns.
    #[serde(rename = "bk_standard_v2_time_series")]
    Standardized,
}

impl MeasurementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traditional => "bk_traditional_measurement",
            Self::Exporter => "bk_exporter",
            Self::Split => "bk_split_measurement",
            Self::Standardized => "bk_standard_v2_time_series",
        }
    }
}

impl std::fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a table. Rules are applied in order, the first match wins.
pub fn classify(
    schema_type: SchemaType,
    is_split_measurement: bool,
    etl_config: &EtlConfig,
    is_metric_cutter_disabled: bool,
) -> MeasurementKind {
    match schema_type {
        SchemaType::Fixed | SchemaType::Unknown => MeasurementKind::Traditional,
        SchemaType::Free if is_split_measurement => MeasurementKind::Split,
        SchemaType::Free if *etl_config != EtlConfig::StandardV2TimeSeries => {
            MeasurementKind::Exporter
        }
        // while the cutter is active metric and value columns stay generic
        SchemaType::Free if !is_metric_cutter_disabled => MeasurementKind::Exporter,
        SchemaType::Free => MeasurementKind::Standardized,
    }
}

/// Interpret a boolean catalog option, stored either as a JSON bool or as a string.
pub(crate) fn option_enabled(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}
