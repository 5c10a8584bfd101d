//! The routable tables reachable from a set of data sources.

use std::{collections::BTreeMap, sync::Arc};

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use spacemeta_catalog::{
    Result,
    model::{DataSource, ResultTable},
};
use spacemeta_id::{DataId, TableId};
use tracing::{debug, warn};

use crate::{
    batched::BatchedCatalog,
    classifier::{MeasurementKind, classify, option_enabled},
};

pub(crate) const OPTION_IS_SPLIT_MEASUREMENT: &str = "is_split_measurement";
pub(crate) const OPTION_DISABLE_METRIC_CUTTER: &str = "disable_metric_cutter";

#[derive(Debug, Clone)]
pub(crate) struct SliceTable {
    pub(crate) table: ResultTable,
    pub(crate) data_source: Arc<DataSource>,
    pub(crate) kind: MeasurementKind,
}

/// Qualified, enabled tables keyed by table id, each with the data source writing it and its
/// measurement kind.
#[derive(Debug, Default)]
pub(crate) struct TableSlice {
    tables: BTreeMap<TableId, SliceTable>,
}

impl TableSlice {
    pub(crate) async fn load(catalog: &BatchedCatalog, data_ids: &[DataId]) -> Result<Self> {
        let data_ids: Vec<DataId> = data_ids.iter().copied().sorted().dedup().collect();
        if data_ids.is_empty() {
            return Ok(Self::default());
        }

        let mut table_data_ids = HashMap::new();
        for link in catalog.data_source_result_tables(&data_ids).await? {
            if !link.table_id.is_qualified() {
                debug!(table_id = %link.table_id, "skipping unqualified table id");
                continue;
            }
            table_data_ids.insert(link.table_id, link.data_id);
        }
        if table_data_ids.is_empty() {
            return Ok(Self::default());
        }

        let table_ids: Vec<TableId> = table_data_ids.keys().cloned().sorted().collect();
        let tables: HashMap<TableId, ResultTable> = catalog
            .result_tables(&table_ids)
            .await?
            .into_iter()
            .map(|t| (t.table_id.clone(), t))
            .collect();

        let linked_data_ids: Vec<DataId> = table_data_ids
            .values()
            .copied()
            .sorted()
            .dedup()
            .collect();
        let data_sources: HashMap<DataId, Arc<DataSource>> = catalog
            .data_sources(&linked_data_ids)
            .await?
            .into_iter()
            .map(|d| (d.data_id, Arc::new(d)))
            .collect();

        let split_tables: HashSet<TableId> = catalog
            .result_table_options(&table_ids, OPTION_IS_SPLIT_MEASUREMENT)
            .await?
            .into_iter()
            .filter(|o| option_enabled(&o.value))
            .map(|o| o.table_id)
            .collect();
        let cutter_disabled: HashSet<DataId> = catalog
            .data_source_options(&linked_data_ids, OPTION_DISABLE_METRIC_CUTTER)
            .await?
            .into_iter()
            .filter(|o| option_enabled(&o.value))
            .map(|o| o.data_id)
            .collect();

        let mut slice = Self::default();
        for (table_id, data_id) in table_data_ids.into_iter().sorted() {
            let Some(table) = tables.get(&table_id) else {
                warn!(%table_id, %data_id, "result table not found, dropping table");
                continue;
            };
            if !table.is_active() {
                debug!(%table_id, "skipping disabled or deleted table");
                continue;
            }
            let Some(data_source) = data_sources.get(&data_id) else {
                warn!(%table_id, %data_id, "data source not found, dropping table");
                continue;
            };

            let kind = classify(
                table.schema_type,
                split_tables.contains(&table_id),
                &data_source.etl_config,
                cutter_disabled.contains(&data_id),
            );
            slice.tables.insert(
                table_id,
                SliceTable {
                    table: table.clone(),
                    data_source: Arc::clone(data_source),
                    kind,
                },
            );
        }
        Ok(slice)
    }

    /// The routable tables among `table_ids`, loaded through the data sources writing them.
    pub(crate) async fn load_tables(
        catalog: &BatchedCatalog,
        table_ids: &[TableId],
    ) -> Result<Self> {
        let table_ids: HashSet<&TableId> = table_ids.iter().collect();
        let lookup: Vec<TableId> = table_ids.iter().map(|t| (*t).clone()).sorted().collect();
        let data_ids: Vec<DataId> = catalog
            .data_source_result_tables_by_table(&lookup)
            .await?
            .into_iter()
            .map(|l| l.data_id)
            .collect();

        let mut slice = Self::load(catalog, &data_ids).await?;
        slice.tables.retain(|table_id, _| table_ids.contains(table_id));
        Ok(slice)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TableId, &SliceTable)> {
        self.tables.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use serde_json::json;
    use spacemeta_catalog::{
        MemCatalog,
        model::{EtlConfig, SchemaType},
    };

    use super::*;

    fn batched(catalog: MemCatalog) -> BatchedCatalog {
        BatchedCatalog::new(Arc::new(catalog), NonZeroUsize::new(2).unwrap())
    }

    #[test_log::test(tokio::test)]
    async fn loads_and_classifies() {
        let catalog = MemCatalog::new();
        let ts = DataId::new(50010);
        catalog.add_data_source(DataSource::new(ts, EtlConfig::StandardV2TimeSeries));
        catalog.add_data_source_option(ts, OPTION_DISABLE_METRIC_CUTTER, json!(true));
        catalog.add_result_table(ResultTable::new(
            "2_bkmonitor_time_series_50010.base",
            SchemaType::Free,
        ));
        catalog.link_result_table(ts, "2_bkmonitor_time_series_50010.base");

        let host = DataId::new(1001);
        catalog.add_data_source(DataSource::new(host, EtlConfig::Standard));
        for table in ["system.cpu_summary", "system.mem", "system.disk"] {
            catalog.add_result_table(ResultTable::new(table, SchemaType::Fixed));
            catalog.link_result_table(host, table);
        }
        catalog.add_result_table(ResultTable::new("script_a.group", SchemaType::Free));
        catalog.add_result_table_option(
            "script_a.group",
            OPTION_IS_SPLIT_MEASUREMENT,
            json!(true),
        );
        catalog.link_result_table(host, "script_a.group");

        let slice = TableSlice::load(&batched(catalog), &[ts, host, ts])
            .await
            .unwrap();
        assert_eq!(slice.len(), 5);
        let kinds: Vec<_> = slice.iter().map(|(t, s)| (t.as_str(), s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (
                    "2_bkmonitor_time_series_50010.base",
                    MeasurementKind::Standardized
                ),
                ("script_a.group", MeasurementKind::Split),
                ("system.cpu_summary", MeasurementKind::Traditional),
                ("system.disk", MeasurementKind::Traditional),
                ("system.mem", MeasurementKind::Traditional),
            ]
        );
    }

    #[test_log::test(tokio::test)]
    async fn drops_unroutable_tables() {
        let catalog = MemCatalog::new();
        let id = DataId::new(1001);
        catalog.add_data_source(DataSource::new(id, EtlConfig::Standard));

        // no dot in the id
        catalog.add_result_table(ResultTable::new("cpu_summary", SchemaType::Fixed));
        catalog.link_result_table(id, "cpu_summary");
        // disabled
        catalog.add_result_table(ResultTable {
            is_enable: false,
            ..ResultTable::new("system.disabled", SchemaType::Fixed)
        });
        catalog.link_result_table(id, "system.disabled");
        // deleted
        catalog.add_result_table(ResultTable {
            is_deleted: true,
            ..ResultTable::new("system.deleted", SchemaType::Fixed)
        });
        catalog.link_result_table(id, "system.deleted");
        // no table row
        catalog.link_result_table(id, "system.missing");
        // no data source row
        catalog.add_result_table(ResultTable::new("system.orphan", SchemaType::Fixed));
        catalog.link_result_table(DataId::new(9999), "system.orphan");
        // routable
        catalog.add_result_table(ResultTable::new("system.cpu", SchemaType::Fixed));
        catalog.link_result_table(id, "system.cpu");

        let slice = TableSlice::load(&batched(catalog), &[id, DataId::new(9999)])
            .await
            .unwrap();
        let tables: Vec<_> = slice.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tables, vec!["system.cpu"]);
    }

    #[test_log::test(tokio::test)]
    async fn load_selected_tables() {
        let catalog = MemCatalog::new();
        let id = DataId::new(1001);
        catalog.add_data_source(DataSource::new(id, EtlConfig::Standard));
        for table in ["system.cpu", "system.mem"] {
            catalog.add_result_table(ResultTable::new(table, SchemaType::Fixed));
            catalog.link_result_table(id, table);
        }

        let slice = TableSlice::load_tables(
            &batched(catalog),
            &[TableId::from("system.mem"), TableId::from("system.unknown")],
        )
        .await
        .unwrap();
        let tables: Vec<_> = slice.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tables, vec!["system.mem"]);
    }

    #[tokio::test]
    async fn empty_input() {
        let slice = TableSlice::load(&batched(MemCatalog::new()), &[])
            .await
            .unwrap();
        assert!(slice.is_empty());
    }
}
