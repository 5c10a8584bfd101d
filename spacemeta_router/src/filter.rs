//! Tenant predicates attached to routed tables, and the decision of when they are required.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use spacemeta_catalog::model::{DataSource, EtlConfig};
use spacemeta_id::{ClusterId, TableId};

use crate::{classifier::MeasurementKind, ownership::Ownership};

/// A tenant predicate. Rows matching any filter of a table are visible to the space.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Biz {
        bk_biz_id: Arc<str>,
    },
    Cluster {
        #[serde(rename = "bcs_cluster_id")]
        cluster_id: ClusterId,
        /// `None` grants the whole cluster.
        namespace: Option<String>,
    },
    Project {
        #[serde(rename = "projectId")]
        project_id: Arc<str>,
    },
}

impl Filter {
    pub fn biz(bk_biz_id: impl AsRef<str>) -> Self {
        Self::Biz {
            bk_biz_id: Arc::from(bk_biz_id.as_ref()),
        }
    }

    pub fn cluster(cluster_id: ClusterId, namespace: Option<String>) -> Self {
        Self::Cluster {
            cluster_id,
            namespace,
        }
    }

    pub fn project(project_id: impl AsRef<str>) -> Self {
        Self::Project {
            project_id: Arc::from(project_id.as_ref()),
        }
    }
}

/// The filters of one routed table. An empty list routes the table without a predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFilter {
    pub filters: Vec<Filter>,
}

impl TableFilter {
    pub fn unfiltered() -> Self {
        Self::default()
    }

    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn single(filter: Filter) -> Self {
        Self {
            filters: vec![filter],
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }
}

/// The resolved routes of one space, keyed and serialized in table id order.
pub type SpaceRoutes = BTreeMap<TableId, TableFilter>;

/// Tenant dimension a pass filters on when a predicate is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantKey {
    Business(Arc<str>),
    Project(Arc<str>),
}

impl TenantKey {
    pub fn filter(&self) -> Filter {
        match self {
            Self::Business(id) => Filter::biz(id),
            Self::Project(id) => Filter::project(id),
        }
    }
}

/// Decides whether the rows of a table must be filtered for the requesting space.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterDecider {
    skip_filter_for_owned_data_sources: bool,
}

impl FilterDecider {
    pub fn new(skip_filter_for_owned_data_sources: bool) -> Self {
        Self {
            skip_filter_for_owned_data_sources,
        }
    }

    pub fn needs_filter(
        &self,
        kind: MeasurementKind,
        data_source: &DataSource,
        ownership: Ownership,
    ) -> bool {
        if self.skip_filter_for_owned_data_sources && ownership.owned_by_space {
            return false;
        }

        match kind {
            MeasurementKind::Traditional => true,
            MeasurementKind::Exporter => !ownership.owned_by_space,
            MeasurementKind::Split if data_source.etl_config == EtlConfig::Exporter => {
                !ownership.owned_by_space
            }
            MeasurementKind::Split | MeasurementKind::Standardized => {
                ownership.is_platform && !ownership.explicit_grant
            }
        }
    }

    /// Route entry for a table, filtering on `key` when required.
    pub fn decide(
        &self,
        kind: MeasurementKind,
        data_source: &DataSource,
        ownership: Ownership,
        key: &TenantKey,
    ) -> TableFilter {
        if self.needs_filter(kind, data_source, ownership) {
            TableFilter::single(key.filter())
        } else {
            TableFilter::unfiltered()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use spacemeta_id::DataId;

    use super::*;

    fn ownership(owned_by_space: bool, is_platform: bool, explicit_grant: bool) -> Ownership {
        Ownership {
            owned_by_space,
            is_platform,
            explicit_grant,
        }
    }

    #[test]
    fn serialized_shapes() {
        let filters = TableFilter::new(vec![
            Filter::biz("2"),
            Filter::cluster("BCS-K8S-00000".into(), None),
            Filter::cluster("BCS-K8S-00001".into(), Some("ns1".to_string())),
            Filter::project("devops"),
        ]);
        assert_eq!(
            serde_json::to_string(&filters).unwrap(),
            r#"{"filters":[{"bk_biz_id":"2"},{"bcs_cluster_id":"BCS-K8S-00000","namespace":null},{"bcs_cluster_id":"BCS-K8S-00001","namespace":"ns1"},{"projectId":"devops"}]}"#
        );

        let back: TableFilter = serde_json::from_value(json!({
            "filters": [{"bcs_cluster_id": "BCS-K8S-00000", "namespace": null}]
        }))
        .unwrap();
        assert_eq!(
            back,
            TableFilter::single(Filter::cluster("BCS-K8S-00000".into(), None))
        );
        assert_eq!(
            serde_json::to_string(&TableFilter::unfiltered()).unwrap(),
            r#"{"filters":[]}"#
        );
    }

    #[test]
    fn traditional_always_filtered() {
        let decider = FilterDecider::default();
        let ds = DataSource::new(DataId::new(1001), EtlConfig::Standard);
        for owned in [false, true] {
            for platform in [false, true] {
                for grant in [false, true] {
                    assert!(decider.needs_filter(
                        MeasurementKind::Traditional,
                        &ds,
                        ownership(owned, platform, grant)
                    ));
                }
            }
        }
    }

    #[test]
    fn exporter_depends_on_ownership() {
        let decider = FilterDecider::default();
        let ds = DataSource::new(DataId::new(1001), EtlConfig::Exporter);

        assert!(!decider.needs_filter(
            MeasurementKind::Exporter,
            &ds,
            ownership(true, true, false)
        ));
        assert!(decider.needs_filter(
            MeasurementKind::Exporter,
            &ds,
            ownership(false, false, true)
        ));
        // split tables of an exporter data source follow the exporter rule
        assert!(decider.needs_filter(
            MeasurementKind::Split,
            &ds,
            ownership(false, false, true)
        ));
    }

    #[test]
    fn standardized_depends_on_platform_and_grant() {
        let decider = FilterDecider::default();
        let ds = DataSource::new(DataId::new(1001), EtlConfig::StandardV2TimeSeries);

        for kind in [MeasurementKind::Standardized, MeasurementKind::Split] {
            assert!(!decider.needs_filter(kind, &ds, ownership(false, false, false)));
            assert!(!decider.needs_filter(kind, &ds, ownership(false, true, true)));
            assert!(decider.needs_filter(kind, &ds, ownership(false, true, false)));
        }
    }

    #[test]
    fn owned_escape_hatch() {
        let ds = DataSource::new(DataId::new(1001), EtlConfig::Standard);
        let owned = ownership(true, true, false);

        assert!(FilterDecider::new(false).needs_filter(MeasurementKind::Traditional, &ds, owned));
        assert!(!FilterDecider::new(true).needs_filter(MeasurementKind::Traditional, &ds, owned));
        // only applies to owned data sources
        assert!(FilterDecider::new(true).needs_filter(
            MeasurementKind::Traditional,
            &ds,
            ownership(false, false, true)
        ));
    }

    #[test]
    fn decide_uses_tenant_key() {
        let decider = FilterDecider::default();
        let ds = DataSource::new(DataId::new(1001), EtlConfig::Standard);
        let key = TenantKey::Project(Arc::from("devops"));

        assert_eq!(
            decider.decide(MeasurementKind::Traditional, &ds, Ownership::default(), &key),
            TableFilter::single(Filter::project("devops"))
        );
    }
}
