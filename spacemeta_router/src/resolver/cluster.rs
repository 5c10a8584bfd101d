//! Routes contributed by the container clusters a space is bound to.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::{HashMap, HashSet};
use spacemeta_catalog::model::{BcsClusterInfo, ClusterType, DimensionValue};
use spacemeta_id::{ClusterId, DataId, SpaceKey, SpaceType};
use tracing::{debug, warn};

use super::{PartialRoutes, PassKind, RoutingResolver};
use crate::{
    Result,
    filter::{Filter, SpaceRoutes, TableFilter},
    slice::TableSlice,
};

#[derive(Debug, Default)]
pub(super) struct ClusterRoutes {
    pub(super) partials: Vec<PartialRoutes>,
    /// Data ids of every registered cluster, whatever its status and binding.
    pub(super) cluster_data_ids: HashSet<DataId>,
}

/// Cluster bindings of `space`. A binding record that can not be decoded contributes nothing.
async fn bindings(resolver: &RoutingResolver, space: &SpaceKey) -> Result<Vec<DimensionValue>> {
    let mut bindings = vec![];
    for resource in resolver
        .catalog()
        .space_resources(space, SpaceType::Cluster)
        .await?
    {
        match resource.dimensions() {
            Ok(dims) => bindings.extend(dims),
            Err(error) => warn!(
                space = %space,
                %error,
                "invalid cluster dimension values, ignoring binding"
            ),
        }
    }
    Ok(bindings)
}

pub(super) async fn resolve(resolver: &RoutingResolver, space: &SpaceKey) -> Result<ClusterRoutes> {
    let clusters = resolver.catalog().list_bcs_clusters().await?;
    let cluster_data_ids = clusters.iter().flat_map(|c| c.data_ids()).collect();
    let registry: HashMap<ClusterId, BcsClusterInfo> = clusters
        .into_iter()
        .filter(BcsClusterInfo::is_running)
        .map(|c| (c.cluster_id.clone(), c))
        .collect();

    let mut dedicated = BTreeSet::new();
    let mut shared: BTreeMap<ClusterId, BTreeSet<String>> = BTreeMap::new();
    for binding in bindings(resolver, space).await? {
        match binding.cluster_type {
            ClusterType::Dedicated => {
                dedicated.insert(binding.cluster_id);
            }
            ClusterType::Shared => {
                // several bindings of one shared cluster collapse into one set of namespaces
                shared.entry(binding.cluster_id).or_default().extend(
                    binding
                        .namespace
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|ns| !ns.is_empty()),
                );
            }
        }
    }

    let mut dedicated_routes = SpaceRoutes::new();
    for cluster_id in dedicated {
        let filter = TableFilter::single(Filter::cluster(cluster_id.clone(), None));
        let Some(slice) = cluster_slice(resolver, space, &registry, &cluster_id).await? else {
            continue;
        };
        extend_first_wins(
            &mut dedicated_routes,
            RoutingResolver::route_slice(&slice, &filter, |_| true),
        );
    }

    let mut shared_routes = SpaceRoutes::new();
    for (cluster_id, namespaces) in shared {
        if namespaces.is_empty() {
            debug!(space = %space, %cluster_id, "shared cluster without namespaces, skipping");
            continue;
        }
        let filter = TableFilter::new(
            namespaces
                .into_iter()
                .map(|ns| Filter::cluster(cluster_id.clone(), Some(ns)))
                .collect(),
        );
        let Some(slice) = cluster_slice(resolver, space, &registry, &cluster_id).await? else {
            continue;
        };
        extend_first_wins(
            &mut shared_routes,
            RoutingResolver::route_slice(&slice, &filter, |_| true),
        );
    }

    Ok(ClusterRoutes {
        partials: vec![
            PartialRoutes::new(PassKind::DedicatedCluster, dedicated_routes),
            PartialRoutes::new(PassKind::SharedCluster, shared_routes),
        ],
        cluster_data_ids,
    })
}

async fn cluster_slice(
    resolver: &RoutingResolver,
    space: &SpaceKey,
    registry: &HashMap<ClusterId, BcsClusterInfo>,
    cluster_id: &ClusterId,
) -> Result<Option<TableSlice>> {
    let Some(cluster) = registry.get(cluster_id) else {
        warn!(space = %space, %cluster_id, "bound cluster is not registered or not running");
        return Ok(None);
    };
    let data_ids: Vec<DataId> = cluster.data_ids().collect();
    Ok(Some(TableSlice::load(resolver.catalog(), &data_ids).await?))
}

fn extend_first_wins(routes: &mut SpaceRoutes, more: SpaceRoutes) {
    for (table_id, filter) in more {
        routes.entry(table_id).or_insert(filter);
    }
}
