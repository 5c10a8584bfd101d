use spacemeta_id::{DataId, SpaceKey};
use tracing::debug;

use super::{PartialRoutes, PassKind, RoutingResolver, cluster};
use crate::{
    Result,
    filter::{SpaceRoutes, TableFilter},
    slice::TableSlice,
};

/// SaaS spaces see the tables of their clusters, plus every table of their own grants outside
/// any cluster. A SaaS space has no tenant dimension of its own, so granted tables are routed
/// unfiltered.
pub(super) async fn resolve(
    resolver: &RoutingResolver,
    space: &SpaceKey,
) -> Result<Vec<PartialRoutes>> {
    let clusters = cluster::resolve(resolver, space).await?;
    let mut partials = clusters.partials;

    let data_ids: Vec<DataId> = resolver
        .catalog()
        .space_data_sources(space, Some(false))
        .await?
        .into_iter()
        .map(|g| g.data_id)
        .filter(|id| !clusters.cluster_data_ids.contains(id))
        .collect();
    let slice = TableSlice::load(resolver.catalog(), &data_ids).await?;
    debug!(space = %space, n_tables = slice.len(), "saas residual tables");

    let residual: SpaceRoutes = slice
        .iter()
        .map(|(table_id, _)| (table_id.clone(), TableFilter::unfiltered()))
        .collect();
    partials.push(PartialRoutes::new(PassKind::Residual, residual));

    Ok(partials)
}
