//! Project group spaces.
//!
//! A project group sees, in priority order:
//!
//! 1. the system tables of its linked business, filtered by the business id
//! 2. the tables of its dedicated clusters, filtered by cluster
//! 3. the tables of its shared clusters, filtered by cluster and namespace
//! 4. platform tables outside any cluster, decided on the project id
//! 5. the remaining tables granted to the project, decided on the project id

use std::sync::Arc;

use hashbrown::HashSet;
use spacemeta_id::{DataId, SpaceKey, SpaceType};
use tracing::debug;

use super::{PartialRoutes, PassKind, RoutingResolver, cluster};
use crate::{
    Result,
    filter::{Filter, SpaceRoutes, TableFilter, TenantKey},
    slice::TableSlice,
};

pub(super) async fn resolve(
    resolver: &RoutingResolver,
    space: &SpaceKey,
) -> Result<Vec<PartialRoutes>> {
    let mut partials = vec![linked_business(resolver, space).await?];

    let clusters = cluster::resolve(resolver, space).await?;
    partials.extend(clusters.partials);

    let config = resolver.config();
    let excluded = |id: &DataId| {
        clusters.cluster_data_ids.contains(id) || config.project_excluded_data_ids.contains(id)
    };
    let key = TenantKey::Project(Arc::clone(&space.space_id));
    let explicit_grants = resolver.explicit_grants(space).await?;

    let platform_ids: Vec<DataId> = resolver
        .catalog()
        .platform_data_sources(&[SpaceType::ProjectGroup, SpaceType::All])
        .await?
        .into_iter()
        .map(|d| d.data_id)
        .filter(|id| !excluded(id))
        .collect();
    let slice = TableSlice::load(resolver.catalog(), &platform_ids).await?;
    partials.push(PartialRoutes::new(
        PassKind::Platform,
        resolver.decide_slice(space, &slice, &explicit_grants, &key, |_| true),
    ));

    // includes grants derived from cross project authorizations
    let granted_ids: Vec<DataId> = resolver
        .catalog()
        .space_data_sources(space, None)
        .await?
        .into_iter()
        .map(|g| g.data_id)
        .filter(|id| !excluded(id))
        .collect();
    let slice = TableSlice::load(resolver.catalog(), &granted_ids).await?;
    partials.push(PartialRoutes::new(
        PassKind::Granted,
        resolver.decide_slice(space, &slice, &explicit_grants, &key, |table_id| {
            !config.is_system_table(table_id) && !config.is_reserved_for(table_id, space)
        }),
    ));

    Ok(partials)
}

/// System tables of the business the project group is linked to, always filtered by the
/// business id.
async fn linked_business(resolver: &RoutingResolver, space: &SpaceKey) -> Result<PartialRoutes> {
    let resources = resolver
        .catalog()
        .space_resources(space, SpaceType::Business)
        .await?;
    let Some(bk_biz_id) = resources.into_iter().find_map(|r| r.resource_id) else {
        debug!(space = %space, "no linked business");
        return Ok(PartialRoutes::new(PassKind::LinkedBusiness, SpaceRoutes::new()));
    };
    let business = SpaceKey::business(&bk_biz_id);

    let mut data_ids: HashSet<DataId> = resolver
        .catalog()
        .space_data_sources(&business, Some(false))
        .await?
        .into_iter()
        .map(|g| g.data_id)
        .collect();
    data_ids.extend(
        resolver
            .catalog()
            .platform_data_sources(&[SpaceType::Business, SpaceType::All])
            .await?
            .into_iter()
            .map(|d| d.data_id),
    );
    let data_ids: Vec<DataId> = data_ids.into_iter().collect();

    let slice = TableSlice::load(resolver.catalog(), &data_ids).await?;
    let filter = TableFilter::single(Filter::biz(&bk_biz_id));
    let config = resolver.config();
    Ok(PartialRoutes::new(
        PassKind::LinkedBusiness,
        RoutingResolver::route_slice(&slice, &filter, |table_id| {
            config.is_system_table(table_id)
        }),
    ))
}
