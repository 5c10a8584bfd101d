use std::sync::Arc;

use spacemeta_id::{DataId, SpaceKey, SpaceType};

use super::{PartialRoutes, PassKind, RoutingResolver};
use crate::{Result, filter::TenantKey, slice::TableSlice};

/// Business spaces see every table granted to them and the platform tables of their scope,
/// decided on the business id.
pub(super) async fn resolve(
    resolver: &RoutingResolver,
    space: &SpaceKey,
) -> Result<Vec<PartialRoutes>> {
    let grants = resolver.catalog().space_data_sources(space, None).await?;
    let explicit_grants = grants
        .iter()
        .filter(|g| !g.from_authorization)
        .map(|g| g.data_id)
        .collect();

    let mut data_ids: Vec<DataId> = grants.iter().map(|g| g.data_id).collect();
    data_ids.extend(
        resolver
            .catalog()
            .platform_data_sources(&[SpaceType::Business, SpaceType::All])
            .await?
            .into_iter()
            .map(|d| d.data_id),
    );

    let slice = TableSlice::load(resolver.catalog(), &data_ids).await?;
    let key = TenantKey::Business(Arc::clone(&space.space_id));
    Ok(vec![PartialRoutes::new(
        PassKind::Granted,
        resolver.decide_slice(space, &slice, &explicit_grants, &key, |_| true),
    )])
}
