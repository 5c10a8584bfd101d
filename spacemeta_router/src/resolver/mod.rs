//! Resolution of the routes of one space.
//!
//! Every space topology is resolved as a set of passes. A pass produces the routes of the tables
//! it is responsible for; passes are merged in [`PassKind`] order and the first pass routing a
//! table decides its filters.

use std::sync::Arc;

use hashbrown::HashSet;
use spacemeta_catalog::CatalogReader;
use spacemeta_id::{DataId, SpaceKey, SpaceType, TableId};
use tracing::debug;

use crate::{
    Error, Result, RouterConfig,
    batched::BatchedCatalog,
    filter::{FilterDecider, SpaceRoutes, TableFilter, TenantKey},
    ownership,
    slice::TableSlice,
};

mod business;
mod cluster;
mod project;
mod saas;

/// Resolution passes, in merge priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum PassKind {
    /// System tables seen through the linked business of a project group.
    LinkedBusiness,
    DedicatedCluster,
    SharedCluster,
    /// Platform data sources scoped to the space type.
    Platform,
    /// Data sources granted to the space.
    Granted,
    /// Granted data sources of a SaaS space outside its clusters.
    Residual,
}

#[derive(Debug)]
pub(crate) struct PartialRoutes {
    pub(crate) kind: PassKind,
    pub(crate) routes: SpaceRoutes,
}

impl PartialRoutes {
    pub(crate) fn new(kind: PassKind, routes: SpaceRoutes) -> Self {
        Self { kind, routes }
    }
}

/// Merge partial results, the highest priority pass routing a table wins.
pub(crate) fn merge(partials: impl IntoIterator<Item = PartialRoutes>) -> SpaceRoutes {
    let mut partials: Vec<_> = partials.into_iter().collect();
    partials.sort_by_key(|p| p.kind);

    let mut merged = SpaceRoutes::new();
    for partial in partials {
        for (table_id, filter) in partial.routes {
            merged.entry(table_id).or_insert(filter);
        }
    }
    merged
}

/// Computes the routes of a space from the catalog.
#[derive(Debug)]
pub struct RoutingResolver {
    catalog: BatchedCatalog,
    config: Arc<RouterConfig>,
    decider: FilterDecider,
}

impl RoutingResolver {
    pub fn new(catalog: Arc<dyn CatalogReader>, config: Arc<RouterConfig>) -> Self {
        Self {
            catalog: BatchedCatalog::new(catalog, config.catalog_batch_size),
            decider: FilterDecider::new(config.skip_filter_for_owned_data_sources),
            config,
        }
    }

    pub(crate) fn catalog(&self) -> &BatchedCatalog {
        &self.catalog
    }

    pub(crate) fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Resolve the routes of `space`.
    ///
    /// Tables the space can not be routed to are left out; only catalog read failures are
    /// returned as errors.
    pub async fn resolve(&self, space: &SpaceKey) -> Result<SpaceRoutes> {
        let partials = match space.space_type {
            SpaceType::Business => business::resolve(self, space).await?,
            SpaceType::ProjectGroup => project::resolve(self, space).await?,
            SpaceType::SaasBound => saas::resolve(self, space).await?,
            space_type @ (SpaceType::Cluster | SpaceType::All) => {
                return Err(Error::UnsupportedSpaceType(space_type));
            }
        };

        for partial in &partials {
            debug!(
                space = %space,
                pass = ?partial.kind,
                n_tables = partial.routes.len(),
                "resolved pass"
            );
        }

        let mut routes = merge(partials);
        routes.retain(|table_id, _| !self.config.is_reserved_for(table_id, space));
        Ok(routes)
    }

    /// Data ids of the grants of `space` not derived from an authorization.
    async fn explicit_grants(&self, space: &SpaceKey) -> Result<HashSet<DataId>> {
        Ok(self
            .catalog
            .space_data_sources(space, Some(false))
            .await?
            .into_iter()
            .map(|g| g.data_id)
            .collect())
    }

    /// Route every table of `slice` accepted by `include`, with the filter the decider
    /// requires for `space` under `key`.
    fn decide_slice(
        &self,
        space: &SpaceKey,
        slice: &TableSlice,
        explicit_grants: &HashSet<DataId>,
        key: &TenantKey,
        include: impl Fn(&TableId) -> bool,
    ) -> SpaceRoutes {
        slice
            .iter()
            .filter(|(table_id, _)| include(table_id))
            .map(|(table_id, table)| {
                let ownership = ownership::analyze(space, &table.data_source, explicit_grants);
                let filter = self
                    .decider
                    .decide(table.kind, &table.data_source, ownership, key);
                (table_id.clone(), filter)
            })
            .collect()
    }

    /// Route every table of `slice` accepted by `include` with the same filter.
    fn route_slice(
        slice: &TableSlice,
        filter: &TableFilter,
        include: impl Fn(&TableId) -> bool,
    ) -> SpaceRoutes {
        slice
            .iter()
            .filter(|(table_id, _)| include(table_id))
            .map(|(table_id, _)| (table_id.clone(), filter.clone()))
            .collect()
    }
}
