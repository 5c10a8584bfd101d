use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use itertools::Itertools;
use spacemeta_cache::SharedCache;
use spacemeta_catalog::CatalogReader;
use spacemeta_id::{SpaceKey, SpaceType, TableId};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info};

use crate::{
    Result, RouterConfig,
    filter::SpaceRoutes,
    index::{self, metrics_since},
    publisher::CachePublisher,
    resolver::RoutingResolver,
    slice::TableSlice,
};

/// Space types refreshed by a full run.
const RESOLVABLE_SPACE_TYPES: [SpaceType; 3] = [
    SpaceType::Business,
    SpaceType::ProjectGroup,
    SpaceType::SaasBound,
];

/// Outcome of [`SpaceRouter::resolve_and_publish_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub resolved: usize,
    pub failed: usize,
}

/// Resolves the routes of spaces and keeps the shared cache up to date with them.
#[derive(Debug, Clone)]
pub struct SpaceRouter {
    inner: Arc<RouterInner>,
}

#[derive(Debug)]
struct RouterInner {
    config: Arc<RouterConfig>,
    resolver: RoutingResolver,
    publisher: CachePublisher,
}

impl SpaceRouter {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        cache: Arc<dyn SharedCache>,
        config: RouterConfig,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            inner: Arc::new(RouterInner {
                resolver: RoutingResolver::new(catalog, Arc::clone(&config)),
                publisher: CachePublisher::new(cache, config.cache_keys.clone()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Compute the routes of `space` without publishing them.
    pub async fn resolve(&self, space: &SpaceKey) -> Result<SpaceRoutes> {
        self.inner.resolver.resolve(space).await
    }

    /// Resolve the space given by its type and id, publish its routes and refresh the indexes
    /// of the tables it is routed to.
    pub async fn resolve_and_publish(
        &self,
        space_type: &str,
        space_id: &str,
    ) -> Result<SpaceRoutes> {
        let space = SpaceKey::try_new(space_type, space_id)?;
        self.resolve_and_publish_space(&space).await
    }

    pub async fn resolve_and_publish_space(&self, space: &SpaceKey) -> Result<SpaceRoutes> {
        let routes = self.resolve(space).await?;
        self.inner.publisher.publish_routes(space, &routes).await?;

        let table_ids: Vec<TableId> = routes.keys().cloned().collect();
        self.refresh_indexes(&table_ids).await?;
        Ok(routes)
    }

    /// Resolve and publish every business, project group and SaaS space.
    ///
    /// A space that fails is logged and counted, the others are still published. The indexes
    /// of every active time-series table are refreshed once all spaces are done.
    pub async fn resolve_and_publish_all(&self) -> Result<BatchSummary> {
        let catalog = self.inner.resolver.catalog();
        let mut spaces = vec![];
        for space_type in RESOLVABLE_SPACE_TYPES {
            spaces.extend(
                catalog
                    .list_spaces(Some(space_type))
                    .await?
                    .iter()
                    .map(|s| s.key()),
            );
        }
        info!(n_spaces = spaces.len(), "resolving all spaces");

        let sem = Arc::new(Semaphore::new(self.inner.config.concurrency.get()));
        let mut js = JoinSet::new();
        for space in spaces {
            let sem = Arc::clone(&sem);
            let router = self.clone();
            js.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let res = router.resolve_and_publish_space(&space).await;
                (space, res)
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(res) = js.join_next().await {
            match res {
                Ok((space, Ok(routes))) => {
                    debug!(space = %space, n_tables = routes.len(), "space refreshed");
                    summary.resolved += 1;
                }
                Ok((space, Err(error))) => {
                    error!(space = %space, %error, "failed to refresh space");
                    summary.failed += 1;
                }
                Err(error) => {
                    error!(%error, "space refresh task failed");
                    summary.failed += 1;
                }
            }
        }

        self.refresh_all_indexes().await?;
        info!(
            resolved = summary.resolved,
            failed = summary.failed,
            "resolved all spaces"
        );
        Ok(summary)
    }

    /// Recompute and publish the data label index and table details touching `table_ids`.
    pub async fn refresh_indexes(&self, table_ids: &[TableId]) -> Result<()> {
        let catalog = self.inner.resolver.catalog();
        let slice = TableSlice::load_tables(catalog, table_ids).await?;
        if slice.is_empty() {
            return Ok(());
        }
        debug!(n_tables = slice.len(), "refreshing table indexes");

        let labels: BTreeSet<String> = slice
            .iter()
            .flat_map(|(_, t)| t.table.data_labels())
            .map(ToString::to_string)
            .collect();
        let labels = index::data_labels(catalog, labels).await?;
        self.inner.publisher.publish_data_labels(&labels).await?;

        let since = metrics_since(Utc::now(), self.inner.config.time_series_metric_expiry);
        let details = index::table_details(catalog, &slice, since).await?;
        self.inner.publisher.publish_details(&details).await?;
        Ok(())
    }

    /// Refresh the indexes of every active time-series table.
    pub async fn refresh_all_indexes(&self) -> Result<()> {
        let table_ids: Vec<TableId> = self
            .inner
            .resolver
            .catalog()
            .list_result_tables()
            .await?
            .into_iter()
            .filter(|t| t.is_active() && t.is_time_series() && t.table_id.is_qualified())
            .map(|t| t.table_id)
            .sorted()
            .collect();
        self.refresh_indexes(&table_ids).await
    }
}
