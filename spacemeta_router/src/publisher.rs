use std::sync::Arc;

use serde::Serialize;
use spacemeta_cache::{CacheKeys, CacheKind, SharedCache};
use spacemeta_id::SpaceKey;
use tracing::{debug, info};

use crate::{
    Error, Result,
    filter::SpaceRoutes,
    index::{DataLabelIndex, TableDetails},
};

/// Writes resolved routes and indexes into the shared cache.
///
/// Every written field is announced on the channel of its hash, with the field name as message,
/// once the write succeeded.
#[derive(Debug, Clone)]
pub struct CachePublisher {
    cache: Arc<dyn SharedCache>,
    keys: CacheKeys,
}

impl CachePublisher {
    pub fn new(cache: Arc<dyn SharedCache>, keys: CacheKeys) -> Self {
        Self { cache, keys }
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    /// Publish the routes of `space`. An empty map is published as `{}`.
    pub async fn publish_routes(&self, space: &SpaceKey, routes: &SpaceRoutes) -> Result<()> {
        let uid = space.uid();
        self.write(CacheKind::SpaceToResultTable, &uid, "routes", routes)
            .await?;
        info!(space = %uid, n_tables = routes.len(), "published space routes");
        Ok(())
    }

    pub async fn publish_data_labels(&self, index: &DataLabelIndex) -> Result<()> {
        for (label, tables) in index {
            self.write(CacheKind::DataLabelToResultTable, label, "data label", tables)
                .await?;
        }
        if !index.is_empty() {
            info!(n_labels = index.len(), "published data labels");
        }
        Ok(())
    }

    pub async fn publish_details(&self, details: &TableDetails) -> Result<()> {
        for (table_id, detail) in details {
            self.write(
                CacheKind::ResultTableDetail,
                table_id.as_str(),
                "table detail",
                detail,
            )
            .await?;
        }
        if !details.is_empty() {
            info!(n_tables = details.len(), "published table details");
        }
        Ok(())
    }

    async fn write(
        &self,
        kind: CacheKind,
        field: &str,
        what: &'static str,
        value: &(impl Serialize + Sync),
    ) -> Result<()> {
        let value =
            serde_json::to_string(value).map_err(|source| Error::Serialize { what, source })?;
        let key = self.keys.key(kind);
        self.cache.set(&key, field, value).await?;
        self.cache.publish(&self.keys.channel(kind), field).await?;
        debug!(%key, field, "published cache field");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;
    use spacemeta_cache::InMemoryCache;
    use spacemeta_id::TableId;

    use super::*;
    use crate::filter::{Filter, TableFilter};

    fn publisher() -> (Arc<InMemoryCache>, CachePublisher) {
        let cache = Arc::new(InMemoryCache::new());
        let publisher = CachePublisher::new(
            Arc::clone(&cache) as Arc<dyn SharedCache>,
            CacheKeys::new("test:spaces"),
        );
        (cache, publisher)
    }

    #[test_log::test(tokio::test)]
    async fn routes_are_written_then_announced() {
        let (cache, publisher) = publisher();
        let mut rx = cache.subscribe("test:spaces:space_to_result_table:channel");

        let space = SpaceKey::business("2");
        let routes = SpaceRoutes::from([
            (
                TableId::from("system.cpu"),
                TableFilter::single(Filter::biz("2")),
            ),
            (TableId::from("a.b"), TableFilter::unfiltered()),
        ]);
        publisher.publish_routes(&space, &routes).await.unwrap();

        assert_eq!(
            cache
                .get("test:spaces:space_to_result_table", "bkcc__2")
                .as_deref(),
            Some(r#"{"a.b":{"filters":[]},"system.cpu":{"filters":[{"bk_biz_id":"2"}]}}"#)
        );
        assert_eq!(rx.recv().await.unwrap(), "bkcc__2");
    }

    #[tokio::test]
    async fn empty_routes_replace_stale_ones() {
        let (cache, publisher) = publisher();
        let space = SpaceKey::project("demo");
        let routes = SpaceRoutes::from([(TableId::from("a.b"), TableFilter::unfiltered())]);
        publisher.publish_routes(&space, &routes).await.unwrap();
        publisher
            .publish_routes(&space, &SpaceRoutes::new())
            .await
            .unwrap();

        assert_eq!(
            cache
                .get("test:spaces:space_to_result_table", "bkci__demo")
                .as_deref(),
            Some("{}")
        );
        assert_eq!(cache.published().len(), 2);
    }

    #[tokio::test]
    async fn one_announcement_per_label() {
        let (cache, publisher) = publisher();
        let index = DataLabelIndex::from([
            (
                "cpu".to_string(),
                BTreeSet::from([TableId::from("b.cpu"), TableId::from("a.cpu")]),
            ),
            ("gone".to_string(), BTreeSet::new()),
        ]);
        publisher.publish_data_labels(&index).await.unwrap();

        let key = "test:spaces:data_label_to_result_table";
        assert_eq!(cache.get(key, "cpu").as_deref(), Some(r#"["a.cpu","b.cpu"]"#));
        assert_eq!(cache.get(key, "gone").as_deref(), Some("[]"));
        assert_eq!(
            cache.published(),
            vec![
                (format!("{key}:channel"), "cpu".to_string()),
                (format!("{key}:channel"), "gone".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn write_failure_is_returned_and_nothing_announced() {
        let (cache, publisher) = publisher();
        cache.set_fail_writes(true);

        let err = publisher
            .publish_routes(&SpaceKey::business("2"), &SpaceRoutes::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Cache(spacemeta_cache::Error::Write { .. })
        ));
        assert!(cache.published().is_empty());
    }
}
