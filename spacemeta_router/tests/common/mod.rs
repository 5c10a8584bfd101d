use std::sync::Arc;

use serde_json::json;
use spacemeta_cache::{CacheKind, InMemoryCache, SharedCache};
use spacemeta_catalog::{
    CatalogReader, MemCatalog,
    model::{
        BcsClusterInfo, DataSource, EtlConfig, InfluxdbStorage, ResultTable, SchemaType, Space,
        SpaceDataSource, SpaceResource,
    },
};
use spacemeta_id::{ClusterId, DataId, SpaceKey, SpaceType, TableId};
use spacemeta_router::{RouterConfig, SpaceRouter};

pub const KEY_PREFIX: &str = "test:spaces";

/// A [`SpaceRouter`] over an in-memory catalog and cache.
#[derive(Debug)]
pub struct TestContext {
    pub catalog: Arc<MemCatalog>,
    pub cache: Arc<InMemoryCache>,
    pub router: SpaceRouter,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let catalog = Arc::new(MemCatalog::new());
        let cache = Arc::new(InMemoryCache::new());
        let router = SpaceRouter::new(
            Arc::clone(&catalog) as Arc<dyn CatalogReader>,
            Arc::clone(&cache) as Arc<dyn SharedCache>,
            RouterConfig {
                cache_keys: spacemeta_cache::CacheKeys::new(KEY_PREFIX),
                ..config
            },
        );
        Self {
            catalog,
            cache,
            router,
        }
    }

    /// Another router over the same catalog and cache.
    pub fn router_with(&self, config: RouterConfig) -> SpaceRouter {
        SpaceRouter::new(
            Arc::clone(&self.catalog) as Arc<dyn CatalogReader>,
            Arc::clone(&self.cache) as Arc<dyn SharedCache>,
            RouterConfig {
                cache_keys: spacemeta_cache::CacheKeys::new(KEY_PREFIX),
                ..config
            },
        )
    }

    pub fn key(kind: CacheKind) -> String {
        format!("{KEY_PREFIX}:{}", kind.as_str())
    }

    /// The published value of `field` in the hash of `kind`, parsed.
    pub fn cached(&self, kind: CacheKind, field: &str) -> Option<serde_json::Value> {
        self.cache
            .get(&Self::key(kind), field)
            .map(|v| serde_json::from_str(&v).unwrap())
    }

    pub fn space(&self, space: &SpaceKey) {
        self.catalog
            .add_space(Space::new(space, format!("space {space}")));
    }

    /// Register a data source and link `tables` to it.
    pub fn data_source(&self, data_source: DataSource, tables: &[(&str, SchemaType)]) -> DataId {
        let data_id = data_source.data_id;
        self.catalog.add_data_source(data_source);
        for (table_id, schema_type) in tables {
            self.catalog
                .add_result_table(ResultTable::new(*table_id, *schema_type));
            self.catalog.link_result_table(data_id, *table_id);
        }
        data_id
    }

    pub fn grant(&self, space: &SpaceKey, data_id: DataId, from_authorization: bool) {
        self.catalog.add_space_data_source(SpaceDataSource {
            space: space.clone(),
            data_id,
            from_authorization,
        });
    }

    pub fn link_business(&self, project: &SpaceKey, bk_biz_id: &str) {
        self.catalog.add_space_resource(SpaceResource {
            space: project.clone(),
            resource_type: SpaceType::Business,
            resource_id: Some(bk_biz_id.to_string()),
            dimension_values: String::new(),
        });
    }

    pub fn bind_clusters(&self, space: &SpaceKey, dimension_values: serde_json::Value) {
        self.catalog.add_space_resource(SpaceResource {
            space: space.clone(),
            resource_type: SpaceType::Cluster,
            resource_id: None,
            dimension_values: dimension_values.to_string(),
        });
    }

    /// Register a running cluster collecting into `data_id`, writing `table_id`.
    pub fn cluster(&self, cluster_id: &str, data_id: u32, table_id: &str) {
        self.cluster_with_status(cluster_id, data_id, table_id, "running");
    }

    pub fn cluster_with_status(
        &self,
        cluster_id: &str,
        data_id: u32,
        table_id: &str,
        status: &str,
    ) {
        let data_id = DataId::new(data_id);
        self.data_source(
            DataSource::new(data_id, EtlConfig::StandardV2TimeSeries),
            &[(table_id, SchemaType::Fixed)],
        );
        self.catalog.add_bcs_cluster(BcsClusterInfo {
            cluster_id: ClusterId::from(cluster_id),
            k8s_metric_data_id: data_id,
            custom_metric_data_id: DataId::new(0),
            k8s_event_data_id: DataId::new(0),
            status: status.to_string(),
        });
    }

    pub fn storage(&self, table_id: &str) {
        let (database, measurement) = table_id.split_once('.').unwrap();
        self.catalog.add_influxdb_storage(InfluxdbStorage {
            table_id: TableId::from(table_id),
            storage_cluster_id: 1,
            database: database.to_string(),
            real_table_name: measurement.to_string(),
            proxy_cluster_name: "default".to_string(),
            partition_tags: String::new(),
        });
    }
}

/// A data source created by `owner`.
pub fn owned(data_id: u32, etl_config: EtlConfig, owner: &SpaceKey) -> DataSource {
    DataSource {
        space_uid: Some(owner.clone()),
        ..DataSource::new(DataId::new(data_id), etl_config)
    }
}

/// A platform data source visible to the spaces of `scope`.
pub fn platform(data_id: u32, etl_config: EtlConfig, scope: SpaceType) -> DataSource {
    DataSource {
        is_platform_data_id: true,
        space_type_id: scope,
        ..DataSource::new(DataId::new(data_id), etl_config)
    }
}

/// A custom time-series data source whose metrics stay in one table.
pub fn standardized(ctx: &TestContext, data_source: DataSource, table_id: &str) -> DataId {
    let data_id = ctx.data_source(data_source, &[(table_id, SchemaType::Free)]);
    ctx.catalog
        .add_data_source_option(data_id, "disable_metric_cutter", json!(true));
    data_id
}
