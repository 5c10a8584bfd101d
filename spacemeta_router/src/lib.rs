//! Resolution of the tables every space may query, and propagation of the result to the shared
//! routing cache.
//!
//! For every space the router computes a map of `table_id -> filters`. A table that mixes the
//! rows of several tenants is always routed with the filter selecting the rows of the requesting
//! space. The maps are written to the shared cache together with two indexes: the tables behind
//! every data label, and the physical storage detail of every time-series table.

use spacemeta_id::SpaceType;

mod batched;
pub mod classifier;
pub mod config;
pub mod filter;
mod index;
pub mod ownership;
mod publisher;
mod resolver;
mod service;
mod slice;

pub use classifier::MeasurementKind;
pub use config::RouterConfig;
pub use filter::{Filter, FilterDecider, SpaceRoutes, TableFilter, TenantKey};
pub use index::{DataLabelIndex, TableDetail, TableDetails};
pub use publisher::CachePublisher;
pub use resolver::RoutingResolver;
pub use service::{BatchSummary, SpaceRouter};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("catalog error: {0}")]
    Catalog(#[from] spacemeta_catalog::Error),

    #[error("cache error: {0}")]
    Cache(#[from] spacemeta_cache::Error),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("invalid space: {0}")]
    Id(#[from] spacemeta_id::Error),

    #[error("routes can not be resolved for space type [{0}]")]
    UnsupportedSpaceType(SpaceType),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
