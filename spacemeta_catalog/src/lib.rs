//! Read side of the relational catalog: row types, the [`CatalogReader`] API and an in-memory
//! implementation.

pub mod interface;
pub mod mem;
pub mod model;

pub use interface::{CatalogReader, Error, Result};
pub use mem::MemCatalog;
