//! Building blocks for [`clap`]-driven configs.
pub mod cache;
pub mod routing;
