//! Storage layer: one JSON file per registry symbol, named by content hash.

mod cache;
mod error;

pub use cache::{CacheStats, RegistryCache, cache_key};
pub use error::StoreError;
