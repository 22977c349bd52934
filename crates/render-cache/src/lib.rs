//! Render artifact caching.
//!
//! Provides:
//! - `CacheKey`: fixed-width key derived from a dataset identity and
//!   canonical plot parameters
//! - `RenderCache`: bounded LRU store with single-flight production and
//!   per-dataset invalidation

pub mod cache_key;
pub mod render_cache;

pub use cache_key::CacheKey;
pub use render_cache::{CacheLookup, CacheStats, CacheStatus, RenderCache};
