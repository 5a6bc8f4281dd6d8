//! In-memory caching for expensive upstream lookups
//!
//! Each cached operation owns its own [`TtlCache`]; caches never share key
//! space.

pub mod key;
pub mod store;

use std::time::Duration;

/// Cache TTL configuration per cached operation
pub struct CacheTtl;

impl CacheTtl {
    // Client list changes rarely; one snapshot per hour
    pub const CLIENTS: Duration = Duration::from_secs(60 * 60); // 1 hr

    // OMDb free tier is rate limited per day
    pub const MOVIE_SEARCH: Duration = Duration::from_secs(60 * 60); // 1 hr
}

/// Maximum entry count per cached operation
pub struct CacheCapacity;

impl CacheCapacity {
    pub const CLIENTS: usize = 1;
    pub const MOVIE_SEARCH: usize = 100;
}

// Re-export main types
pub use key::cache_key;
pub use store::TtlCache;
