//! Cache module for amortizing repeated content loads
//!
//! This module provides a TTL cache with pluggable storage (in-memory or
//! on-disk JSON files). When a refresh fails, the cache falls back to the
//! last stored value instead of surfacing the error, so content stays
//! available while the upstream API is unreachable.

mod clock;
mod storage;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{DiskStorage, MemoryStorage, Storage, StorageError};
pub use ttl::{CacheError, TtlCache, DEFAULT_TTL};

/// Builds a `Cache-Control` header value for content served from the cache
///
/// `max_age` applies to both browsers and shared caches; `stale_while_revalidate`
/// lets a CDN keep serving the old copy while it refetches.
pub fn cache_control_header(max_age: u64, stale_while_revalidate: u64) -> String {
    format!(
        "public, max-age={0}, s-maxage={0}, stale-while-revalidate={1}",
        max_age, stale_while_revalidate
    )
}

/// Header value using the default 5 minute max-age and 1 hour revalidation window
pub fn default_cache_control_header() -> String {
    cache_control_header(300, 3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_control_header_format() {
        assert_eq!(
            cache_control_header(60, 120),
            "public, max-age=60, s-maxage=60, stale-while-revalidate=120"
        );
    }

    #[test]
    fn test_default_cache_control_header() {
        let header = default_cache_control_header();
        assert!(header.contains("max-age=300"));
        assert!(header.contains("stale-while-revalidate=3600"));
    }
}
