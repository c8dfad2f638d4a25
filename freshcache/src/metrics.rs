//! Metrics declaration and recording.
//!
//! With the `metrics` feature enabled every execution increments one counter
//! matching its [`CacheStatus`], labelled with the store label:
//!
//! - `freshcache_cache_hit_total`
//! - `freshcache_cache_miss_total`
//! - `freshcache_cache_revalidated_total`
//! - `freshcache_cache_fallback_total`

use freshcache_core::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "freshcache_cache_hit_total",
            "Total number of responses served from the store without network."
        );
        "freshcache_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "freshcache_cache_miss_total",
            "Total number of responses fetched from the network."
        );
        "freshcache_cache_miss_total"
    };
    /// Track number of successful revalidations.
    pub static ref CACHE_REVALIDATED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "freshcache_cache_revalidated_total",
            "Total number of stored entries revalidated with 304 Not Modified."
        );
        "freshcache_cache_revalidated_total"
    };
    /// Track number of error fallbacks.
    pub static ref CACHE_FALLBACK_COUNTER: &'static str = {
        metrics::describe_counter!(
            "freshcache_cache_fallback_total",
            "Total number of stored entries served in place of a failed network call."
        );
        "freshcache_cache_fallback_total"
    };
}

/// Record the outcome of one execution against the store labelled `store`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_status(store: &str, status: CacheStatus) {
    let counter = match status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Revalidated => *CACHE_REVALIDATED_COUNTER,
        CacheStatus::Fallback => *CACHE_FALLBACK_COUNTER,
    };
    metrics::counter!(counter, "store" => store.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_status(_store: &str, _status: CacheStatus) {}
