//! Memory store capacity metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! ## Metrics
//!
//! - `freshcache_memory_entries` - Current number of entries in the store (gauge)
//!
//! The metric carries a `store` label to distinguish between multiple instances.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for the entry count gauge.
    pub static ref MEMORY_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "freshcache_memory_entries",
            "Current number of entries in the in-memory store."
        );
        "freshcache_memory_entries"
    };
}

/// Record the current number of entries for the store labelled `store`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_entries(store: &str, entries: usize) {
    metrics::gauge!(*MEMORY_ENTRIES, "store" => store.to_string()).set(entries as f64);
}

/// Record the current number of entries (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_entries(_store: &str, _entries: usize) {}
