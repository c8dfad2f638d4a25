//! # freshcache
//!
//! HTTP response cache decision engine.
//!
//! Given a request and whatever is stored for it, freshcache decides whether to
//! serve the stored response, revalidate it with a conditional request, or fetch
//! a fresh one and store the result. Decisions follow RFC 7234 freshness rules
//! overlaid with client policies: force-cache, refresh, extension max-stale,
//! entry priority and error fallback.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use freshcache::{CacheOptions, CachePolicy, HttpCache};
//! use freshcache_memory::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::builder().max_entries(1_000).build());
//! let options = CacheOptions::builder()
//!     .policy(CachePolicy::Request)
//!     .max_stale(Duration::from_secs(7 * 24 * 3600))
//!     .hit_cache_on_error_except([401, 403])
//!     .build();
//! let cache = HttpCache::new(store, options);
//! # let _ = cache;
//! ```
//!
//! The transport is any [`Upstream`]; the store is any [`CacheStore`].
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The [`HttpCache`] orchestrator.
pub mod cache;

/// Error types for cache executions.
pub mod error;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, every execution increments a
/// counter for its outcome (hit, miss, revalidated, fallback).
pub mod metrics;

/// Policy and per-request options.
pub mod options;

/// Request and response decision state machine.
pub mod strategy;

pub use cache::{CacheResult, HttpCache};
pub use error::CacheError;
pub use options::{CacheOptions, CacheOptionsBuilder, CachePolicy};
pub use strategy::{CacheStrategy, CacheStrategyFactory, Exchange, Lookup, Skip};

pub use freshcache_backend::{
    CacheStore, Cipher, CipherError, DeleteStatus, EntryStore, PassthroughCipher, StoreError,
    StoreResult,
};
pub use freshcache_core::{
    CacheContext, CacheControl, CacheEntry, CacheSource, CacheStatus, Cacheability, Clock,
    DefaultKeyBuilder, Heuristic, KeyBuilder, Priority, ResponseSource, StoreLabel, SystemClock,
    TransportError, Upstream,
};
