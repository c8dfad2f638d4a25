//! Cache context types for tracking how a response was produced.

use crate::label::StoreLabel;

/// What the cache did for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// A stored entry was served without contacting the origin.
    Hit,
    /// No usable entry; the response came from a full network fetch.
    #[default]
    Miss,
    /// A conditional request was answered with 304 and merged into the stored entry.
    Revalidated,
    /// The network failed and a stored entry was served in its place.
    Fallback,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Revalidated => "revalidated",
            CacheStatus::Fallback => "fallback",
        }
    }
}

/// Source of the response - either the origin or a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseSource {
    /// Response came from the origin.
    #[default]
    Upstream,
    /// Response came from the store with the given label.
    Store(StoreLabel),
}

impl ResponseSource {
    /// Returns the source as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            ResponseSource::Upstream => "upstream",
            ResponseSource::Store(label) => label.as_str(),
        }
    }
}

/// Outcome metadata returned alongside every response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheContext {
    /// Cache key computed for the request.
    pub key: String,
    /// What the cache did.
    pub status: CacheStatus,
    /// Where the response body came from.
    pub source: ResponseSource,
    /// `true` only for fills from a `200` or `304` network response.
    pub from_network: bool,
}

impl CacheContext {
    /// Creates a context for `key` with default (miss, upstream) status.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}
