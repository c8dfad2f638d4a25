//! Memory store implementation.

use std::sync::Arc;

use async_trait::async_trait;
use freshcache_backend::{CacheStore, DeleteStatus, StoreResult};
use freshcache_core::{CacheEntry, StoreLabel};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::builder::MemoryStoreBuilder;
use crate::metrics;

/// In-memory cache store.
///
/// Entries are kept in write order behind an async [`RwLock`]; rewriting a key
/// moves it to the back. Clones share the same storage.
///
/// # Caveats
///
/// - Data is **not persisted**, the store is lost on process restart
/// - Data is **not shared** across processes
/// - Extension max-stale deadlines are not enforced here; the cache engine
///   deletes staled entries when it loads them
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<IndexMap<String, CacheEntry>>>,
    max_entries: Option<usize>,
    max_entry_size: Option<usize>,
    label: StoreLabel,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("label", &self.label)
            .field("max_entries", &self.max_entries)
            .field("max_entry_size", &self.max_entry_size)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStoreBuilder::new().build()
    }
}

impl MemoryStore {
    /// Creates a new builder for `MemoryStore`.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    pub(crate) fn new(
        max_entries: Option<usize>,
        max_entry_size: Option<usize>,
        label: StoreLabel,
    ) -> Self {
        Self {
            entries: Arc::new(RwLock::new(IndexMap::new())),
            max_entries,
            max_entry_size,
            label,
        }
    }

    /// Maximum number of entries, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.max_entries
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` when the store holds no entry.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Stored keys, oldest write first.
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    fn exceeds_entry_size(&self, entry: &CacheEntry) -> bool {
        self.max_entry_size
            .is_some_and(|limit| entry.buffers_len() > limit)
    }
}

/// Index of the entry to evict: lowest priority, oldest write among equals.
fn eviction_candidate(entries: &IndexMap<String, CacheEntry>) -> Option<usize> {
    entries
        .values()
        .enumerate()
        .min_by_key(|(_, entry)| entry.priority)
        .map(|(index, _)| index)
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, entry: CacheEntry) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.shift_remove(&entry.key);

        if self.exceeds_entry_size(&entry) {
            debug!(
                key = %entry.key,
                size = entry.buffers_len(),
                store = %self.label,
                "entry exceeds max entry size, not stored"
            );
            metrics::record_entries(self.label.as_str(), entries.len());
            return Ok(());
        }

        entries.insert(entry.key.clone(), entry);

        if let Some(capacity) = self.max_entries {
            while entries.len() > capacity {
                let Some(index) = eviction_candidate(&entries) else {
                    break;
                };
                if let Some((key, _)) = entries.shift_remove_index(index) {
                    trace!(key = %key, store = %self.label, "entry evicted");
                }
            }
        }

        metrics::record_entries(self.label.as_str(), entries.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<DeleteStatus> {
        let mut entries = self.entries.write().await;
        let status = match entries.shift_remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        };
        metrics::record_entries(self.label.as_str(), entries.len());
        Ok(status)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn clean(&self) -> StoreResult<()> {
        self.entries.write().await.clear();
        metrics::record_entries(self.label.as_str(), 0);
        Ok(())
    }

    fn label(&self) -> StoreLabel {
        self.label.clone()
    }
}
