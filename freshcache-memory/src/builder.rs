//! Builder for configuring [`MemoryStore`].

use freshcache_core::StoreLabel;

use crate::store::MemoryStore;

/// Builder for creating and configuring a [`MemoryStore`].
///
/// Use [`MemoryStore::builder`] to create a new builder instance. Without any
/// limit the store is unbounded.
///
/// ```
/// use freshcache_memory::MemoryStore;
///
/// let store = MemoryStore::builder()
///     .max_entries(100)
///     .build();
/// assert_eq!(store.capacity(), Some(100));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    max_entries: Option<usize>,
    max_entry_size: Option<usize>,
    label: StoreLabel,
}

impl MemoryStoreBuilder {
    /// Creates a new builder with no limits and the `"memory"` label.
    pub fn new() -> Self {
        Self {
            max_entries: None,
            max_entry_size: None,
            label: StoreLabel::new_static("memory"),
        }
    }

    /// Sets the maximum number of entries the store can hold.
    ///
    /// When a write exceeds this capacity, the entry with the lowest
    /// [`Priority`](freshcache_core::Priority) is evicted; among equal
    /// priorities the oldest write goes first.
    pub fn max_entries(mut self, capacity: usize) -> Self {
        self.max_entries = Some(capacity);
        self
    }

    /// Sets the maximum size in bytes of one entry's content plus headers.
    ///
    /// Larger entries are not stored.
    pub fn max_entry_size(mut self, bytes: usize) -> Self {
        self.max_entry_size = Some(bytes);
        self
    }

    /// Sets a custom label for this store.
    ///
    /// # Default
    ///
    /// `"memory"`
    pub fn label(mut self, label: impl Into<StoreLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Builds the [`MemoryStore`].
    pub fn build(self) -> MemoryStore {
        MemoryStore::new(self.max_entries, self.max_entry_size, self.label)
    }
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
