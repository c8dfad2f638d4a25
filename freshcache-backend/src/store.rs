use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use freshcache_core::{CacheEntry, StoreLabel};
use tracing::trace;

use crate::{
    DeleteStatus, StoreError,
    cipher::{Cipher, open, seal},
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Asynchronous key-value contract over [`CacheEntry`].
///
/// Implementations must be safe for concurrent use on different keys.
/// Concurrent writes to the same key may resolve in any order (last write
/// wins) but must never corrupt the store.
#[async_trait]
pub trait CacheStore: Sync + Send {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>>;

    /// Inserts or replaces the entry stored under `entry.key`.
    async fn set(&self, entry: CacheEntry) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<DeleteStatus>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Removes every entry.
    async fn clean(&self) -> StoreResult<()>;

    /// Returns the label of this store for logs, metrics and response sources.
    fn label(&self) -> StoreLabel {
        StoreLabel::new_static("store")
    }
}

#[async_trait]
impl CacheStore for &dyn CacheStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        (*self).get(key).await
    }

    async fn set(&self, entry: CacheEntry) -> StoreResult<()> {
        (*self).set(entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<DeleteStatus> {
        (*self).delete(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        (*self).exists(key).await
    }

    async fn clean(&self) -> StoreResult<()> {
        (*self).clean().await
    }

    fn label(&self) -> StoreLabel {
        (*self).label()
    }
}

#[async_trait]
impl CacheStore for Box<dyn CacheStore> {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<DeleteStatus> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn clean(&self) -> StoreResult<()> {
        (**self).clean().await
    }

    fn label(&self) -> StoreLabel {
        (**self).label()
    }
}

#[async_trait]
impl CacheStore for Arc<dyn CacheStore + Send + 'static> {
    async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, entry: CacheEntry) -> StoreResult<()> {
        (**self).set(entry).await
    }

    async fn delete(&self, key: &str) -> StoreResult<DeleteStatus> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn clean(&self) -> StoreResult<()> {
        (**self).clean().await
    }

    fn label(&self) -> StoreLabel {
        (**self).label()
    }
}

/// Cipher-aware entry operations.
///
/// Entries handed to [`EntryStore::save`] are plaintext and are sealed before
/// they reach the store; entries returned by [`EntryStore::load`] are opened
/// before they reach the caller. Every [`CacheStore`] implements this trait.
pub trait EntryStore: CacheStore {
    fn load(
        &self,
        key: &str,
        cipher: &dyn Cipher,
    ) -> impl Future<Output = StoreResult<Option<CacheEntry>>> + Send {
        async move {
            match self.get(key).await? {
                Some(entry) => {
                    trace!(key, store = %self.label(), "entry read");
                    Ok(Some(open(entry, cipher)?))
                }
                None => Ok(None),
            }
        }
    }

    fn save(
        &self,
        entry: CacheEntry,
        cipher: &dyn Cipher,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        async move {
            let sealed = seal(entry, cipher)?;
            trace!(key = %sealed.key, store = %self.label(), "entry written");
            self.set(sealed).await
        }
    }
}

impl<S: CacheStore + ?Sized> EntryStore for S {}
