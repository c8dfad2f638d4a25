// #![warn(missing_docs)]
//! Traits and structs for freshcache store interaction.
//!
//! If you want to implement your own store, you are in the right place:
//! implement [`CacheStore`] and every [`CacheStore`] automatically gets the
//! cipher-aware [`EntryStore`] operations used by the cache engine.
mod cipher;
mod error;
mod store;

pub use cipher::{Cipher, CipherError, PassthroughCipher, open, seal};
pub use error::StoreError;
pub use store::{CacheStore, EntryStore, StoreResult};

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
