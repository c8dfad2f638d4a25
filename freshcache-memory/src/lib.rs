//! In-memory [`CacheStore`](freshcache_backend::CacheStore) for freshcache.
//!
//! [`MemoryStore`] keeps entries in insertion order and evicts the lowest
//! priority, oldest entry once its capacity is exceeded. Data lives only as
//! long as the process and is not shared between processes.
//!
//! ```
//! use freshcache_memory::MemoryStore;
//!
//! let store = MemoryStore::builder()
//!     .max_entries(1_000)
//!     .max_entry_size(512 * 1024)
//!     .label("pages")
//!     .build();
//! assert_eq!(store.capacity(), Some(1_000));
//! ```
#![warn(missing_docs)]

mod builder;
pub mod metrics;
mod store;

pub use builder::MemoryStoreBuilder;
pub use store::MemoryStore;
