#![warn(missing_docs)]
//! # freshcache-core
//!
//! Core types of the freshcache HTTP cache decision engine.
//!
//! This crate holds everything that does not depend on a storage backend or on
//! the decision policy itself:
//!
//! - **Directives** - [`CacheControl`] parsed from request or response headers
//! - **Entries** - [`CacheEntry`], the persisted form of one cached exchange
//! - **Freshness** - age, freshness lifetime and expiration computed on an entry
//! - **Keys** - the [`KeyBuilder`] contract and its [`DefaultKeyBuilder`]
//! - **Transport** - the [`Upstream`] contract used to reach the origin
//!
//! All freshness computations take the current time explicitly, so a decision
//! made for a given `(entry, request, now)` triple is fully reproducible.

pub mod cache_control;
pub mod clock;
pub mod context;
pub mod entry;
pub mod freshness;
pub mod headers;
pub mod key;
pub mod label;
pub mod policy;
pub mod upstream;

pub use cache_control::CacheControl;
pub use clock::{Clock, SystemClock};
pub use context::{CacheContext, CacheStatus, ResponseSource};
pub use entry::{CacheEntry, CacheSource, Priority};
pub use freshness::Heuristic;
pub use headers::HeaderCodecError;
pub use key::{DefaultKeyBuilder, KeyBuilder};
pub use label::StoreLabel;
pub use policy::Cacheability;
pub use upstream::{TransportError, Upstream};

/// Raw byte buffer used for cached content and serialized headers.
/// `Bytes` keeps clones of large bodies cheap.
pub type Raw = bytes::Bytes;
