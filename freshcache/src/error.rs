//! Error type of cache executions.

use freshcache_backend::StoreError;
use freshcache_core::{HeaderCodecError, TransportError};
use thiserror::Error;

/// Error returned by [`HttpCache`](crate::HttpCache).
///
/// Store failures are surfaced, never turned into a cache miss. Callers stay
/// free to treat any of them as a reason to go to the network directly.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store failed to read, write or delete an entry.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored headers could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] HeaderCodecError),

    /// The origin could not be reached and no stored entry replaced it.
    #[error(transparent)]
    Transport(TransportError),

    /// The request was cancelled. Nothing was read from or written to the store
    /// after the cancellation.
    #[error("request cancelled")]
    Cancelled,
}

impl From<TransportError> for CacheError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Cancelled => CacheError::Cancelled,
            error => CacheError::Transport(error),
        }
    }
}
