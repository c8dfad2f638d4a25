//! Error types for store operations.

use freshcache_core::HeaderCodecError;
use thiserror::Error;

use crate::cipher::CipherError;

/// Error type for store operations.
///
/// This enum categorizes errors that can occur during cache store interactions
/// into distinct groups for appropriate handling. Store errors are always
/// surfaced to the caller, never turned into a cache miss.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Internal store error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error.
    ///
    /// Errors occurring during communication with remote stores.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),

    /// Stored headers could not be encoded or decoded.
    #[error(transparent)]
    CodecError(#[from] HeaderCodecError),

    /// Encryption or decryption error.
    #[error(transparent)]
    CipherError(#[from] CipherError),
}
