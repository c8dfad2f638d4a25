//! Symmetric cipher applied to stored entries.
//!
//! A [`Cipher`] transforms the two opaque buffers of a [`CacheEntry`]
//! (`content` and `headers`) on their way into a store and back. [`seal`] and
//! [`open`] always transform both buffers and return a new entry; when either
//! buffer fails, no entry is produced at all.
//!
//! ```
//! use freshcache_backend::{Cipher, CipherError};
//!
//! /// Toy cipher flipping every bit.
//! struct Invert;
//!
//! impl Cipher for Invert {
//!     fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
//!         Ok(data.iter().map(|b| !b).collect())
//!     }
//!
//!     fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
//!         self.encrypt(data)
//!     }
//! }
//!
//! let sealed = Invert.encrypt(b"abc").unwrap();
//! assert_eq!(Invert.decrypt(&sealed).unwrap(), b"abc");
//! ```

use bytes::Bytes;
use freshcache_core::CacheEntry;
use thiserror::Error;

/// Error returned by a [`Cipher`].
#[derive(Debug, Error)]
pub enum CipherError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encrypt(Box<dyn std::error::Error + Send + Sync>),
    /// Decryption failed (wrong key, tampered data, ...).
    #[error("decryption failed: {0}")]
    Decrypt(Box<dyn std::error::Error + Send + Sync>),
}

/// Symmetric transform applied to stored buffers.
pub trait Cipher: Send + Sync {
    /// Encrypts `data`.
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Decrypts `data` produced by [`Cipher::encrypt`].
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Returns `true` when the cipher leaves data untouched.
    ///
    /// Lets callers skip copying buffers through the identity transform.
    fn is_passthrough(&self) -> bool {
        false
    }
}

/// Identity cipher used when no cipher is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCipher;

impl Cipher for PassthroughCipher {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(data.to_vec())
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(data.to_vec())
    }

    fn is_passthrough(&self) -> bool {
        true
    }
}

/// Encrypts the content and headers of `entry`.
pub fn seal(entry: CacheEntry, cipher: &dyn Cipher) -> Result<CacheEntry, CipherError> {
    transform(entry, cipher, |c, data| c.encrypt(data))
}

/// Decrypts the content and headers of `entry`.
pub fn open(entry: CacheEntry, cipher: &dyn Cipher) -> Result<CacheEntry, CipherError> {
    transform(entry, cipher, |c, data| c.decrypt(data))
}

fn transform<F>(entry: CacheEntry, cipher: &dyn Cipher, apply: F) -> Result<CacheEntry, CipherError>
where
    F: Fn(&dyn Cipher, &[u8]) -> Result<Vec<u8>, CipherError>,
{
    if cipher.is_passthrough() {
        return Ok(entry);
    }
    let content = entry
        .content
        .as_deref()
        .map(|data| apply(cipher, data).map(Bytes::from))
        .transpose()?;
    let headers = entry
        .headers
        .as_deref()
        .map(|data| apply(cipher, data).map(Bytes::from))
        .transpose()?;
    Ok(entry.with_buffers(content, headers))
}
