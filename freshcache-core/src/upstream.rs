//! Origin transport contract.

use std::error::Error as StdError;
use std::future::Future;

use thiserror::Error;

/// Failure of the network transport, as opposed to an HTTP error status.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request was cancelled before a response arrived.
    ///
    /// Cancellation bypasses every cache side effect.
    #[error("request cancelled")]
    Cancelled,
    /// No response could be obtained (connection refused, timeout, ...).
    #[error(transparent)]
    Failed(Box<dyn StdError + Send + Sync>),
}

impl TransportError {
    /// Wraps any error as a transport failure.
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        TransportError::Failed(error.into())
    }

    /// Returns `true` for [`TransportError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

/// Trait for calling the origin with a request.
/// This trait is transport-agnostic and can be implemented for any async client.
///
/// # Examples
///
/// ```rust,ignore
/// use freshcache_core::{TransportError, Upstream};
/// use std::future::Ready;
///
/// struct StaticUpstream {
///     response: http::Response<bytes::Bytes>,
/// }
///
/// impl Upstream<http::Request<bytes::Bytes>> for StaticUpstream {
///     type Response = Result<http::Response<bytes::Bytes>, TransportError>;
///     type Future = Ready<Self::Response>;
///
///     fn call(&mut self, _req: http::Request<bytes::Bytes>) -> Self::Future {
///         std::future::ready(Ok(self.response.clone()))
///     }
/// }
/// ```
pub trait Upstream<Req> {
    /// The response type returned by the origin
    type Response;

    /// The future that resolves to the response
    type Future: Future<Output = Self::Response> + Send;

    /// Call the origin with the given request
    fn call(&mut self, req: Req) -> Self::Future;
}
