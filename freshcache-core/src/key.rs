//! Cache key construction.
//!
//! A [`KeyBuilder`] maps a request to the opaque string identifying its entry
//! in a store. It must be deterministic. The [`DefaultKeyBuilder`] derives the
//! key from the method, the normalized URL and the body of `POST` requests;
//! custom builders can partition the cache further, for example per
//! authenticated principal:
//!
//! ```
//! use bytes::Bytes;
//! use freshcache_core::{DefaultKeyBuilder, KeyBuilder};
//! use http::Request;
//!
//! let per_user = |request: &Request<Bytes>| {
//!     let user = request
//!         .headers()
//!         .get("x-user")
//!         .and_then(|v| v.to_str().ok())
//!         .unwrap_or("anonymous");
//!     format!("{user}:{}", DefaultKeyBuilder.build_key(request))
//! };
//!
//! let request = Request::get("https://example.com/a")
//!     .header("x-user", "alice")
//!     .body(Bytes::new())
//!     .unwrap();
//! assert!(per_user.build_key(&request).starts_with("alice:"));
//! ```

use bytes::Bytes;
use http::{Method, Request};
use sha2::{Digest, Sha256};

/// Computes the store key of a request.
pub trait KeyBuilder: Send + Sync {
    /// Returns the key for `request`.
    fn build_key(&self, request: &Request<Bytes>) -> String;
}

impl<F> KeyBuilder for F
where
    F: Fn(&Request<Bytes>) -> String + Send + Sync,
{
    fn build_key(&self, request: &Request<Bytes>) -> String {
        self(request)
    }
}

/// Hex encoded SHA-256 of `METHOD normalized-url`, followed by the body for
/// `POST` requests.
///
/// Normalization lowercases the scheme and the authority; path and query are
/// kept byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyBuilder;

impl KeyBuilder for DefaultKeyBuilder {
    fn build_key(&self, request: &Request<Bytes>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.method().as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(normalized_url(request).as_bytes());
        if request.method() == Method::POST {
            hasher.update(b" ");
            hasher.update(request.body());
        }
        hex::encode(hasher.finalize())
    }
}

fn normalized_url(request: &Request<Bytes>) -> String {
    let uri = request.uri();
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    match (uri.scheme_str(), uri.authority()) {
        (Some(scheme), Some(authority)) => format!(
            "{}://{}{}",
            scheme.to_ascii_lowercase(),
            authority.as_str().to_ascii_lowercase(),
            path_and_query
        ),
        _ => path_and_query.to_owned(),
    }
}
