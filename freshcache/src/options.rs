//! Cache options: policy, write settings and error fallback rules.
//!
//! [`CacheOptions`] is plain configuration. It deserializes from any serde
//! format, durations are written in humantime form:
//!
//! ```yaml
//! policy: force_cache
//! allow_post_method: false
//! max_stale: 7days
//! priority: high
//! hit_cache_on_error_except: [401, 403]
//! ```
//!
//! The cipher and the key builder are code, not data, and are set through
//! [`CacheOptionsBuilder`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use freshcache_backend::{Cipher, PassthroughCipher};
use freshcache_core::{DefaultKeyBuilder, Heuristic, KeyBuilder, Priority};
use http::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};

/// How the cache treats a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Follow the HTTP caching directives of requests and responses.
    #[default]
    Request,
    /// Never read the cache; the entry for the key is deleted when the response arrives.
    NoCache,
    /// Serve any stored entry regardless of its freshness, fetch and cache otherwise.
    ForceCache,
    /// Always ask the origin, conditionally when the stored entry has a validator.
    Refresh,
    /// Like [`CachePolicy::Refresh`], but responses are cached even without
    /// caching directives.
    RefreshForceCache,
    /// Like [`CachePolicy::Request`], but the `Last-Modified` heuristic also
    /// applies to URLs with a query string.
    IgnoreRequest,
}

impl CachePolicy {
    /// Returns the policy name as used in configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::Request => "request",
            CachePolicy::NoCache => "no_cache",
            CachePolicy::ForceCache => "force_cache",
            CachePolicy::Refresh => "refresh",
            CachePolicy::RefreshForceCache => "refresh_force_cache",
            CachePolicy::IgnoreRequest => "ignore_request",
        }
    }

    /// Returns `true` for policies that store responses regardless of the
    /// server's caching directives.
    pub const fn forces_caching(&self) -> bool {
        matches!(self, CachePolicy::ForceCache | CachePolicy::RefreshForceCache)
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static PASSTHROUGH: PassthroughCipher = PassthroughCipher;

/// Per-request cache configuration.
///
/// An [`HttpCache`](crate::HttpCache) carries a default value; every call may
/// pass its own through [`HttpCache::execute_with`](crate::HttpCache::execute_with).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// How stored entries are used.
    pub policy: CachePolicy,
    /// Also cache `POST` exchanges.
    pub allow_post_method: bool,
    /// Extension max-stale: entries stay usable until this long after they
    /// were written, and every cache hit pushes the deadline forward.
    #[serde(with = "humantime_serde")]
    pub max_stale: Option<Duration>,
    /// Eviction priority of written entries.
    pub priority: Priority,
    /// Error fallback: `None` never serves a stored entry on failure; `Some`
    /// serves one on transport failures and on every status not listed. An
    /// empty list falls back on every status.
    pub hit_cache_on_error_except: Option<Vec<u16>>,
    /// Cipher applied to stored content and headers.
    #[serde(skip)]
    pub cipher: Option<Arc<dyn Cipher>>,
    /// Key builder, [`DefaultKeyBuilder`] when unset.
    #[serde(skip)]
    pub key_builder: Option<Arc<dyn KeyBuilder>>,
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("policy", &self.policy)
            .field("allow_post_method", &self.allow_post_method)
            .field("max_stale", &self.max_stale)
            .field("priority", &self.priority)
            .field("hit_cache_on_error_except", &self.hit_cache_on_error_except)
            .field("cipher", &self.cipher.as_ref().map(|_| "..."))
            .field("key_builder", &self.key_builder.as_ref().map(|_| "..."))
            .finish()
    }
}

impl CacheOptions {
    /// Creates a new builder starting from the default options.
    pub fn builder() -> CacheOptionsBuilder {
        CacheOptionsBuilder::default()
    }

    /// Returns the configured cipher, or the identity cipher.
    pub fn cipher(&self) -> &dyn Cipher {
        match &self.cipher {
            Some(cipher) => &**cipher,
            None => &PASSTHROUGH,
        }
    }

    /// Computes the store key of `request`.
    pub fn key(&self, request: &Request<Bytes>) -> String {
        match &self.key_builder {
            Some(builder) => builder.build_key(request),
            None => DefaultKeyBuilder.build_key(request),
        }
    }

    /// Heuristic freshness mode implied by the policy.
    pub fn heuristic(&self) -> Heuristic {
        match self.policy {
            CachePolicy::IgnoreRequest => Heuristic::Always,
            _ => Heuristic::QuerylessOnly,
        }
    }

    /// Returns `true` when exchanges with `method` may be cached.
    pub fn allows_method(&self, method: &Method) -> bool {
        *method == Method::GET || (self.allow_post_method && *method == Method::POST)
    }

    /// Absolute extension max-stale deadline for an entry written or served at `now`.
    pub fn max_stale_deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.max_stale.map(|duration| {
            TimeDelta::from_std(duration)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// Decides whether a stored entry may replace a failed network call.
    ///
    /// `status` is `None` when the transport produced no response at all.
    pub fn allows_fallback(&self, status: Option<StatusCode>) -> bool {
        match (&self.hit_cache_on_error_except, status) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(except), Some(status)) => !except.contains(&status.as_u16()),
        }
    }
}

/// Builder for [`CacheOptions`].
///
/// ```
/// use std::time::Duration;
/// use freshcache::{CacheOptions, CachePolicy};
///
/// let options = CacheOptions::builder()
///     .policy(CachePolicy::ForceCache)
///     .max_stale(Duration::from_secs(3600))
///     .hit_cache_on_error_except([401, 403])
///     .build();
/// assert!(options.allows_fallback(None));
/// ```
#[derive(Debug, Default)]
pub struct CacheOptionsBuilder {
    options: CacheOptions,
}

impl CacheOptionsBuilder {
    /// Sets the cache policy.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.options.policy = policy;
        self
    }

    /// Allows caching `POST` exchanges.
    pub fn allow_post_method(mut self, allow: bool) -> Self {
        self.options.allow_post_method = allow;
        self
    }

    /// Sets the extension max-stale duration.
    pub fn max_stale(mut self, max_stale: Duration) -> Self {
        self.options.max_stale = Some(max_stale);
        self
    }

    /// Sets the priority of written entries.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.options.priority = priority;
        self
    }

    /// Enables error fallback for every status except `statuses`.
    pub fn hit_cache_on_error_except(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.options.hit_cache_on_error_except = Some(statuses.into_iter().collect());
        self
    }

    /// Sets the cipher applied to stored buffers.
    pub fn cipher(mut self, cipher: impl Cipher + 'static) -> Self {
        self.options.cipher = Some(Arc::new(cipher));
        self
    }

    /// Sets the key builder.
    pub fn key_builder(mut self, key_builder: impl KeyBuilder + 'static) -> Self {
        self.options.key_builder = Some(Arc::new(key_builder));
        self
    }

    /// Builds the options.
    pub fn build(self) -> CacheOptions {
        self.options
    }
}
