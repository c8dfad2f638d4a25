//! HTTP cache orchestrator.
//!
//! [`HttpCache`] drives one exchange end to end:
//!
//! 1. load the stored entry (purging it when its extension max-stale deadline
//!    passed and no override is configured)
//! 2. ask [`CacheStrategyFactory::on_request`] how to answer
//! 3. serve the entry, or call the origin through an [`Upstream`]
//! 4. ask [`CacheStrategyFactory::on_response`] whether the response is stored
//! 5. fall back to the stored entry when the origin fails and the options allow it
//!
//! Every call returns the response together with a [`CacheContext`] telling
//! how it was produced.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use freshcache_backend::{CacheStore, EntryStore};
use freshcache_core::{
    CacheContext, CacheControl, CacheEntry, CacheSource, CacheStatus, Cacheability, Clock,
    ResponseSource, SystemClock, TransportError, Upstream,
};
use http::{Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::metrics;
use crate::options::{CacheOptions, CachePolicy};
use crate::strategy::{CacheStrategy, CacheStrategyFactory, Exchange, Skip, is_network_fill};

/// Result of one cache execution.
pub type CacheResult = Result<(Response<Bytes>, CacheContext), CacheError>;

/// HTTP response cache in front of an origin.
///
/// Responses served from the store carry status `304 Not Modified` with the
/// stored headers and body, and a [`CacheSource`] extension. Network responses
/// are returned unchanged apart from that extension.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use freshcache::{CacheOptions, CachePolicy, HttpCache};
/// use freshcache_memory::MemoryStore;
///
/// let cache = HttpCache::new(
///     Arc::new(MemoryStore::default()),
///     CacheOptions::builder().policy(CachePolicy::ForceCache).build(),
/// );
/// assert_eq!(cache.options().policy, CachePolicy::ForceCache);
/// ```
pub struct HttpCache<S: ?Sized> {
    store: Arc<S>,
    options: CacheOptions,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized> Clone for HttpCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: ?Sized> fmt::Debug for HttpCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCache")
            .field("store", &std::any::type_name::<S>())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S> HttpCache<S>
where
    S: CacheStore + ?Sized,
{
    /// Creates a cache over `store` with default `options`.
    pub fn new(store: Arc<S>, options: CacheOptions) -> Self {
        Self {
            store,
            options,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the wall clock used for every freshness decision.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Default options of this cache.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Answers `request` with the default options.
    pub async fn execute<U>(&self, request: Request<Bytes>, upstream: U) -> CacheResult
    where
        U: Upstream<Request<Bytes>, Response = Result<Response<Bytes>, TransportError>>,
    {
        self.execute_with(request, &self.options, upstream).await
    }

    /// Answers `request` with explicit `options`.
    pub async fn execute_with<U>(
        &self,
        request: Request<Bytes>,
        options: &CacheOptions,
        mut upstream: U,
    ) -> CacheResult
    where
        U: Upstream<Request<Bytes>, Response = Result<Response<Bytes>, TransportError>>,
    {
        let key = options.key(&request);
        let ctx = CacheContext::new(key.clone());

        if !options.allows_method(request.method()) {
            debug!(key = %key, method = %request.method(), "method not cacheable, bypassing store");
            let response = upstream.call(request).await?;
            return Ok(self.network_response(response, ctx));
        }

        let now = self.clock.now();
        let stored = match options.policy {
            CachePolicy::NoCache => None,
            _ => self.lookup_entry(&key, options, now).await?,
        };
        let only_if_cached = CacheControl::from_headers(request.headers()).only_if_cached;
        let factory = CacheStrategyFactory::new(options);

        let (request, cached) = match factory.on_request(request, stored, now) {
            CacheStrategy::Cached(entry) => return self.hit(entry, options, ctx, now).await,
            CacheStrategy::Network(request) => (request, None),
            CacheStrategy::Conditional { request, cached } => (request, Some(cached)),
        };

        if only_if_cached {
            debug!(key = %key, "only-if-cached request cannot be answered from the store");
            return Ok(self.network_response(gateway_timeout(), ctx));
        }

        let head = request_head(&request);
        let request_date = self.clock.now();
        let result = upstream.call(request).await;
        let response_date = self.clock.now();

        let response = match result {
            Ok(response) => response,
            Err(TransportError::Cancelled) => {
                debug!(key = %key, "request cancelled");
                return Err(CacheError::Cancelled);
            }
            Err(error) => {
                return match self.fallback(&key, cached, options, None).await? {
                    Some(entry) => self.recovered(entry, ctx),
                    None => Err(CacheError::Transport(error)),
                };
            }
        };

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_MODIFIED {
            if let Some(entry) = self.fallback(&key, cached, options, Some(&response)).await? {
                return self.recovered(entry, ctx);
            }
            return Ok(self.network_response(response, ctx));
        }

        let exchange = Exchange {
            key: &key,
            request: &head,
            response: &response,
            cached: cached.as_ref(),
            request_date,
            response_date,
        };
        match factory.on_response(exchange)? {
            Cacheability::Cacheable(entry) => {
                self.store.save(entry.clone(), options.cipher()).await?;
                debug!(
                    key = %key,
                    policy = %options.policy,
                    status = status.as_u16(),
                    "response stored"
                );
                if status == StatusCode::NOT_MODIFIED {
                    return self.revalidated(entry, ctx);
                }
            }
            Cacheability::NonCacheable(skip) => {
                debug!(
                    key = %key,
                    policy = %options.policy,
                    reason = skip.as_str(),
                    "response not stored"
                );
                if skip == Skip::Policy {
                    self.store.delete(&key).await?;
                }
                // A 304 still answers from the basis, the merge is just not persisted.
                if status == StatusCode::NOT_MODIFIED
                    && let Some(cached) = cached
                {
                    let entry =
                        cached.revalidated(response.headers(), request_date, response_date)?;
                    return self.revalidated(entry, ctx);
                }
            }
        }

        Ok(self.network_response(response, ctx))
    }

    /// Reads and opens the entry stored under `key`.
    ///
    /// An entry past its extension max-stale deadline is deleted unless the
    /// options carry a max-stale override.
    async fn lookup_entry(
        &self,
        key: &str,
        options: &CacheOptions,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let Some(entry) = self.store.load(key, options.cipher()).await? else {
            return Ok(None);
        };
        if entry.is_staled(now) && options.max_stale.is_none() {
            debug!(key, "max-stale deadline passed, purging entry");
            self.store.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn hit(
        &self,
        entry: CacheEntry,
        options: &CacheOptions,
        mut ctx: CacheContext,
        now: DateTime<Utc>,
    ) -> CacheResult {
        let entry = match options.max_stale_deadline(now) {
            Some(deadline) => {
                let entry = entry.with_max_stale(Some(deadline));
                self.store.save(entry.clone(), options.cipher()).await?;
                debug!(key = %ctx.key, %deadline, "max-stale deadline extended");
                entry
            }
            None => entry,
        };

        debug!(key = %ctx.key, policy = %options.policy, "serving stored entry");
        ctx.status = CacheStatus::Hit;
        ctx.source = ResponseSource::Store(self.store.label());
        ctx.from_network = false;
        metrics::record_status(self.store.label().as_str(), ctx.status);
        Ok((entry.into_response(false)?, ctx))
    }

    /// Picks the entry replacing a failed network call, if the options allow one.
    ///
    /// `failure` is the error response, `None` when the transport produced none.
    /// The recovered entry absorbs the failure's headers and is re-persisted.
    async fn fallback(
        &self,
        key: &str,
        cached: Option<CacheEntry>,
        options: &CacheOptions,
        failure: Option<&Response<Bytes>>,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let status = failure.map(Response::status);
        if !options.allows_fallback(status) {
            return Ok(None);
        }

        let candidate = match cached {
            Some(entry) => Some(entry),
            None if options.policy != CachePolicy::NoCache => {
                self.lookup_entry(key, options, self.clock.now()).await?
            }
            None => None,
        };
        let Some(entry) = candidate else {
            return Ok(None);
        };

        let entry = match failure {
            Some(response) => entry.with_merged_headers(response.headers())?,
            None => entry,
        };
        self.store.save(entry.clone(), options.cipher()).await?;
        warn!(
            key,
            status = status.map(|status| status.as_u16()),
            "origin failed, serving stored entry"
        );
        Ok(Some(entry))
    }

    fn recovered(&self, entry: CacheEntry, mut ctx: CacheContext) -> CacheResult {
        ctx.status = CacheStatus::Fallback;
        ctx.source = ResponseSource::Store(self.store.label());
        ctx.from_network = false;
        metrics::record_status(self.store.label().as_str(), ctx.status);
        Ok((entry.into_response(false)?, ctx))
    }

    fn revalidated(&self, entry: CacheEntry, mut ctx: CacheContext) -> CacheResult {
        ctx.status = CacheStatus::Revalidated;
        ctx.source = ResponseSource::Store(self.store.label());
        ctx.from_network = true;
        metrics::record_status(self.store.label().as_str(), ctx.status);
        Ok((entry.into_response(true)?, ctx))
    }

    fn network_response(
        &self,
        mut response: Response<Bytes>,
        mut ctx: CacheContext,
    ) -> (Response<Bytes>, CacheContext) {
        ctx.status = CacheStatus::Miss;
        ctx.source = ResponseSource::Upstream;
        ctx.from_network = is_network_fill(response.status());
        response.extensions_mut().insert(CacheSource {
            from_network: ctx.from_network,
        });
        metrics::record_status(self.store.label().as_str(), ctx.status);
        (response, ctx)
    }
}

/// Method, URI and headers of `request`; the response path never reads the body.
fn request_head(request: &Request<Bytes>) -> Request<Bytes> {
    let mut head = Request::new(Bytes::new());
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = request.uri().clone();
    *head.version_mut() = request.version();
    *head.headers_mut() = request.headers().clone();
    head
}

fn gateway_timeout() -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::GATEWAY_TIMEOUT;
    response
}
