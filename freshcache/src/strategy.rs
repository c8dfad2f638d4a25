//! Cache strategy state machine.
//!
//! [`CacheStrategyFactory`] makes the two decisions of one exchange:
//!
//! - **request path** ([`CacheStrategyFactory::on_request`]): serve the stored
//!   entry, revalidate it with a conditional request, or fetch from scratch
//! - **response path** ([`CacheStrategyFactory::on_response`]): whether the
//!   network response becomes a stored entry
//!
//! The request path is a dispatch over `(policy, lookup)` where the lookup
//! classifies the stored entry as missing, fresh or expired. Each outcome is
//! produced by one of the pure functions [`serve`], [`revalidate`] and
//! [`fetch`], so the freshness math stays independent from the policy overlay.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use freshcache_core::{CacheControl, CacheEntry, Cacheability, HeaderCodecError};
use http::header::{ETAG, EXPIRES, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};

use crate::options::{CacheOptions, CachePolicy};

/// Outcome of the request path.
#[derive(Debug)]
pub enum CacheStrategy {
    /// Serve the stored entry, no network call.
    Cached(CacheEntry),
    /// Full network fetch without a cached basis.
    Network(Request<Bytes>),
    /// Conditional fetch: `request` carries validators taken from `cached`,
    /// which a `304 Not Modified` answer is merged into.
    Conditional {
        /// Request carrying `If-None-Match` or `If-Modified-Since`.
        request: Request<Bytes>,
        /// Stored entry backing the request.
        cached: CacheEntry,
    },
}

/// Classification of the stored entry for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Nothing stored for the key.
    Miss,
    /// Stored entry is fresh for this request.
    Fresh(CacheEntry),
    /// Stored entry needs revalidation.
    Expired(CacheEntry),
}

/// Why a network response is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Request method is not cacheable.
    Method,
    /// Request or response carries `no-store`.
    NoStore,
    /// The policy never stores; the caller removes the key.
    Policy,
    /// A `304 Not Modified` arrived without a stored entry to merge into.
    NotModifiedWithoutBasis,
    /// No freshness lifetime nor validator, nothing would ever serve the entry.
    NoFreshnessSignal,
}

impl Skip {
    /// Returns the reason as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Skip::Method => "method",
            Skip::NoStore => "no_store",
            Skip::Policy => "policy",
            Skip::NotModifiedWithoutBasis => "not_modified_without_basis",
            Skip::NoFreshnessSignal => "no_freshness_signal",
        }
    }
}

/// A finished network exchange handed to the response path.
#[derive(Debug)]
pub struct Exchange<'a> {
    /// Store key of the request.
    pub key: &'a str,
    /// Request as sent to the origin.
    pub request: &'a Request<Bytes>,
    /// Response of the origin.
    pub response: &'a Response<Bytes>,
    /// Stored entry the request was conditional on.
    pub cached: Option<&'a CacheEntry>,
    /// When the request was dispatched.
    pub request_date: DateTime<Utc>,
    /// When the response was received.
    pub response_date: DateTime<Utc>,
}

/// Serves the stored entry.
pub fn serve(entry: CacheEntry) -> CacheStrategy {
    CacheStrategy::Cached(entry)
}

/// Fetches without a cached basis.
pub fn fetch(request: Request<Bytes>) -> CacheStrategy {
    CacheStrategy::Network(request)
}

/// Revalidates `cached` with a conditional request.
///
/// `If-None-Match` is derived from the ETag, otherwise `If-Modified-Since` from
/// Last-Modified. Without a usable validator this is a plain [`fetch`].
pub fn revalidate(mut request: Request<Bytes>, cached: CacheEntry) -> CacheStrategy {
    match validator(&cached) {
        Some((name, value)) => {
            request.headers_mut().insert(name, value);
            CacheStrategy::Conditional { request, cached }
        }
        None => fetch(request),
    }
}

fn validator(entry: &CacheEntry) -> Option<(HeaderName, HeaderValue)> {
    let etag = entry
        .etag
        .as_deref()
        .and_then(|etag| HeaderValue::from_str(etag).ok())
        .map(|value| (IF_NONE_MATCH, value));
    etag.or_else(|| {
        entry
            .last_modified
            .as_deref()
            .and_then(|last_modified| HeaderValue::from_str(last_modified).ok())
            .map(|value| (IF_MODIFIED_SINCE, value))
    })
}

/// Only `200` and `304` count as fills from the network.
pub fn is_network_fill(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::NOT_MODIFIED
}

/// Stateless decision engine, borrowed per exchange.
#[derive(Debug, Clone, Copy)]
pub struct CacheStrategyFactory<'a> {
    options: &'a CacheOptions,
}

impl<'a> CacheStrategyFactory<'a> {
    /// Creates a factory deciding with `options`.
    pub fn new(options: &'a CacheOptions) -> Self {
        Self { options }
    }

    /// Classifies `cached` for `request` at `now`.
    ///
    /// A request `no-cache` directive turns any stored entry into an expired one.
    pub fn lookup(
        &self,
        request: &Request<Bytes>,
        cached: Option<CacheEntry>,
        now: DateTime<Utc>,
    ) -> Lookup {
        let Some(entry) = cached else {
            return Lookup::Miss;
        };
        let directives = CacheControl::from_headers(request.headers());
        if directives.no_cache || entry.is_expired(&directives, self.options.heuristic(), now) {
            Lookup::Expired(entry)
        } else {
            Lookup::Fresh(entry)
        }
    }

    /// Request path: decides how `request` is answered given the stored entry.
    ///
    /// `cached` must already be opened (plaintext) and checked against the
    /// extension max-stale deadline.
    pub fn on_request(
        &self,
        request: Request<Bytes>,
        cached: Option<CacheEntry>,
        now: DateTime<Utc>,
    ) -> CacheStrategy {
        let lookup = self.lookup(&request, cached, now);
        match (self.options.policy, lookup) {
            (CachePolicy::NoCache, _) | (_, Lookup::Miss) => fetch(request),
            (CachePolicy::ForceCache, Lookup::Fresh(entry) | Lookup::Expired(entry)) => {
                serve(entry)
            }
            (
                CachePolicy::Refresh | CachePolicy::RefreshForceCache,
                Lookup::Fresh(entry) | Lookup::Expired(entry),
            ) => revalidate(request, entry),
            (CachePolicy::Request | CachePolicy::IgnoreRequest, Lookup::Fresh(entry)) => {
                serve(entry)
            }
            (CachePolicy::Request | CachePolicy::IgnoreRequest, Lookup::Expired(entry)) => {
                revalidate(request, entry)
            }
        }
    }

    /// Response path: decides whether the exchange is stored.
    ///
    /// A `304 Not Modified` is merged into the entry it was conditional on;
    /// any other response becomes a new entry. The returned entry is plaintext.
    pub fn on_response(
        &self,
        exchange: Exchange<'_>,
    ) -> Result<Cacheability<CacheEntry, Skip>, HeaderCodecError> {
        if !self.options.allows_method(exchange.request.method()) {
            return Ok(Cacheability::NonCacheable(Skip::Method));
        }

        if self.options.policy == CachePolicy::NoCache {
            return Ok(Cacheability::NonCacheable(Skip::Policy));
        }

        let response_directives = CacheControl::from_headers(exchange.response.headers());
        let request_directives = CacheControl::from_headers(exchange.request.headers());
        if response_directives.no_store || request_directives.no_store {
            return Ok(Cacheability::NonCacheable(Skip::NoStore));
        }

        let max_stale = self.options.max_stale_deadline(exchange.response_date);

        if exchange.response.status() == StatusCode::NOT_MODIFIED {
            let Some(cached) = exchange.cached else {
                return Ok(Cacheability::NonCacheable(Skip::NotModifiedWithoutBasis));
            };
            let entry = cached
                .clone()
                .revalidated(
                    exchange.response.headers(),
                    exchange.request_date,
                    exchange.response_date,
                )?
                .with_priority(self.options.priority);
            let entry = match max_stale {
                Some(_) => entry.with_max_stale(max_stale),
                None => entry,
            };
            return Ok(Cacheability::Cacheable(entry));
        }

        if !self.options.policy.forces_caching()
            && max_stale.is_none()
            && !has_freshness_signal(exchange.response)
        {
            return Ok(Cacheability::NonCacheable(Skip::NoFreshnessSignal));
        }

        let entry = CacheEntry::from_response(
            exchange.key,
            exchange.request.uri(),
            exchange.response,
            exchange.request_date,
            exchange.response_date,
        )?
        .with_priority(self.options.priority)
        .with_max_stale(max_stale);
        Ok(Cacheability::Cacheable(entry))
    }
}

fn has_freshness_signal(response: &Response<Bytes>) -> bool {
    let headers = response.headers();
    CacheControl::from_headers(headers).max_age.is_some()
        || headers.contains_key(EXPIRES)
        || headers.contains_key(ETAG)
        || headers.contains_key(LAST_MODIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use freshcache_core::Priority;
    use http::header::CACHE_CONTROL;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn get(uri: &str) -> Request<Bytes> {
        Request::get(uri).body(Bytes::new()).unwrap()
    }

    fn response(headers: &[(&str, &str)]) -> Response<Bytes> {
        let mut builder = Response::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::from_static(b"body")).unwrap()
    }

    fn entry(headers: &[(&str, &str)], served: DateTime<Utc>) -> CacheEntry {
        CacheEntry::from_response(
            "key",
            &"https://example.com/a".parse().unwrap(),
            &response(headers),
            served,
            served,
        )
        .unwrap()
    }

    fn options(policy: CachePolicy) -> CacheOptions {
        CacheOptions::builder().policy(policy).build()
    }

    fn exchange<'a>(
        request: &'a Request<Bytes>,
        response: &'a Response<Bytes>,
        cached: Option<&'a CacheEntry>,
    ) -> Exchange<'a> {
        Exchange {
            key: "key",
            request,
            response,
            cached,
            request_date: at(10),
            response_date: at(11),
        }
    }

    #[test]
    fn miss_fetches() {
        let options = CacheOptions::default();
        let strategy =
            CacheStrategyFactory::new(&options).on_request(get("https://example.com/a"), None, at(0));
        assert!(matches!(strategy, CacheStrategy::Network(_)));
    }

    #[test]
    fn fresh_entry_is_served() {
        let options = CacheOptions::default();
        let cached = entry(&[("cache-control", "max-age=60")], at(0));
        let strategy = CacheStrategyFactory::new(&options).on_request(
            get("https://example.com/a"),
            Some(cached.clone()),
            at(59),
        );
        match strategy {
            CacheStrategy::Cached(entry) => assert_eq!(entry, cached),
            other => panic!("expected cached, got {other:?}"),
        }
    }

    #[test]
    fn expired_entry_with_etag_is_revalidated() {
        let options = CacheOptions::default();
        let cached = entry(
            &[("cache-control", "max-age=60"), ("etag", "\"5678\"")],
            at(0),
        );
        let strategy = CacheStrategyFactory::new(&options).on_request(
            get("https://example.com/a"),
            Some(cached),
            at(60),
        );
        match strategy {
            CacheStrategy::Conditional { request, cached } => {
                assert_eq!(request.headers()[IF_NONE_MATCH], "\"5678\"");
                assert!(!request.headers().contains_key(IF_MODIFIED_SINCE));
                assert_eq!(cached.etag.as_deref(), Some("\"5678\""));
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn last_modified_is_the_fallback_validator() {
        let last_modified = "Tue, 14 Nov 2023 22:00:00 GMT";
        let cached = entry(&[("last-modified", last_modified)], at(0));
        let strategy = revalidate(get("https://example.com/a?q=1"), cached);
        match strategy {
            CacheStrategy::Conditional { request, .. } => {
                assert_eq!(request.headers()[IF_MODIFIED_SINCE], last_modified);
                assert!(!request.headers().contains_key(IF_NONE_MATCH));
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn expired_entry_without_validator_is_refetched() {
        let options = CacheOptions::default();
        let cached = entry(&[("cache-control", "max-age=1")], at(0));
        let strategy = CacheStrategyFactory::new(&options).on_request(
            get("https://example.com/a"),
            Some(cached),
            at(5),
        );
        match strategy {
            CacheStrategy::Network(request) => {
                assert!(!request.headers().contains_key(IF_NONE_MATCH));
                assert!(!request.headers().contains_key(IF_MODIFIED_SINCE));
            }
            other => panic!("expected network, got {other:?}"),
        }
    }

    #[test]
    fn request_no_cache_forces_revalidation() {
        let options = CacheOptions::default();
        let cached = entry(&[("cache-control", "max-age=600"), ("etag", "\"1\"")], at(0));
        let request = Request::get("https://example.com/a")
            .header(CACHE_CONTROL, "no-cache")
            .body(Bytes::new())
            .unwrap();
        let strategy = CacheStrategyFactory::new(&options).on_request(request, Some(cached), at(1));
        assert!(matches!(strategy, CacheStrategy::Conditional { .. }));
    }

    #[test]
    fn request_max_stale_extends_freshness() {
        let options = CacheOptions::default();
        let cached = entry(&[("cache-control", "max-age=10")], at(0));
        let request = Request::get("https://example.com/a")
            .header(CACHE_CONTROL, "max-stale=30")
            .body(Bytes::new())
            .unwrap();
        let lookup = CacheStrategyFactory::new(&options).lookup(&request, Some(cached), at(20));
        assert!(matches!(lookup, Lookup::Fresh(_)));
    }

    #[test]
    fn force_cache_serves_expired_entries() {
        let options = options(CachePolicy::ForceCache);
        let cached = entry(&[], at(0));
        let strategy = CacheStrategyFactory::new(&options).on_request(
            get("https://example.com/a"),
            Some(cached),
            at(86_400),
        );
        assert!(matches!(strategy, CacheStrategy::Cached(_)));
    }

    #[test]
    fn refresh_ignores_freshness() {
        let cached = entry(&[("cache-control", "max-age=600"), ("etag", "\"1\"")], at(0));
        for policy in [CachePolicy::Refresh, CachePolicy::RefreshForceCache] {
            let options = options(policy);
            let strategy = CacheStrategyFactory::new(&options).on_request(
                get("https://example.com/a"),
                Some(cached.clone()),
                at(1),
            );
            assert!(
                matches!(strategy, CacheStrategy::Conditional { .. }),
                "{policy} should revalidate"
            );
        }
    }

    #[test]
    fn no_cache_policy_always_fetches() {
        let options = options(CachePolicy::NoCache);
        let cached = entry(&[("cache-control", "max-age=600")], at(0));
        let strategy = CacheStrategyFactory::new(&options).on_request(
            get("https://example.com/a"),
            Some(cached),
            at(1),
        );
        assert!(matches!(strategy, CacheStrategy::Network(_)));
    }

    #[test]
    fn ignore_request_applies_heuristic_to_query_urls() {
        // Last-Modified 1000s before the response: heuristic lifetime is 100s.
        let cached = entry(&[("last-modified", "Tue, 14 Nov 2023 21:56:40 GMT")], at(0));
        let cached = CacheEntry {
            url: "https://example.com/a?page=1".to_owned(),
            ..cached
        };
        let request = get("https://example.com/a?page=1");

        let default = CacheOptions::default();
        let lookup = CacheStrategyFactory::new(&default).lookup(&request, Some(cached.clone()), at(50));
        assert!(matches!(lookup, Lookup::Expired(_)));

        let ignore = options(CachePolicy::IgnoreRequest);
        let lookup = CacheStrategyFactory::new(&ignore).lookup(&request, Some(cached), at(50));
        assert!(matches!(lookup, Lookup::Fresh(_)));
    }

    #[test]
    fn non_get_methods_are_skipped() {
        let options = CacheOptions::default();
        let request = Request::post("https://example.com/a").body(Bytes::new()).unwrap();
        let response = response(&[("cache-control", "max-age=60")]);
        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &response, None))
            .unwrap();
        assert_eq!(decision, Cacheability::NonCacheable(Skip::Method));

        let options = CacheOptions::builder().allow_post_method(true).build();
        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &response, None))
            .unwrap();
        assert!(decision.is_cacheable());
    }

    #[test]
    fn no_store_is_never_cached() {
        let request = get("https://example.com/a");
        let response = response(&[("cache-control", "no-store, max-age=60")]);
        for policy in [
            CachePolicy::Request,
            CachePolicy::ForceCache,
            CachePolicy::RefreshForceCache,
        ] {
            let options = options(policy);
            let decision = CacheStrategyFactory::new(&options)
                .on_response(exchange(&request, &response, None))
                .unwrap();
            assert_eq!(decision, Cacheability::NonCacheable(Skip::NoStore));
        }
    }

    #[test]
    fn no_cache_policy_skips_the_write() {
        let options = options(CachePolicy::NoCache);
        let request = get("https://example.com/a");
        let response = response(&[("cache-control", "max-age=60")]);
        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &response, None))
            .unwrap();
        assert_eq!(decision, Cacheability::NonCacheable(Skip::Policy));
    }

    #[test]
    fn no_cache_policy_wins_over_no_store() {
        let options = options(CachePolicy::NoCache);
        let request = get("https://example.com/a");
        let response = response(&[("cache-control", "no-store")]);
        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &response, None))
            .unwrap();
        assert_eq!(decision, Cacheability::NonCacheable(Skip::Policy));
    }

    #[test]
    fn not_modified_is_merged_into_the_basis() {
        let options = CacheOptions::default();
        let cached = entry(&[("etag", "\"5678\""), ("x-old", "1")], at(0));
        let request = get("https://example.com/a");
        let not_modified = Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header("etag", "\"5678\"")
            .header("cache-control", "max-age=30")
            .body(Bytes::new())
            .unwrap();

        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &not_modified, Some(&cached)))
            .unwrap();
        let merged = decision.cacheable().unwrap();
        assert_eq!(merged.etag.as_deref(), Some("\"5678\""));
        assert_eq!(merged.content, cached.content);
        assert_eq!(merged.cache_control.max_age, Some(30));
        assert_eq!(merged.request_date, at(10));
        assert_eq!(merged.response_date, at(11));
        assert_eq!(merged.header_map().unwrap()["x-old"], "1");

        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &not_modified, None))
            .unwrap();
        assert_eq!(
            decision,
            Cacheability::NonCacheable(Skip::NotModifiedWithoutBasis)
        );
    }

    #[test]
    fn responses_without_signal_need_a_forcing_policy() {
        let request = get("https://example.com/a");
        let bare = response(&[]);

        let default_options = CacheOptions::default();
        let decision = CacheStrategyFactory::new(&default_options)
            .on_response(exchange(&request, &bare, None))
            .unwrap();
        assert_eq!(decision, Cacheability::NonCacheable(Skip::NoFreshnessSignal));

        for policy in [CachePolicy::ForceCache, CachePolicy::RefreshForceCache] {
            let options = options(policy);
            let decision = CacheStrategyFactory::new(&options)
                .on_response(exchange(&request, &bare, None))
                .unwrap();
            assert!(decision.is_cacheable(), "{policy} should cache");
        }

        let options = CacheOptions::builder()
            .max_stale(Duration::from_secs(60))
            .build();
        let decision = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &bare, None))
            .unwrap();
        assert!(decision.is_cacheable());
    }

    #[test]
    fn written_entry_carries_options_and_dates() {
        let options = CacheOptions::builder()
            .policy(CachePolicy::ForceCache)
            .priority(Priority::High)
            .max_stale(Duration::from_secs(1))
            .build();
        let request = get("https://example.com/a");
        let response = response(&[("etag", "\"1\""), ("expires", "garbage")]);

        let entry = CacheStrategyFactory::new(&options)
            .on_response(exchange(&request, &response, None))
            .unwrap()
            .cacheable()
            .unwrap();
        assert_eq!(entry.key, "key");
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.request_date, at(10));
        assert_eq!(entry.response_date, at(11));
        assert_eq!(entry.max_stale, Some(at(11) + TimeDelta::seconds(1)));
        assert_eq!(entry.expires, Some(DateTime::<Utc>::UNIX_EPOCH));
        assert_eq!(entry.url, "https://example.com/a");
    }

    #[test]
    fn network_fill_statuses() {
        assert!(is_network_fill(StatusCode::OK));
        assert!(is_network_fill(StatusCode::NOT_MODIFIED));
        assert!(!is_network_fill(StatusCode::CREATED));
        assert!(!is_network_fill(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
