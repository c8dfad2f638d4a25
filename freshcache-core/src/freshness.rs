//! Freshness model of a cached entry (RFC 7234 section 4.2).
//!
//! All durations are computed in milliseconds even though directives are
//! second-granular, and the current time is always an argument, so the same
//! inputs always produce the same verdict.
//!
//! - [`CacheEntry::age`] - current age of the stored response
//! - [`CacheEntry::freshness_lifetime`] - how long the response stays fresh
//! - [`CacheEntry::is_expired`] - RFC freshness test against request directives
//! - [`CacheEntry::is_staled`] - extension max-stale deadline test
//!
//! ```
//! use bytes::Bytes;
//! use chrono::{Duration, Utc};
//! use freshcache_core::{CacheControl, CacheEntry, Heuristic};
//! use http::Response;
//!
//! let served = Utc::now();
//! let response = Response::builder()
//!     .header("cache-control", "max-age=60")
//!     .body(Bytes::new())
//!     .unwrap();
//! let entry = CacheEntry::from_response("key", &"/a".parse().unwrap(), &response, served, served)
//!     .unwrap();
//!
//! let request = CacheControl::default();
//! assert!(!entry.is_expired(&request, Heuristic::QuerylessOnly, served + Duration::seconds(59)));
//! assert!(entry.is_expired(&request, Heuristic::QuerylessOnly, served + Duration::seconds(60)));
//! ```

use chrono::{DateTime, Utc};
use http::Uri;
use http::header::AGE;

use crate::cache_control::CacheControl;
use crate::entry::CacheEntry;
use crate::headers::{header_str, parse_http_date};

/// When the `Last-Modified` heuristic may provide a freshness lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Heuristic {
    /// Only for URLs without a query component.
    #[default]
    QuerylessOnly,
    /// For every URL, regardless of its query component.
    Always,
}

impl CacheEntry {
    /// Current age of the stored response in milliseconds.
    pub fn age(&self, now: DateTime<Utc>) -> i64 {
        let apparent_age = self
            .date
            .map_or(0, |date| millis_between(date, self.response_date).max(0));
        let received_age = match self.age_header() {
            Some(age) => apparent_age.max(seconds_to_millis(age)),
            None => apparent_age,
        };
        let response_delay = millis_between(self.request_date, self.response_date);
        let resident_time = millis_between(self.response_date, now);
        received_age
            .saturating_add(response_delay)
            .saturating_add(resident_time)
    }

    /// Freshness lifetime of the stored response in milliseconds.
    ///
    /// `max-age` wins over `Expires`, which wins over the `Last-Modified`
    /// heuristic (10% of the document age when it was served). Without any of
    /// them the response is immediately stale.
    pub fn freshness_lifetime(&self, heuristic: Heuristic) -> i64 {
        if let Some(max_age) = self.cache_control.max_age {
            return seconds_to_millis(max_age);
        }

        let served_at = self.date.unwrap_or(self.response_date);

        if let Some(expires) = self.expires {
            return millis_between(served_at, expires).max(0);
        }

        if let Some(last_modified) = self.last_modified.as_deref().and_then(parse_http_date)
            && (heuristic == Heuristic::Always || !has_query(&self.url))
        {
            let document_age = millis_between(last_modified, served_at);
            return if document_age > 0 {
                (document_age + 5) / 10
            } else {
                0
            };
        }

        0
    }

    /// Returns `true` when the entry may not be served without revalidation.
    ///
    /// `request` holds the directives of the incoming request: `max-age` caps the
    /// freshness lifetime, `min-fresh` demands remaining freshness and `max-stale`
    /// tolerates staleness unless the response said `must-revalidate`. A response
    /// `no-cache` always forces revalidation.
    pub fn is_expired(
        &self,
        request: &CacheControl,
        heuristic: Heuristic,
        now: DateTime<Utc>,
    ) -> bool {
        if self.cache_control.no_cache {
            return true;
        }

        let age = self.age(now);
        let mut fresh = self.freshness_lifetime(heuristic);
        if let Some(max_age) = request.max_age {
            fresh = fresh.min(seconds_to_millis(max_age));
        }
        let min_fresh = request.min_fresh.map_or(0, seconds_to_millis);
        let max_stale = match request.max_stale {
            Some(max_stale) if !self.cache_control.must_revalidate => seconds_to_millis(max_stale),
            _ => 0,
        };

        age.saturating_add(min_fresh) >= fresh.saturating_add(max_stale)
    }

    /// Returns `true` when the extension max-stale deadline has passed.
    pub fn is_staled(&self, now: DateTime<Utc>) -> bool {
        self.max_stale.is_some_and(|deadline| deadline < now)
    }

    fn age_header(&self) -> Option<u64> {
        let headers = self.header_map().ok()?;
        header_str(&headers, &AGE).and_then(|age| age.trim().parse::<u64>().ok())
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds()
}

fn seconds_to_millis(seconds: u64) -> i64 {
    i64::try_from(seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000)
}

fn has_query(url: &str) -> bool {
    match url.parse::<Uri>() {
        Ok(uri) => uri.query().is_some(),
        Err(_) => url.contains('?'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::format_http_date;
    use bytes::Bytes;
    use chrono::{Duration, TimeZone};
    use http::Response;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(n)
    }

    fn entry(url: &str, headers: &[(&str, String)], request: i64, response: i64) -> CacheEntry {
        let mut builder = Response::builder().status(200);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }
        let response_value = builder.body(Bytes::new()).unwrap();
        CacheEntry::from_response(
            "key",
            &url.parse().unwrap(),
            &response_value,
            secs(request),
            secs(response),
        )
        .unwrap()
    }

    fn no_request_directives() -> CacheControl {
        CacheControl::default()
    }

    #[test]
    fn max_age_boundary_is_expired() {
        let e = entry("/a", &[("cache-control", "max-age=10".into())], 0, 0);
        let rq = no_request_directives();
        assert!(!e.is_expired(&rq, Heuristic::QuerylessOnly, secs(0)));
        assert!(!e.is_expired(&rq, Heuristic::QuerylessOnly, secs(10) - Duration::milliseconds(1)));
        assert!(e.is_expired(&rq, Heuristic::QuerylessOnly, secs(10)));
        assert!(e.is_expired(&rq, Heuristic::QuerylessOnly, secs(11)));
    }

    #[test]
    fn age_accounts_for_transit_residency_and_upstream_age() {
        let e = entry(
            "/a",
            &[("date", format_http_date(secs(-2))), ("age", "5".into())],
            0,
            1,
        );
        // received = max(5000, 3000), transit = 1000, resident = 4000
        assert_eq!(e.age(secs(5)), 10_000);

        let without_age = entry("/a", &[("date", format_http_date(secs(-2)))], 0, 1);
        assert_eq!(without_age.age(secs(5)), 3_000 + 1_000 + 4_000);
    }

    #[test]
    fn malformed_age_header_is_ignored() {
        let e = entry("/a", &[("age", "-3".into())], 0, 0);
        assert_eq!(e.age(secs(2)), 2_000);
    }

    #[test]
    fn date_after_response_counts_as_zero_apparent_age() {
        let e = entry("/a", &[("date", format_http_date(secs(30)))], 0, 0);
        assert_eq!(e.age(secs(1)), 1_000);
    }

    #[test]
    fn expires_lifetime_is_relative_to_date() {
        let e = entry(
            "/a",
            &[
                ("date", format_http_date(secs(0))),
                ("expires", format_http_date(secs(30))),
            ],
            0,
            5,
        );
        assert_eq!(e.freshness_lifetime(Heuristic::QuerylessOnly), 30_000);

        let past = entry("/a", &[("expires", format_http_date(secs(-30)))], 0, 0);
        assert_eq!(past.freshness_lifetime(Heuristic::QuerylessOnly), 0);
    }

    #[test]
    fn max_age_wins_over_expires() {
        let e = entry(
            "/a",
            &[
                ("cache-control", "max-age=5".into()),
                ("expires", format_http_date(secs(300))),
            ],
            0,
            0,
        );
        assert_eq!(e.freshness_lifetime(Heuristic::QuerylessOnly), 5_000);
    }

    #[test]
    fn last_modified_heuristic_is_ten_percent() {
        let headers = [
            ("date", format_http_date(secs(0))),
            ("last-modified", format_http_date(secs(-1000))),
        ];
        let e = entry("https://example.com/a", &headers, 0, 0);
        assert_eq!(e.freshness_lifetime(Heuristic::QuerylessOnly), 100_000);
    }

    #[test]
    fn heuristic_is_disabled_for_queries_unless_always() {
        let headers = [("last-modified", format_http_date(secs(-1000)))];
        let e = entry("https://example.com/a?page=2", &headers, 0, 0);
        assert_eq!(e.freshness_lifetime(Heuristic::QuerylessOnly), 0);
        assert_eq!(e.freshness_lifetime(Heuristic::Always), 100_000);
    }

    #[test]
    fn no_signal_means_immediately_stale() {
        let e = entry("/a", &[], 0, 0);
        assert_eq!(e.freshness_lifetime(Heuristic::QuerylessOnly), 0);
        assert!(e.is_expired(&no_request_directives(), Heuristic::QuerylessOnly, secs(0)));
    }

    #[test]
    fn response_no_cache_is_always_expired() {
        let e = entry("/a", &[("cache-control", "no-cache, max-age=600".into())], 0, 0);
        assert!(e.is_expired(&no_request_directives(), Heuristic::QuerylessOnly, secs(0)));
    }

    #[test]
    fn request_directives_tune_the_verdict() {
        let e = entry("/a", &[("cache-control", "max-age=60".into())], 0, 0);

        let max_age = CacheControl::parse(Some("max-age=10"));
        assert!(e.is_expired(&max_age, Heuristic::QuerylessOnly, secs(10)));

        let min_fresh = CacheControl::parse(Some("min-fresh=30"));
        assert!(!e.is_expired(&min_fresh, Heuristic::QuerylessOnly, secs(29)));
        assert!(e.is_expired(&min_fresh, Heuristic::QuerylessOnly, secs(30)));

        let max_stale = CacheControl::parse(Some("max-stale=30"));
        assert!(!e.is_expired(&max_stale, Heuristic::QuerylessOnly, secs(89)));
        assert!(e.is_expired(&max_stale, Heuristic::QuerylessOnly, secs(90)));
    }

    #[test]
    fn must_revalidate_ignores_request_max_stale() {
        let e = entry(
            "/a",
            &[("cache-control", "max-age=60, must-revalidate".into())],
            0,
            0,
        );
        let max_stale = CacheControl::parse(Some("max-stale=30"));
        assert!(e.is_expired(&max_stale, Heuristic::QuerylessOnly, secs(61)));
    }

    #[test]
    fn staled_only_after_deadline() {
        let e = entry("/a", &[], 0, 0).with_max_stale(Some(secs(10)));
        assert!(!e.is_staled(secs(9)));
        assert!(!e.is_staled(secs(10)));
        assert!(e.is_staled(secs(10) + Duration::milliseconds(1)));

        let unpinned = entry("/a", &[], 0, 0);
        assert!(!unpinned.is_staled(secs(1_000_000)));
    }
}
