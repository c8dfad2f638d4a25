//! `Cache-Control` directive parsing.
//!
//! The same [`CacheControl`] type represents both sides of an exchange:
//!
//! - **Request side** - `max-age`, `max-stale`, `min-fresh`, `no-cache`,
//!   `no-store`, `only-if-cached` tune how stale a cached answer may be
//! - **Response side** - `max-age`, `no-cache`, `no-store`, `must-revalidate`
//!   describe how long the origin allows the response to be reused
//!
//! Numeric directives are seconds. An absent, malformed or negative value is
//! `None`, never zero:
//!
//! ```
//! use freshcache_core::CacheControl;
//!
//! let cc = CacheControl::parse(Some("Max-Age=60, no-cache, max-stale=-1, x-custom"));
//! assert_eq!(cc.max_age, Some(60));
//! assert!(cc.no_cache);
//! assert_eq!(cc.max_stale, None);
//!
//! assert_eq!(CacheControl::parse(None), CacheControl::default());
//! ```

use std::fmt;

use http::HeaderMap;
use http::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};

/// Parsed `Cache-Control` directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheControl {
    /// `no-cache`: a stored response must be revalidated before reuse.
    pub no_cache: bool,
    /// `no-store`: nothing about the exchange may be stored.
    pub no_store: bool,
    /// `must-revalidate`: stale responses may not be served (ignores request `max-stale`).
    pub must_revalidate: bool,
    /// `max-age` in seconds.
    pub max_age: Option<u64>,
    /// `max-stale` in seconds.
    pub max_stale: Option<u64>,
    /// `min-fresh` in seconds.
    pub min_fresh: Option<u64>,
    /// `only-if-cached`: the client refuses a network round trip.
    pub only_if_cached: bool,
    /// `private`.
    pub private: bool,
    /// `public`.
    pub public: bool,
}

impl CacheControl {
    /// Parses a raw header value. `None` yields the default (empty) directive set.
    pub fn parse(value: Option<&str>) -> Self {
        let mut cc = CacheControl::default();
        let Some(value) = value else {
            return cc;
        };

        for token in value.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (name, argument) = match token.split_once('=') {
                Some((name, argument)) => (name.trim(), Some(argument.trim())),
                None => (token, None),
            };

            match name.to_ascii_lowercase().as_str() {
                "no-cache" => cc.no_cache = true,
                "no-store" => cc.no_store = true,
                "must-revalidate" => cc.must_revalidate = true,
                "only-if-cached" => cc.only_if_cached = true,
                "private" => cc.private = true,
                "public" => cc.public = true,
                "max-age" => set_once(&mut cc.max_age, argument),
                "max-stale" => set_once(&mut cc.max_stale, argument),
                "min-fresh" => set_once(&mut cc.min_fresh, argument),
                _ => {}
            }
        }
        cc
    }

    /// Parses the first `Cache-Control` header of `headers`.
    ///
    /// Later occurrences of the header are ignored. A header value that is not
    /// visible ASCII is treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::parse(headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok()))
    }

    /// Returns `true` when no directive is set.
    pub fn is_empty(&self) -> bool {
        *self == CacheControl::default()
    }

    /// Renders the directives back into a header value.
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

fn set_once(slot: &mut Option<u64>, argument: Option<&str>) {
    if slot.is_some() {
        return;
    }
    *slot = argument.and_then(parse_seconds);
}

fn parse_seconds(argument: &str) -> Option<u64> {
    let argument = argument
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(argument);
    argument.parse::<u64>().ok()
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.public, "public"),
            (self.private, "private"),
            (self.no_cache, "no-cache"),
            (self.no_store, "no-store"),
            (self.must_revalidate, "must-revalidate"),
            (self.only_if_cached, "only-if-cached"),
        ];
        let numbers = [
            ("max-age", self.max_age),
            ("max-stale", self.max_stale),
            ("min-fresh", self.min_fresh),
        ];

        let mut directives = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| (*name).to_owned())
            .chain(
                numbers
                    .iter()
                    .filter_map(|(name, value)| value.map(|v| format!("{name}={v}"))),
            );

        if let Some(first) = directives.next() {
            f.write_str(&first)?;
            for directive in directives {
                write!(f, ", {directive}")?;
            }
        }
        Ok(())
    }
}
