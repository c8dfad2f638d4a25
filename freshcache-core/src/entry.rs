//! Persisted representation of one cached HTTP exchange.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{AGE, CONTENT_LENGTH, DATE, ETAG, EXPIRES, LAST_MODIFIED};
use http::{HeaderMap, Response, StatusCode, Uri};
use serde::{Deserialize, Serialize};

use crate::cache_control::CacheControl;
use crate::headers::{self, HeaderCodecError, header_str, parse_http_date};

/// Eviction hint attached to an entry. Ignored by freshness computations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Evicted first.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Evicted last.
    High,
}

/// Marks where a materialized response came from.
///
/// Inserted into the extensions of every response produced by
/// [`CacheEntry::into_response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSource {
    /// `true` when the entry was just filled or revalidated by the network.
    pub from_network: bool,
}

/// One cached HTTP exchange.
///
/// `content` and `headers` are opaque byte buffers. Depending on where the entry
/// is observed they are either both plaintext or both encrypted; freshness
/// computations expect plaintext headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Stable identity of the entry inside a store.
    pub key: String,
    /// Directives of the stored response.
    pub cache_control: CacheControl,
    /// Response body.
    pub content: Option<Bytes>,
    /// Serialized response headers, see [`crate::headers`].
    pub headers: Option<Bytes>,
    /// Response `Date` header.
    pub date: Option<DateTime<Utc>>,
    /// Response `ETag` header.
    pub etag: Option<String>,
    /// Response `Expires` header; epoch zero when present but unparsable.
    pub expires: Option<DateTime<Utc>>,
    /// Raw response `Last-Modified` header, reused verbatim as a validator.
    pub last_modified: Option<String>,
    /// Absolute deadline past which the entry is purged unless kept alive.
    pub max_stale: Option<DateTime<Utc>>,
    /// Eviction hint.
    pub priority: Priority,
    /// When the network call that produced the entry was dispatched.
    pub request_date: DateTime<Utc>,
    /// When the network response was received.
    pub response_date: DateTime<Utc>,
    /// Request URL.
    pub url: String,
}

impl CacheEntry {
    /// Builds an entry from a network response.
    ///
    /// Validators, `Cache-Control`, `Date` and `Expires` are copied from the
    /// response headers. `request_date` must be the dispatch time of the call.
    pub fn from_response(
        key: impl Into<String>,
        url: &Uri,
        response: &Response<Bytes>,
        request_date: DateTime<Utc>,
        response_date: DateTime<Utc>,
    ) -> Result<Self, HeaderCodecError> {
        let response_headers = response.headers();
        Ok(CacheEntry {
            key: key.into(),
            cache_control: CacheControl::from_headers(response_headers),
            content: Some(response.body().clone()),
            headers: Some(headers::encode(response_headers)?),
            date: header_str(response_headers, &DATE).and_then(parse_http_date),
            etag: header_str(response_headers, &ETAG).map(str::to_owned),
            expires: parse_expires(response_headers),
            last_modified: header_str(response_headers, &LAST_MODIFIED).map(str::to_owned),
            max_stale: None,
            priority: Priority::default(),
            request_date,
            response_date: response_date.max(request_date),
            url: url.to_string(),
        })
    }

    /// Returns the entry with the given priority.
    pub fn with_priority(self, priority: Priority) -> Self {
        CacheEntry { priority, ..self }
    }

    /// Returns the entry with the given extension max-stale deadline.
    pub fn with_max_stale(self, max_stale: Option<DateTime<Utc>>) -> Self {
        CacheEntry { max_stale, ..self }
    }

    /// Returns the entry with content and headers replaced by `content` and `headers`.
    pub fn with_buffers(self, content: Option<Bytes>, headers: Option<Bytes>) -> Self {
        CacheEntry {
            content,
            headers,
            ..self
        }
    }

    /// Decodes the stored headers. An entry without headers yields an empty map.
    pub fn header_map(&self) -> Result<HeaderMap, HeaderCodecError> {
        match &self.headers {
            Some(bytes) => headers::decode(bytes),
            None => Ok(HeaderMap::new()),
        }
    }

    /// Merges a `304 Not Modified` answer into the entry.
    ///
    /// Content is kept. Validators, `Cache-Control` and `Expires` are refreshed
    /// when the 304 carries them, stored headers are merged by name (never
    /// `Content-Length`), and the exchange timestamps are replaced so that the
    /// age restarts from this revalidation. A 304 without `Date` is dated at
    /// `response_date`, and a stored `Age` is dropped unless the 304 sends one.
    pub fn revalidated(
        self,
        not_modified: &HeaderMap,
        request_date: DateTime<Utc>,
        response_date: DateTime<Utc>,
    ) -> Result<Self, HeaderCodecError> {
        let mut stored = self.header_map()?;
        headers::merge(&mut stored, not_modified, &[CONTENT_LENGTH]);
        if !not_modified.contains_key(AGE) {
            stored.remove(AGE);
        }
        let response_date = response_date.max(request_date);

        let cache_control = if not_modified.contains_key(http::header::CACHE_CONTROL) {
            CacheControl::from_headers(not_modified)
        } else {
            self.cache_control
        };

        Ok(CacheEntry {
            cache_control,
            headers: Some(headers::encode(&stored)?),
            date: header_str(not_modified, &DATE)
                .and_then(parse_http_date)
                .or(Some(response_date)),
            etag: header_str(not_modified, &ETAG)
                .map(str::to_owned)
                .or(self.etag),
            expires: parse_expires(not_modified).or(self.expires),
            last_modified: header_str(not_modified, &LAST_MODIFIED)
                .map(str::to_owned)
                .or(self.last_modified),
            request_date,
            response_date,
            ..self
        })
    }

    /// Merges `update` into the stored headers, keeping names it does not carry.
    pub fn with_merged_headers(self, update: &HeaderMap) -> Result<Self, HeaderCodecError> {
        let mut stored = self.header_map()?;
        headers::merge(&mut stored, update, &[CONTENT_LENGTH]);
        Ok(CacheEntry {
            headers: Some(headers::encode(&stored)?),
            ..self
        })
    }

    /// Materializes the entry as a response.
    ///
    /// Cached responses always carry status `304 Not Modified`; the stored
    /// headers and content are returned as-is and a [`CacheSource`] extension
    /// records whether the network was involved.
    pub fn into_response(self, from_network: bool) -> Result<Response<Bytes>, HeaderCodecError> {
        let headers = self.header_map()?;
        let mut response = Response::new(self.content.unwrap_or_default());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        *response.headers_mut() = headers;
        response.extensions_mut().insert(CacheSource { from_network });
        Ok(response)
    }

    /// Total size of the opaque buffers in bytes.
    pub fn buffers_len(&self) -> usize {
        self.content.as_ref().map_or(0, Bytes::len) + self.headers.as_ref().map_or(0, Bytes::len)
    }
}

/// `Expires` is epoch zero (already expired) when present but unparsable.
fn parse_expires(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get(EXPIRES)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(parse_http_date)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        })
}
