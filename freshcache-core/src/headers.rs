//! Header map codec and HTTP-date helpers.
//!
//! Stored headers are a JSON object mapping a lowercase header name to the list
//! of its values, which keeps multi-valued headers such as `Set-Cookie` intact:
//!
//! ```text
//! {"content-type":["text/plain"],"set-cookie":["a=1","b=2"]}
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

/// Error raised while encoding or decoding a stored header map.
#[derive(Debug, Error)]
pub enum HeaderCodecError {
    /// The stored bytes are not a valid header map document.
    #[error("malformed stored headers: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored header name is not a valid HTTP header name.
    #[error("invalid stored header name `{0}`")]
    InvalidName(String),
    /// A stored header value is not a valid HTTP header value.
    #[error("invalid stored value for header `{0}`")]
    InvalidValue(String),
}

type StoredHeaders = BTreeMap<String, Vec<String>>;

/// Serializes a header map into bytes.
///
/// Values that are not valid UTF-8 are stored lossily.
pub fn encode(headers: &HeaderMap) -> Result<Bytes, HeaderCodecError> {
    let mut stored = StoredHeaders::new();
    for (name, value) in headers {
        stored
            .entry(name.as_str().to_owned())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Ok(Bytes::from(serde_json::to_vec(&stored)?))
}

/// Deserializes bytes produced by [`encode`] back into a header map.
pub fn decode(bytes: &[u8]) -> Result<HeaderMap, HeaderCodecError> {
    let stored: StoredHeaders = serde_json::from_slice(bytes)?;
    let mut headers = HeaderMap::new();
    for (name, values) in stored {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HeaderCodecError::InvalidName(name.clone()))?;
        for value in values {
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| HeaderCodecError::InvalidValue(name.clone()))?;
            headers.append(header_name.clone(), header_value);
        }
    }
    Ok(headers)
}

/// Merges `update` into `base`.
///
/// Every header name present in `update` replaces all of its values in `base`;
/// names listed in `skip` are left untouched; other names of `base` survive.
pub fn merge(base: &mut HeaderMap, update: &HeaderMap, skip: &[HeaderName]) {
    for name in update.keys() {
        if skip.contains(name) {
            continue;
        }
        base.remove(name);
        for value in update.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
}

/// Returns the first value of `name` as a string, if it is visible ASCII.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parses an HTTP-date (IMF-fixdate, RFC 850 or asctime format).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    httpdate::parse_http_date(value.trim())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Formats a timestamp as an IMF-fixdate.
pub fn format_http_date(value: DateTime<Utc>) -> String {
    httpdate::fmt_http_date(value.into())
}
