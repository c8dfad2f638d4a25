//! Shared fixtures: scripted upstream, manual clock and a toy cipher.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use freshcache::{Cipher, CipherError, Clock, TransportError, Upstream};
use http::{HeaderMap, Request, Response, StatusCode};

pub type UpstreamResult = Result<Response<Bytes>, TransportError>;

// =============================================================================
// Scripted Upstream
// =============================================================================

/// Upstream answering with queued results, recording every request it sees.
#[derive(Clone, Default)]
pub struct ScriptedUpstream {
    pub call_count: Arc<AtomicUsize>,
    responses: Arc<Mutex<VecDeque<UpstreamResult>>>,
    requests: Arc<Mutex<Vec<HeaderMap>>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Response<Bytes>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::failed("connection refused")));
        self
    }

    pub fn cancel(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Cancelled));
        self
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Headers of the last request sent to the origin.
    pub fn last_request_headers(&self) -> HeaderMap {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Upstream<Request<Bytes>> for ScriptedUpstream {
    type Response = UpstreamResult;
    type Future = Pin<Box<dyn Future<Output = UpstreamResult> + Send>>;

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.headers().clone());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::failed("no response scripted")));
        Box::pin(async move { next })
    }
}

// =============================================================================
// Manual Clock
// =============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Fixed origin of every test timeline.
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

// =============================================================================
// Cipher
// =============================================================================

pub struct XorCipher(pub u8);

impl Cipher for XorCipher {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(data.iter().map(|b| b ^ self.0).collect())
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.encrypt(data)
    }
}

// =============================================================================
// Requests and responses
// =============================================================================

pub const URL: &str = "https://api.example.com/items/42";

pub fn get(uri: &str) -> Request<Bytes> {
    Request::get(uri).body(Bytes::new()).unwrap()
}

pub fn get_with(uri: &str, headers: &[(&str, &str)]) -> Request<Bytes> {
    let mut builder = Request::get(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::new()).unwrap()
}

pub fn response(status: StatusCode, headers: &[(&str, &str)], body: &'static str) -> Response<Bytes> {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::from_static(body.as_bytes())).unwrap()
}

pub fn ok(headers: &[(&str, &str)], body: &'static str) -> Response<Bytes> {
    response(StatusCode::OK, headers, body)
}

pub fn not_modified(headers: &[(&str, &str)]) -> Response<Bytes> {
    response(StatusCode::NOT_MODIFIED, headers, "")
}
