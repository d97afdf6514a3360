//! HTTP mocks: request templates answered without touching the network.
//!
//! A `MockSet` is the fragment a mock reducer owns. `MockRegistry::install`
//! is the collector; the code under test routes its requests through
//! `MockRegistry::handle`, and tests check traffic with the
//! `assert_requested` / `refute_requested` helpers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, TestkitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Any,
}

impl HttpMethod {
    /// Whether a declared request body takes part in matching.
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    fn accepts(self, actual: HttpMethod) -> bool {
        self == HttpMethod::Any || self == actual
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Any => "ANY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum UrlPattern {
    Exact(String),
    Regex(Regex),
}

impl UrlPattern {
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(UrlPattern::Regex(Regex::new(pattern)?))
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Exact(expected) => expected == url,
            UrlPattern::Regex(re) => re.is_match(url),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(url: &str) -> Self {
        UrlPattern::Exact(url.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(url: String) -> Self {
        UrlPattern::Exact(url)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Exact(url) => f.write_str(url),
            UrlPattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Builds a response body from the request that hit the mock.
pub type Responder = Arc<dyn Fn(&RecordedRequest) -> String + Send + Sync>;

#[derive(Clone)]
pub enum MockResponse {
    /// Serialized as JSON.
    Json(Value),
    Dynamic(Responder),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockResponse::Json(value) => f.debug_tuple("Json").field(value).finish(),
            MockResponse::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// One request template and its canned answer.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: HttpMethod,
    pub url: UrlPattern,
    /// Body that POST/PUT/PATCH requests must carry.
    pub request: Option<Value>,
    /// Substring the body must contain. Takes precedence over `request`.
    pub wildcard: Option<String>,
    pub code: Option<u16>,
    pub response: MockResponse,
}

impl MockRequest {
    pub fn new(method: HttpMethod, url: impl Into<UrlPattern>) -> Self {
        Self {
            method,
            url: url.into(),
            request: None,
            wildcard: None,
            code: None,
            response: MockResponse::Json(Value::Null),
        }
    }

    pub fn with_request(mut self, body: impl Into<Value>) -> Self {
        self.request = Some(body.into());
        self
    }

    pub fn with_wildcard(mut self, needle: impl Into<String>) -> Self {
        self.wildcard = Some(needle.into());
        self
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn responding(mut self, body: impl Into<Value>) -> Self {
        self.response = MockResponse::Json(body.into());
        self
    }

    pub fn responding_with(
        mut self,
        responder: impl Fn(&RecordedRequest) -> String + Send + Sync + 'static,
    ) -> Self {
        self.response = MockResponse::Dynamic(Arc::new(responder));
        self
    }

    fn matches(&self, request: &RecordedRequest) -> bool {
        if !self.method.accepts(request.method) || !self.url.matches(&request.url) {
            return false;
        }
        if let Some(needle) = &self.wildcard {
            return request
                .body
                .as_deref()
                .is_some_and(|body| body.contains(needle.as_str()));
        }
        match &self.request {
            Some(expected) if request.method.carries_body() => {
                body_matches(expected, request.body.as_deref())
            }
            _ => true,
        }
    }
}

fn body_matches(expected: &Value, body: Option<&str>) -> bool {
    let Some(body) = body else {
        return false;
    };
    if let Value::String(raw) = expected {
        if raw == body {
            return true;
        }
    }
    serde_json::from_str::<Value>(body).is_ok_and(|parsed| &parsed == expected)
}

/// Ordered request templates owned by one reducer slot.
#[derive(Debug, Clone, Default)]
pub struct MockSet {
    requests: Vec<MockRequest>,
}

impl MockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, request: MockRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn push(&mut self, request: MockRequest) {
        self.requests.push(request);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MockRequest> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl FromIterator<MockRequest> for MockSet {
    fn from_iter<T: IntoIterator<Item = MockRequest>>(iter: T) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}

/// A request the code under test issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
}

impl MockReply {
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// What a test expects to have been requested.
#[derive(Debug, Clone)]
pub struct RequestExpectation {
    pub method: HttpMethod,
    pub url: UrlPattern,
    /// Substring the body must contain.
    pub body: Option<String>,
    pub times: usize,
}

impl RequestExpectation {
    pub fn new(method: HttpMethod, url: impl Into<UrlPattern>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            times: 1,
        }
    }

    pub fn with_body(mut self, needle: impl Into<String>) -> Self {
        self.body = Some(needle.into());
        self
    }

    pub fn times(mut self, times: usize) -> Self {
        self.times = times;
        self
    }

    fn matches(&self, request: &RecordedRequest) -> bool {
        self.method.accepts(request.method)
            && self.url.matches(&request.url)
            && self.body.as_deref().map_or(true, |needle| {
                request
                    .body
                    .as_deref()
                    .is_some_and(|body| body.contains(needle))
            })
    }
}

#[derive(Default)]
struct Traffic {
    mocks: Vec<MockRequest>,
    executed: Vec<RecordedRequest>,
}

/// Live mock table plus the log of executed requests. Clones share state.
#[derive(Clone)]
pub struct MockRegistry {
    inner: Arc<Mutex<Traffic>>,
    default_status: u16,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::with_default_status(200)
    }

    pub fn with_default_status(default_status: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Traffic::default())),
            default_status,
        }
    }

    /// Make every request template of `set` live.
    pub fn install(&self, set: &MockSet) -> anyhow::Result<()> {
        let mut traffic = self.lock();
        for mock in set.iter() {
            debug!(method = %mock.method, url = %mock.url, "mock installed");
            traffic.mocks.push(mock.clone());
        }
        Ok(())
    }

    /// Answer a request. The most recently installed matching mock wins;
    /// a request nothing matches is an error, never a pass-through.
    pub fn handle(&self, method: HttpMethod, url: &str, body: Option<&str>) -> Result<MockReply> {
        let request = RecordedRequest {
            method,
            url: url.to_string(),
            body: body.map(str::to_string),
            requested_at: Utc::now(),
        };

        let matched = {
            let mut traffic = self.lock();
            traffic.executed.push(request.clone());
            traffic
                .mocks
                .iter()
                .rev()
                .find(|mock| mock.matches(&request))
                .cloned()
        };

        let Some(mock) = matched else {
            warn!(%method, url, "unmatched request");
            return Err(TestkitError::NoMatchingMock {
                method,
                url: url.to_string(),
            });
        };

        let body = match &mock.response {
            MockResponse::Json(value) => value.to_string(),
            MockResponse::Dynamic(responder) => responder(&request),
        };
        Ok(MockReply {
            status: mock.code.unwrap_or(self.default_status),
            body,
        })
    }

    pub fn executed(&self) -> Vec<RecordedRequest> {
        self.lock().executed.clone()
    }

    pub fn count(&self, expectation: &RequestExpectation) -> usize {
        self.lock()
            .executed
            .iter()
            .filter(|request| expectation.matches(request))
            .count()
    }

    /// Fails unless exactly `expectation.times` matching requests were made.
    pub fn assert_requested(&self, expectation: &RequestExpectation) -> Result<()> {
        let seen = self.count(expectation);
        if seen == expectation.times {
            return Ok(());
        }
        Err(TestkitError::Expectation(format!(
            "{} {} expected {} time(s), requested {}",
            expectation.method, expectation.url, expectation.times, seen
        )))
    }

    /// Fails if any matching request was made.
    pub fn refute_requested(&self, expectation: &RequestExpectation) -> Result<()> {
        let seen = self.count(expectation);
        if seen == 0 {
            return Ok(());
        }
        Err(TestkitError::Expectation(format!(
            "{} {} expected never, requested {}",
            expectation.method, expectation.url, seen
        )))
    }

    /// Forget executed requests; installed mocks stay live.
    pub fn clear_expectations(&self) {
        self.lock().executed.clear();
    }

    /// Forget mocks and executed requests.
    pub fn reset(&self) {
        let mut traffic = self.lock();
        traffic.mocks.clear();
        traffic.executed.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Traffic> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let traffic = self.lock();
        f.debug_struct("MockRegistry")
            .field("mocks", &traffic.mocks.len())
            .field("executed", &traffic.executed.len())
            .field("default_status", &self.default_status)
            .finish()
    }
}
