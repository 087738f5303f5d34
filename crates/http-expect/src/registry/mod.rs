//! The expectation registry.
//!
//! A [`Registry`] owns the list of expected requests and the log of received
//! ones. Registration, consumption and assertions all go through a single
//! mutex, so a registry can be shared between a test and a running server.

mod assertions;
mod handle;

#[cfg(test)]
mod tests;

pub use handle::{ExpectationHandle, ResponseHandle};

use crate::error::MockError;
use crate::expectation::{ExpectedBody, ExpectedMethod, Expectation};
use crate::matching::{find_closest, find_expected, ExactMatch};
use crate::request::Request;
use crate::response::Response;
use crate::sink::FailureSink;
use crate::url::RequestUrl;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A request that was consumed successfully, as it was logged.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequest {
    pub method: String,
    pub url: RequestUrl,
    pub headers: Vec<(String, String)>,
    #[serde(serialize_with = "serialize_body")]
    pub body: Bytes,
    /// Copy of the response that was returned, taken at consumption time.
    #[serde(skip)]
    pub response: Option<Response>,
    pub received_at: DateTime<Utc>,
}

fn serialize_body<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(body))
}

impl RecordedRequest {
    fn new(received: &Request, body: Bytes, response: Option<Response>) -> Self {
        Self {
            method: received.method().to_string(),
            url: received.url().clone(),
            headers: received.headers().to_vec(),
            body,
            response,
            received_at: Utc::now(),
        }
    }

    /// Rebuild a live request with a buffered body, for diffing.
    pub fn to_request(&self) -> Request {
        let mut request = Request::new(self.method.clone(), self.url.clone(), self.body.clone());
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        request
    }

    /// The request rendered in the same shape as an expectation.
    fn as_expectation(&self) -> Expectation {
        describe(&self.method, &self.url, self.body.clone())
    }
}

fn describe(method: &str, url: &RequestUrl, body: Bytes) -> Expectation {
    Expectation::new(
        ExpectedMethod::from(method),
        url.clone(),
        ExpectedBody::Exact(body),
    )
}

/// Prefix every line with a tab.
fn indent(text: &str) -> String {
    format!("\t{}", text.replace('\n', "\n\t"))
}

#[derive(Default)]
struct State {
    expected: Vec<Expectation>,
    received: Vec<RecordedRequest>,
}

/// Registry of expected requests and log of received ones.
#[derive(Default)]
pub struct Registry {
    state: Mutex<State>,
    sink: RwLock<Option<Arc<dyn FailureSink>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Registry")
            .field("expected", &state.expected.len())
            .field("received", &state.received.len())
            .field("sink", &self.sink.read().is_some())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that reports fatal failures to `sink` instead of panicking.
    pub fn with_sink(sink: Arc<dyn FailureSink>) -> Self {
        let registry = Self::default();
        registry.set_sink(sink);
        registry
    }

    pub fn set_sink(&self, sink: Arc<dyn FailureSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Register an expectation. A URL that does not parse is fatal.
    pub fn on(
        &self,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> ExpectationHandle<'_> {
        match self.try_on(method, url, body) {
            Ok(handle) => handle,
            Err(e) => self.fail(&e),
        }
    }

    pub fn try_on(
        &self,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> Result<ExpectationHandle<'_>, MockError> {
        let url = RequestUrl::parse(url)?;
        let expectation = Expectation::new(method.into(), url, body.into());
        debug!(method = %expectation.method(), url = %expectation.url(), "registered expectation");

        let mut state = self.state.lock();
        state.expected.push(expectation);
        Ok(ExpectationHandle::new(self, state.expected.len() - 1))
    }

    /// Consume a received request and return the response to send back.
    /// Any failure is fatal.
    pub fn requested(&self, received: &mut Request) -> Response {
        match self.try_requested(received) {
            Ok(response) => response,
            Err(e) => self.fail(&e),
        }
    }

    /// Consume a received request.
    ///
    /// The first expectation that matches exactly and still has uses left is
    /// consumed and its response returned; an expectation without a response
    /// yields an empty `200 OK`. Nothing is logged or consumed on failure.
    pub fn try_requested(&self, received: &mut Request) -> Result<Response, MockError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let body = received.read_body()?;

        match find_expected(&state.expected, received) {
            ExactMatch::Found(index) => {
                let expectation = &mut state.expected[index];
                expectation.record_use();
                debug!(
                    index,
                    method = received.method(),
                    url = %received.url(),
                    total_uses = expectation.total_uses(),
                    "matched expectation"
                );

                let response = expectation.response().cloned();
                state
                    .received
                    .push(RecordedRequest::new(received, body, response.clone()));
                Ok(response.unwrap_or_default())
            }
            ExactMatch::Exhausted(index) => {
                let total_uses = state.expected[index].total_uses();
                warn!(index, total_uses, method = received.method(), url = %received.url(), "expectation exhausted");
                Err(MockError::Exhausted {
                    total_uses,
                    method: received.method().to_string(),
                    url: received.url().to_string(),
                })
            }
            ExactMatch::NotFound => {
                warn!(method = received.method(), url = %received.url(), "no expectation matched");
                match find_closest(&state.expected, received) {
                    Some((closest, diff)) => Err(MockError::Unmatched {
                        request: indent(&describe(received.method(), received.url(), body).to_string()),
                        closest: indent(&closest.to_string()),
                        diff: diff.trim().to_string(),
                    }),
                    None => Err(MockError::Unexpected {
                        method: received.method().to_string(),
                        url: received.url().to_string(),
                    }),
                }
            }
        }
    }

    /// Report `err` to the failure sink and abort. Without a sink, panics
    /// with the rendered error.
    pub fn fail(&self, err: &MockError) -> ! {
        let message = err.to_string();
        let sink = self.sink.read().clone();
        match sink {
            Some(sink) => {
                sink.error(&message);
                sink.fail_now()
            }
            None => panic!("{message}"),
        }
    }

    /// Report `err` to the failure sink without aborting. Does nothing when
    /// no sink is set.
    pub fn report(&self, err: &MockError) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.error(&err.to_string());
        }
    }

    /// Snapshot of every registered expectation, in registration order.
    pub fn expectations(&self) -> Vec<Expectation> {
        self.state.lock().expected.clone()
    }

    /// Snapshot of the received request log.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().received.clone()
    }

    pub(crate) fn with_expectation<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut Expectation) -> R,
    ) -> R {
        let mut state = self.state.lock();
        f(&mut state.expected[index])
    }
}
