use super::Registry;
use crate::error::MockError;
use crate::expectation::{ExpectedBody, ExpectedMethod, Expectation, Repeatability, RequestMatcher};
use crate::response::{Response, ResponseWriter};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Builder for an expectation that has been registered.
///
/// ```ignore
/// registry
///     .on("POST", "/users", r#"{"name":"ada"}"#)
///     .respond_ok(r#"{"id":"1234"}"#)
///     .once()
///     .on("DELETE", "/users/1234", None::<&str>)
///     .respond_no_content();
/// ```
#[derive(Clone, Copy)]
pub struct ExpectationHandle<'a> {
    registry: &'a Registry,
    index: usize,
}

impl<'a> ExpectationHandle<'a> {
    pub(super) fn new(registry: &'a Registry, index: usize) -> Self {
        Self { registry, index }
    }

    /// Position of the expectation in registration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Snapshot of the expectation.
    pub fn expectation(&self) -> Expectation {
        self.registry.with_expectation(self.index, |e| e.clone())
    }

    /// Respond with `status` and `body`. An empty body writes nothing.
    pub fn respond(self, status: u16, body: impl Into<Bytes>) -> ResponseHandle<'a> {
        let body = body.into();
        let body = (!body.is_empty()).then_some(body);
        self.set_response(Response::new(status, body))
    }

    pub fn respond_ok(self, body: impl Into<Bytes>) -> ResponseHandle<'a> {
        self.respond(200, body)
    }

    pub fn respond_no_content(self) -> ResponseHandle<'a> {
        self.set_response(Response::new(204, None))
    }

    /// Respond with `value` serialized as JSON and a matching content type.
    /// A value that cannot be serialized is fatal.
    pub fn respond_json<T: Serialize + ?Sized>(self, status: u16, value: &T) -> ResponseHandle<'a> {
        let body = match serde_json::to_vec(value) {
            Ok(body) => body,
            Err(e) => self.registry.fail(&MockError::Config(format!(
                "failed to serialize response body: {e}"
            ))),
        };
        self.respond(status, body)
            .header("Content-Type", "application/json")
    }

    /// Let `writer` produce the whole response.
    pub fn respond_using(self, writer: impl ResponseWriter + 'static) -> ResponseHandle<'a> {
        self.set_response(Response::using(writer))
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    /// Limit how many times the expectation may be matched.
    ///
    /// `0` means unlimited. A negative count marks the expectation as already
    /// exhausted: it is never selected, but still shows up in diagnostics.
    pub fn times(self, count: i64) -> Self {
        self.registry.with_expectation(self.index, |e| {
            e.set_repeatability(Repeatability::from_count(count));
        });
        self
    }

    /// Add an extra predicate, evaluated after method, URL and body.
    /// Matchers added after the expectation was first used are ignored.
    pub fn matches(self, matcher: impl RequestMatcher + 'static) -> Self {
        self.registry.with_expectation(self.index, |e| {
            if e.total_uses() > 0 {
                warn!(
                    method = %e.method(),
                    url = %e.url(),
                    total_uses = e.total_uses(),
                    "ignoring matcher added after first use"
                );
            } else {
                e.push_matcher(Arc::new(matcher));
            }
        });
        self
    }

    /// Register the next expectation on the same registry.
    pub fn on(
        self,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> ExpectationHandle<'a> {
        self.registry.on(method, url, body)
    }

    fn set_response(self, response: Response) -> ResponseHandle<'a> {
        self.registry.with_expectation(self.index, |e| {
            *e.response_mut() = Some(response);
        });
        ResponseHandle { parent: self }
    }
}

/// Builder for the response of a registered expectation.
#[derive(Clone, Copy)]
pub struct ResponseHandle<'a> {
    parent: ExpectationHandle<'a>,
}

impl<'a> ResponseHandle<'a> {
    /// Add a value to a response header. Repeated calls with the same name
    /// keep earlier values.
    pub fn header(self, name: &str, value: impl Into<String>) -> Self {
        self.parent.registry.with_expectation(self.parent.index, |e| {
            if let Some(response) = e.response_mut() {
                response.append_header(name, [value.into()]);
            }
        });
        self
    }

    pub fn once(self) -> ExpectationHandle<'a> {
        self.parent.once()
    }

    pub fn twice(self) -> ExpectationHandle<'a> {
        self.parent.twice()
    }

    pub fn times(self, count: i64) -> ExpectationHandle<'a> {
        self.parent.times(count)
    }

    /// Register the next expectation on the same registry.
    pub fn on(
        self,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> ExpectationHandle<'a> {
        self.parent.registry.on(method, url, body)
    }
}
