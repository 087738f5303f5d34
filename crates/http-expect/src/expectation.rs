//! Expectation records: match criteria, canned response, and usage state.

use crate::diff::{diff_body, diff_method, diff_url, or_missing, trim_body, Diff};
use crate::diff::{FMT_ANY_BODY, FMT_ANY_METHOD, FMT_MISSING};
use crate::request::Request;
use crate::response::Response;
use crate::url::RequestUrl;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Method an expectation accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedMethod {
    Exact(String),
    /// Any non-empty method.
    Any,
}

/// Wildcard accepting any non-empty method.
pub const ANY_METHOD: ExpectedMethod = ExpectedMethod::Any;

impl From<&str> for ExpectedMethod {
    fn from(method: &str) -> Self {
        ExpectedMethod::Exact(method.to_string())
    }
}

impl From<String> for ExpectedMethod {
    fn from(method: String) -> Self {
        ExpectedMethod::Exact(method)
    }
}

impl From<hyper::Method> for ExpectedMethod {
    fn from(method: hyper::Method) -> Self {
        ExpectedMethod::Exact(method.as_str().to_string())
    }
}

impl fmt::Display for ExpectedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedMethod::Any => f.write_str(FMT_ANY_METHOD),
            ExpectedMethod::Exact(m) if m.is_empty() => f.write_str(FMT_MISSING),
            ExpectedMethod::Exact(m) => f.write_str(m),
        }
    }
}

/// Body an expectation accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExpectedBody {
    /// No body is expected; matches only an empty body.
    #[default]
    None,
    Exact(Bytes),
    /// Any body, including none.
    Any,
}

/// Wildcard accepting any body.
pub const ANY_BODY: ExpectedBody = ExpectedBody::Any;

impl ExpectedBody {
    fn bytes(&self) -> &[u8] {
        match self {
            ExpectedBody::Exact(bytes) => &bytes[..],
            _ => &[],
        }
    }
}

impl fmt::Display for ExpectedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedBody::Any => write!(f, "(X) {FMT_ANY_BODY}"),
            body => write!(f, "({}) {}", body.bytes().len(), trim_body(body.bytes())),
        }
    }
}

impl From<Bytes> for ExpectedBody {
    fn from(bytes: Bytes) -> Self {
        ExpectedBody::Exact(bytes)
    }
}

impl From<&'static str> for ExpectedBody {
    fn from(s: &'static str) -> Self {
        ExpectedBody::Exact(Bytes::from_static(s.as_bytes()))
    }
}

impl From<&'static [u8]> for ExpectedBody {
    fn from(b: &'static [u8]) -> Self {
        ExpectedBody::Exact(Bytes::from_static(b))
    }
}

impl From<String> for ExpectedBody {
    fn from(s: String) -> Self {
        ExpectedBody::Exact(Bytes::from(s))
    }
}

impl From<Vec<u8>> for ExpectedBody {
    fn from(v: Vec<u8>) -> Self {
        ExpectedBody::Exact(Bytes::from(v))
    }
}

impl<T: Into<ExpectedBody>> From<Option<T>> for ExpectedBody {
    fn from(body: Option<T>) -> Self {
        body.map(Into::into).unwrap_or_default()
    }
}

/// How many more times an expectation may be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeatability {
    /// Matches forever.
    #[default]
    Unlimited,
    /// Matches this many more times; never zero.
    Countdown(u32),
    /// Spent; no longer selected by exact matching.
    Exhausted,
}

impl Repeatability {
    /// `0` means unlimited, `n > 0` means `n` uses, and any negative count
    /// means already exhausted.
    pub fn from_count(count: i64) -> Self {
        match count {
            0 => Repeatability::Unlimited,
            n if n < 0 => Repeatability::Exhausted,
            n => Repeatability::Countdown(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }

    /// Signed form: `0` unlimited, `n > 0` remaining uses, `-1` exhausted.
    pub fn remaining(&self) -> i64 {
        match self {
            Repeatability::Unlimited => 0,
            Repeatability::Countdown(n) => i64::from(*n),
            Repeatability::Exhausted => -1,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Repeatability::Exhausted)
    }

    /// Whether the expectation still owes uses.
    pub fn owes_uses(&self) -> bool {
        matches!(self, Repeatability::Countdown(_))
    }

    /// State after one successful consumption.
    pub fn consumed(self) -> Self {
        match self {
            Repeatability::Countdown(1) => Repeatability::Exhausted,
            Repeatability::Countdown(n) => Repeatability::Countdown(n - 1),
            other => other,
        }
    }
}

/// Extra predicate run after method, URL and body.
///
/// Closures of type `Fn(&Request) -> Diff` implement this trait.
pub trait RequestMatcher: Send + Sync {
    fn classify(&self, request: &Request) -> Diff;

    /// Name shown when the expectation is rendered.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> RequestMatcher for F
where
    F: Fn(&Request) -> Diff + Send + Sync,
{
    fn classify(&self, request: &Request) -> Diff {
        self(request)
    }
}

/// A registered anticipated request.
#[derive(Clone)]
pub struct Expectation {
    method: ExpectedMethod,
    url: RequestUrl,
    body: ExpectedBody,
    matchers: Vec<Arc<dyn RequestMatcher>>,
    response: Option<Response>,
    repeatability: Repeatability,
    total_uses: usize,
}

impl Expectation {
    pub fn new(method: ExpectedMethod, url: RequestUrl, body: ExpectedBody) -> Self {
        Self {
            method,
            url,
            body,
            matchers: Vec::new(),
            response: None,
            repeatability: Repeatability::Unlimited,
            total_uses: 0,
        }
    }

    pub fn method(&self) -> &ExpectedMethod {
        &self.method
    }

    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    pub fn body(&self) -> &ExpectedBody {
        &self.body
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn repeatability(&self) -> Repeatability {
        self.repeatability
    }

    pub fn total_uses(&self) -> usize {
        self.total_uses
    }

    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    pub(crate) fn response_mut(&mut self) -> &mut Option<Response> {
        &mut self.response
    }

    pub(crate) fn set_repeatability(&mut self, repeatability: Repeatability) {
        self.repeatability = repeatability;
    }

    pub(crate) fn push_matcher(&mut self, matcher: Arc<dyn RequestMatcher>) {
        self.matchers.push(matcher);
    }

    /// Apply one successful consumption.
    pub(crate) fn record_use(&mut self) {
        self.repeatability = self.repeatability.consumed();
        self.total_uses += 1;
    }

    /// Same method, URL and body, without matchers, response, or usage.
    pub(crate) fn criteria(&self) -> Expectation {
        Expectation::new(self.method.clone(), self.url.clone(), self.body.clone())
    }

    /// Compare against a received request.
    ///
    /// Method, URL (with query) and body run first, then every extra matcher
    /// in registration order. The received body is buffered and remains
    /// readable.
    pub fn diff(&self, received: &mut Request) -> Diff {
        let mut total = Diff::pass("\n");
        total += diff_method(&self.method, received);
        total += diff_url(&self.url, received);
        total += diff_body(&self.body, received);

        // 0, 1 and 2 are the method, URL and body lines.
        for (i, matcher) in self.matchers.iter().enumerate() {
            let outcome = matcher.classify(received);
            total += Diff::new(
                format!("\t{}: {}\n", 3 + i, outcome.report),
                outcome.differences,
            );
        }
        total
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Method: {}", self.method)?;

        if self.url.is_empty() {
            writeln!(f, "URL: {FMT_MISSING}")?;
        } else {
            writeln!(f, "URL: {}", self.url)?;
            writeln!(f, "\tScheme: {}", or_missing(self.url.scheme()))?;
            writeln!(f, "\tHost: {}", or_missing(self.url.host()))?;
            writeln!(f, "\tPath: {}", or_missing(self.url.path()))?;
            writeln!(f, "\tQuery: {}", or_missing(self.url.raw_query()))?;
            writeln!(f, "\tFragment: {}", or_missing(self.url.fragment()))?;
        }

        write!(f, "Body: {}", self.body)?;

        for (i, matcher) in self.matchers.iter().enumerate() {
            write!(f, "\nMatcher[{i}]: {}", matcher.name())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("matchers", &self.matchers.len())
            .field("response", &self.response)
            .field("repeatability", &self.repeatability)
            .field("total_uses", &self.total_uses)
            .finish()
    }
}
