//! Canned responses and the boundary used to write them to a transport.

use crate::error::MockError;
use crate::request::Request;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Destination a [`Response`] is written to.
///
/// The server adapter writes into a [`BufferedResponse`]; custom writers and
/// tests can provide their own implementation.
pub trait ResponseTarget {
    /// Replace all values of a header.
    fn set_header(&mut self, name: &str, values: &[String]);
    fn write_status(&mut self, status: u16);
    fn write_body(&mut self, body: &[u8]) -> std::io::Result<usize>;
}

/// Custom writer that takes over the whole response, including headers,
/// status code, and body.
pub trait ResponseWriter: Send + Sync {
    fn write(&self, request: &Request, target: &mut dyn ResponseTarget)
        -> Result<usize, MockError>;
}

impl<F> ResponseWriter for F
where
    F: Fn(&Request, &mut dyn ResponseTarget) -> Result<usize, MockError> + Send + Sync,
{
    fn write(
        &self,
        request: &Request,
        target: &mut dyn ResponseTarget,
    ) -> Result<usize, MockError> {
        self(request, target)
    }
}

/// Response returned when an expectation is selected.
#[derive(Clone)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, Vec<String>>,
    body: Option<Bytes>,
    writer: Option<Arc<dyn ResponseWriter>>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200, None)
    }
}

impl Response {
    pub fn new(status: u16, body: Option<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
            writer: None,
        }
    }

    /// A response produced entirely by `writer`.
    pub fn using(writer: impl ResponseWriter + 'static) -> Self {
        Self {
            writer: Some(Arc::new(writer)),
            ..Self::default()
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn has_custom_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Append values to a header, keeping values already set for it.
    pub(crate) fn append_header<I>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.headers.entry(name.into()).or_default().extend(values);
    }

    /// Write to `target`. A custom writer is called as is; otherwise headers,
    /// then status, then body are applied in that order.
    pub fn write(
        &self,
        request: &Request,
        target: &mut dyn ResponseTarget,
    ) -> Result<usize, MockError> {
        if let Some(writer) = &self.writer {
            return writer.write(request, target);
        }

        for (name, values) in &self.headers {
            target.set_header(name, values);
        }
        target.write_status(self.status);

        match &self.body {
            Some(body) => target
                .write_body(body)
                .map_err(|e| MockError::ResponseWrite(e.to_string())),
            None => Ok(0),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("custom_writer", &self.writer.is_some())
            .finish()
    }
}

/// In-memory [`ResponseTarget`] that converts into a hyper response.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseTarget for BufferedResponse {
    fn set_header(&mut self, name: &str, values: &[String]) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers
            .extend(values.iter().map(|v| (name.to_string(), v.clone())));
    }

    fn write_status(&mut self, status: u16) {
        self.status = status;
    }

    fn write_body(&mut self, body: &[u8]) -> std::io::Result<usize> {
        self.body.extend_from_slice(body);
        Ok(body.len())
    }
}

impl BufferedResponse {
    /// Convert into a hyper response. Headers that are not valid HTTP are
    /// skipped; an invalid status becomes 500.
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                response.headers_mut().append(name, value);
            }
        }
        response
    }
}
