//! Received requests and their single-read bodies.

use crate::error::MockError;
use crate::url::RequestUrl;
use bytes::Bytes;
use std::fmt;
use std::io::Read;

/// Body of a received request.
///
/// A streaming body can only be read once. [`Request::read_body`] drains it
/// and stores the bytes back, so comparators and callers can read it again.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Buffered(Bytes),
    Stream(Box<dyn Read + Send>),
    /// A stream that already failed; every later read repeats the error.
    Failed(String),
}

impl Body {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Body::Stream(Box::new(reader))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Buffered(bytes) => f.debug_tuple("Body::Buffered").field(bytes).finish(),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
            Body::Failed(reason) => f.debug_tuple("Body::Failed").field(reason).finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Buffered(bytes)
        }
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Bytes::from(v).into()
    }
}

/// A request presented to the registry.
#[derive(Debug)]
pub struct Request {
    method: String,
    url: RequestUrl,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Request {
    pub fn new(method: impl Into<String>, url: RequestUrl, body: impl Into<Body>) -> Self {
        Self {
            method: method.into(),
            url,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Build a request from a method and URL string, mainly for tests and
    /// ad hoc use.
    pub fn parse(
        method: impl Into<String>,
        url: &str,
        body: impl Into<Body>,
    ) -> Result<Self, MockError> {
        Ok(Self::new(method, RequestUrl::parse(url)?, body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Read the whole body and put the buffered bytes back in place of the
    /// stream, so the body can be read again afterwards.
    pub fn read_body(&mut self) -> Result<Bytes, MockError> {
        match std::mem::take(&mut self.body) {
            Body::Empty => Ok(Bytes::new()),
            Body::Buffered(bytes) => {
                self.body = Body::Buffered(bytes.clone());
                Ok(bytes)
            }
            Body::Stream(mut reader) => {
                let mut buf = Vec::new();
                if let Err(e) = reader.read_to_end(&mut buf) {
                    self.body = Body::Failed(e.to_string());
                    return Err(MockError::BodyRead(e.to_string()));
                }
                let bytes = Bytes::from(buf);
                self.body = Body::Buffered(bytes.clone());
                Ok(bytes)
            }
            Body::Failed(reason) => {
                self.body = Body::Failed(reason.clone());
                Err(MockError::BodyRead(reason))
            }
        }
    }

    /// Body bytes if they have already been buffered.
    pub fn buffered_body(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{self, Read};

    /// Reader that always fails, for exercising body-read errors.
    pub struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("connection reset"))
        }
    }
}
