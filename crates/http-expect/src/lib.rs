//! Request-expectation engine for HTTP test doubles.
//!
//! Register the requests a test expects with [`Registry::on`], feed received
//! requests through [`Registry::requested`] (or run a [`MockServer`]), then
//! check that everything expected actually happened with
//! [`Registry::assert_expectations`].

pub mod config;
pub mod diff;
pub mod error;
pub mod expectation;
pub mod matching;
pub mod registry;
pub mod request;
pub mod response;
pub mod server;
pub mod sink;
pub mod url;

pub use config::MockConfig;
pub use diff::Diff;
pub use error::MockError;
pub use expectation::{
    Expectation, ExpectedBody, ExpectedMethod, Repeatability, RequestMatcher, ANY_BODY, ANY_METHOD,
};
pub use registry::{ExpectationHandle, RecordedRequest, Registry, ResponseHandle};
pub use request::{Body, Request};
pub use response::{BufferedResponse, Response, ResponseTarget, ResponseWriter};
pub use server::MockServer;
pub use sink::{FailureSink, RecordingSink, TracingSink};
pub use url::{QueryValues, RequestUrl};

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber. `RUST_LOG` takes precedence over
/// `default_directive`. Does nothing if a subscriber is already installed.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
