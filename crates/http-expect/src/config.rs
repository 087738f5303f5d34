//! Configuration for a mock server and its expectations.
//!
//! ```yaml
//! port: 8080
//! expectations:
//!   - method: POST
//!     url: /users
//!     body: '{"name":"ada"}'
//!     times: 1
//!     response:
//!       status: 201
//!       headers:
//!         Content-Type: [application/json]
//!       body: '{"id":"1234"}'
//!   - method: "*"
//!     url: /health
//!     body: "*"
//! ```

use crate::error::MockError;
use crate::expectation::{ExpectedBody, ExpectedMethod, ANY_BODY, ANY_METHOD};
use crate::registry::Registry;
use crate::url::RequestUrl;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Value of `method` or `body` that matches anything.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// 0 picks an ephemeral port.
    #[serde(default)]
    pub port: u16,
    /// Answer engine failures with 404 instead of aborting.
    #[serde(default = "default_recoverable")]
    pub recoverable: bool,
    #[serde(default)]
    pub expectations: Vec<ExpectationConfig>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_recoverable() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            recoverable: default_recoverable(),
            expectations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationConfig {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// See [`crate::ExpectationHandle::times`]; absent means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl ExpectationConfig {
    fn expected_method(&self) -> ExpectedMethod {
        if self.method == WILDCARD {
            ANY_METHOD
        } else {
            ExpectedMethod::from(self.method.as_str())
        }
    }

    fn expected_body(&self) -> ExpectedBody {
        match self.body.as_deref() {
            Some(WILDCARD) => ANY_BODY,
            Some(body) => ExpectedBody::from(body.to_string()),
            None => ExpectedBody::None,
        }
    }

    fn check(&self) -> Result<(), MockError> {
        RequestUrl::parse(&self.url)?;
        if let Some(response) = &self.response {
            if !(100..=999).contains(&response.status) {
                return Err(MockError::Config(format!(
                    "status {} for {} {} is outside 100..=999",
                    response.status, self.method, self.url
                )));
            }
        }
        Ok(())
    }
}

impl MockConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: MockConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.host.is_empty() {
            anyhow::bail!("host must not be empty");
        }
        for (i, expectation) in self.expectations.iter().enumerate() {
            expectation
                .check()
                .with_context(|| format!("invalid expectation #{i}"))?;
        }
        Ok(())
    }

    /// Register every expectation on `registry`, in order.
    pub fn apply(&self, registry: &Registry) -> Result<(), MockError> {
        for expectation in &self.expectations {
            expectation.check()?;
            let handle = registry.try_on(
                expectation.expected_method(),
                &expectation.url,
                expectation.expected_body(),
            )?;

            if let Some(response) = &expectation.response {
                let mut reply =
                    handle.respond(response.status, response.body.clone().unwrap_or_default());
                for (name, values) in &response.headers {
                    for value in values {
                        reply = reply.header(name, value.clone());
                    }
                }
            }
            if let Some(times) = expectation.times {
                handle.times(times);
            }
        }
        Ok(())
    }
}
