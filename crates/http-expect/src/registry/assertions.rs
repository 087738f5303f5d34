//! Assertions over the registry once the code under test has run.
//!
//! Every assertion takes snapshots first, so the failure sink is never
//! called while the registry is locked.

use super::{indent, RecordedRequest, Registry};
use crate::expectation::{ExpectedBody, ExpectedMethod, Expectation};
use crate::sink::FailureSink;
use crate::url::RequestUrl;
use tracing::debug;

fn was_requested(expected: &Expectation, log: &[RecordedRequest]) -> bool {
    log.iter()
        .any(|logged| expected.diff(&mut logged.to_request()).is_match())
}

fn parse_or_fail(sink: &dyn FailureSink, url: &str) -> RequestUrl {
    match RequestUrl::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            sink.error(&format!("FAIL: unable to parse path {url:?} into URL: {e}"));
            sink.fail_now()
        }
    }
}

impl Registry {
    /// Assert that every registered expectation was satisfied: it was used,
    /// or a logged request matches it, and it owes no further uses. Only
    /// unsatisfied expectations are logged to the sink.
    pub fn assert_expectations(&self, sink: &dyn FailureSink) -> bool {
        let expected = self.expectations();
        let log = self.requests();

        let mut failed = 0;
        for expectation in &expected {
            let satisfied = (expectation.total_uses() > 0
                || was_requested(&expectation.criteria(), &log))
                && !expectation.repeatability().owes_uses();
            if satisfied {
                debug!(
                    "PASS:\t{} {}\n\t{}",
                    expectation.method(),
                    expectation.url(),
                    expectation.body()
                );
                continue;
            }
            failed += 1;
            sink.log(&format!(
                "FAIL:\t{} {}\n\t{}",
                expectation.method(),
                expectation.url(),
                expectation.body()
            ));
        }

        if failed > 0 {
            sink.error(&format!(
                "FAIL: {} out of {} expectation(s) were met.\n\tThe code you are testing needs to make {} more request(s).",
                expected.len() - failed,
                expected.len(),
                failed
            ));
        }
        failed == 0
    }

    /// Assert that `method` and `url` were requested exactly `count` times.
    ///
    /// User info, query and fragment are ignored on both sides. A URL that
    /// does not parse is fatal.
    pub fn assert_number_of_requests(
        &self,
        sink: &dyn FailureSink,
        method: &str,
        url: &str,
        count: usize,
    ) -> bool {
        let wanted = parse_or_fail(sink, url).without_query_and_fragment().to_string();

        let actual = self
            .requests()
            .iter()
            .filter(|logged| logged.method == method)
            .filter(|logged| logged.url.without_query_and_fragment().to_string() == wanted)
            .count();

        if actual != count {
            sink.error(&format!("Not equal: expected: {count}, actual: {actual}"));
            return false;
        }
        true
    }

    /// Assert that a logged request matches `method`, `url` and `body`.
    pub fn assert_requested(
        &self,
        sink: &dyn FailureSink,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> bool {
        let expected = Expectation::new(method.into(), parse_or_fail(sink, url), body.into());
        if was_requested(&expected, &self.requests()) {
            return true;
        }
        sink.error(&format!(
            "Should have requested with the given constraints\nExpected to have been requested with\n{}\nbut no actual requests happened",
            indent(&expected.to_string())
        ));
        false
    }

    /// Assert that no logged request matches `method`, `url` and `body`.
    pub fn assert_not_requested(
        &self,
        sink: &dyn FailureSink,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> bool {
        let expected = Expectation::new(method.into(), parse_or_fail(sink, url), body.into());
        let log = self.requests();
        let Some(logged) = log
            .iter()
            .find(|logged| expected.diff(&mut logged.to_request()).is_match())
        else {
            return true;
        };
        sink.error(&format!(
            "Should not have been requested with the given constraints\nExpected not to have been requested with\n{}\nbut actually it was:\n{}",
            indent(&expected.to_string()),
            indent(&logged.as_expectation().to_string())
        ));
        false
    }
}
