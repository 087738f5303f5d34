//! Field-level comparators used to match received requests.
//!
//! Each comparator produces a [`Diff`]: a human-readable report plus the
//! number of differences found. A comparator contributes at most one
//! difference; [`crate::Expectation::diff`] sums them.
//!
//! ## Module Structure
//!
//! - `method`: HTTP method comparison (with the any-method wildcard)
//! - `url`: scheme/host/path/fragment plus subset query comparison
//! - `body`: byte-exact body comparison (with the any-body wildcard)

mod body;
mod method;
mod url;

pub use body::diff_body;
pub use method::diff_method;
pub use url::{diff_query, diff_url};

use std::ops::AddAssign;

/// Longest body rendered in a report before it is cut short.
pub const BODY_TRIM_LIMIT: usize = 1024;

pub(crate) const FMT_MISSING: &str = "(Missing)";
pub(crate) const FMT_ANY_METHOD: &str = "(AnyMethod)";
pub(crate) const FMT_ANY_BODY: &str = "(AnyBody)";
pub(crate) const FMT_EQUAL: &str = "==";
pub(crate) const FMT_NOT_EQUAL: &str = "!=";

/// Outcome of comparing one part of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub report: String,
    pub differences: usize,
}

impl Diff {
    pub fn new(report: impl Into<String>, differences: usize) -> Self {
        Self {
            report: report.into(),
            differences,
        }
    }

    /// A passing comparison with the given report line.
    pub fn pass(report: impl Into<String>) -> Self {
        Self::new(report, 0)
    }

    /// A failing comparison with the given report line.
    pub fn fail(report: impl Into<String>) -> Self {
        Self::new(report, 1)
    }

    pub fn is_match(&self) -> bool {
        self.differences == 0
    }
}

impl AddAssign for Diff {
    fn add_assign(&mut self, rhs: Diff) {
        self.report.push_str(&rhs.report);
        self.differences += rhs.differences;
    }
}

/// Render a body for a report, cutting it at [`BODY_TRIM_LIMIT`] bytes.
pub fn trim_body(body: &[u8]) -> String {
    if body.is_empty() {
        FMT_MISSING.to_string()
    } else if body.len() > BODY_TRIM_LIMIT {
        format!("{}...", String::from_utf8_lossy(&body[..BODY_TRIM_LIMIT]))
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

pub(crate) fn or_missing(value: &str) -> &str {
    if value.is_empty() {
        FMT_MISSING
    } else {
        value
    }
}

pub(crate) fn eq_symbol(equal: bool) -> &'static str {
    if equal {
        FMT_EQUAL
    } else {
        FMT_NOT_EQUAL
    }
}
