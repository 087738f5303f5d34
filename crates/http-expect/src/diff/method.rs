use super::{or_missing, Diff, FMT_ANY_METHOD, FMT_MISSING};
use crate::expectation::ExpectedMethod;
use crate::request::Request;

/// Compare the expected method with the received one.
///
/// Methods compare case-sensitively. The wildcard accepts any non-empty
/// method; an empty expected method never matches.
pub fn diff_method(expected: &ExpectedMethod, received: &Request) -> Diff {
    let actual = received.method();
    let (shown, matched) = match expected {
        ExpectedMethod::Any => (FMT_ANY_METHOD, !actual.is_empty()),
        ExpectedMethod::Exact(m) if m.is_empty() => (FMT_MISSING, false),
        ExpectedMethod::Exact(m) => (m.as_str(), m == actual),
    };

    if matched {
        Diff::pass(format!("\t0: PASS:  {} == {}\n", or_missing(actual), shown))
    } else {
        Diff::fail(format!("\t0: FAIL:  {} != {}\n", or_missing(actual), shown))
    }
}
