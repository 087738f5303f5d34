use super::{trim_body, Diff, FMT_ANY_BODY};
use crate::expectation::ExpectedBody;
use crate::request::Request;

/// Compare the expected body with the received one.
///
/// The received body is buffered first and stays readable afterwards. A
/// read failure counts as one difference and is never treated as an empty
/// body.
pub fn diff_body(expected: &ExpectedBody, received: &mut Request) -> Diff {
    let actual = match received.read_body() {
        Ok(bytes) => bytes,
        Err(e) => return Diff::fail(e.to_string()),
    };
    let shown_actual = trim_body(&actual);

    let expected = match expected {
        ExpectedBody::Any => {
            return Diff::pass(format!(
                "\t2: PASS:  (X) {} == ({}) {}\n",
                FMT_ANY_BODY,
                actual.len(),
                shown_actual
            ));
        }
        ExpectedBody::None => &[][..],
        ExpectedBody::Exact(bytes) => &bytes[..],
    };
    let shown_expected = trim_body(expected);

    if expected.is_empty() && actual.is_empty() {
        return Diff::pass(format!(
            "\t2: PASS:  (0) {shown_expected} == (0) {shown_actual}\n"
        ));
    }

    let (head, symbol, differences) = if expected == &actual[..] {
        ("\t2: PASS:\n", "==", 0)
    } else {
        ("\t2: FAIL:\n", "!=", 1)
    };

    Diff::new(
        format!(
            "{head}\t\t ({}) {shown_expected}\n\n\t\t    {symbol}\n\n\t\t ({}) {shown_actual}\n",
            expected.len(),
            actual.len(),
        ),
        differences,
    )
}
