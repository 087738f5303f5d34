use super::{eq_symbol, or_missing, Diff, FMT_MISSING};
use crate::request::Request;
use crate::url::RequestUrl;

/// Compare the expected query with the received one, using subset
/// semantics.
///
/// - An expectation without query parameters does not compare the query.
/// - Otherwise only the keys the expectation names are compared. Received
///   keys it does not name are ignored, and values of one key compare as
///   an unordered collection.
pub fn diff_query(expected: &RequestUrl, received: &Request) -> Diff {
    let expected_query = expected.query();
    if expected_query.is_empty() {
        return Diff::default();
    }

    let received_query = received.url().query();
    let filtered = received_query.filtered_to(&expected_query);

    let filtered_str = filtered.encode();
    let full_str = received_query.encode();
    let actual = match (filtered_str.is_empty(), full_str.is_empty()) {
        (true, true) => FMT_MISSING.to_string(),
        (true, false) => format!("{FMT_MISSING} (({full_str}))"),
        _ => format!("{filtered_str} ({full_str})"),
    };

    let equal = filtered.unordered_eq(&expected_query);
    Diff::new(
        format!(
            "\t\t     Query:  {} {} {}\n",
            actual,
            eq_symbol(equal),
            or_missing(&expected_query.encode())
        ),
        usize::from(!equal),
    )
}

/// Compare the expected URL with the received one.
///
/// Scheme, host, path and fragment are compared, and the query must pass
/// [`diff_query`]. Any mismatch counts as a single difference; the
/// per-component lines only help reading the report.
pub fn diff_url(expected: &RequestUrl, received: &Request) -> Diff {
    let actual_url = received.url();
    let expected_str = expected.to_string();
    let actual_str = actual_url.to_string();

    if expected_str.is_empty() != actual_str.is_empty() {
        return Diff::fail(format!(
            "\t1: FAIL:  {} != {}\n",
            or_missing(&actual_str),
            or_missing(&expected_str)
        ));
    }

    let mut components = String::new();
    for (label, a, e, equal) in [
        (
            "Scheme",
            actual_url.scheme(),
            expected.scheme(),
            actual_url.scheme() == expected.scheme(),
        ),
        (
            "Host",
            actual_url.host(),
            expected.host(),
            actual_url.host() == expected.host(),
        ),
        (
            "Path",
            actual_url.path(),
            expected.path(),
            actual_url.decoded_path() == expected.decoded_path(),
        ),
    ] {
        components.push_str(&component_line(label, a, e, equal));
    }
    let query = diff_query(expected, received);
    components.push_str(&query.report);
    components.push_str(&component_line(
        "Fragment",
        actual_url.fragment(),
        expected.fragment(),
        actual_url.fragment() == expected.fragment(),
    ));

    let matched = expected.structural_eq(actual_url) && query.is_match();
    let header = if matched {
        format!(
            "\t1: PASS:  {} == {}\n",
            or_missing(&actual_str),
            or_missing(&expected_str)
        )
    } else {
        format!(
            "\t1: FAIL:  {} != {}\n",
            or_missing(&actual_str),
            or_missing(&expected_str)
        )
    };

    Diff::new(header + &components, usize::from(!matched))
}

fn component_line(label: &str, actual: &str, expected: &str, equal: bool) -> String {
    if actual.is_empty() && expected.is_empty() {
        return String::new();
    }
    format!(
        "\t\t{:>10}:  {} {} {}\n",
        label,
        or_missing(actual),
        eq_symbol(equal),
        or_missing(expected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Body;
    use proptest::prelude::*;

    fn url(s: &str) -> RequestUrl {
        RequestUrl::parse(s).unwrap()
    }

    fn received(s: &str) -> Request {
        Request::parse("GET", s, Body::Empty).unwrap()
    }

    #[test]
    fn test_query_not_compared_when_expectation_has_none() {
        let diff = diff_query(&url("/foo"), &received("/foo?limit=5&offset=10"));
        assert_eq!(diff, Diff::default());
    }

    #[test]
    fn test_query_subset_passes() {
        let diff = diff_query(
            &url("/foo?limit=5"),
            &received("/foo?limit=5&offset=10&next=abcd"),
        );
        assert_eq!(diff.differences, 0);
        assert_eq!(
            diff.report,
            "\t\t     Query:  limit=5 (limit=5&next=abcd&offset=10) == limit=5\n"
        );
    }

    #[test]
    fn test_query_missing_key() {
        let diff = diff_query(&url("/foo?limit=5"), &received("/foo?offset=10"));
        assert_eq!(diff.differences, 1);
        assert_eq!(
            diff.report,
            "\t\t     Query:  (Missing) ((offset=10)) != limit=5\n"
        );

        let diff = diff_query(&url("/foo?limit=5"), &received("/foo"));
        assert_eq!(diff.report, "\t\t     Query:  (Missing) != limit=5\n");
    }

    #[test]
    fn test_query_value_sets() {
        let diff = diff_query(&url("/foo?limit=5"), &received("/foo?limit=10&limit=5"));
        assert_eq!(diff.differences, 1);

        let diff = diff_query(
            &url("/foo?limit=5&limit=10"),
            &received("/foo?limit=10&limit=5"),
        );
        assert_eq!(diff.differences, 0);
    }

    #[test]
    fn test_url_empty_side_fails() {
        let diff = diff_url(&RequestUrl::default(), &received("/foo"));
        assert_eq!(diff, Diff::fail("\t1: FAIL:  /foo != (Missing)\n"));

        let diff = diff_url(&url("/foo"), &received(""));
        assert_eq!(diff, Diff::fail("\t1: FAIL:  (Missing) != /foo\n"));
    }

    #[test]
    fn test_url_component_mismatches() {
        let cases = [
            ("http://test.com/foo", "https://test.com/foo"),
            ("https://test.com/foo", "https://notest.com/foo"),
            ("https://test.com/foo", "https://test.com/bar"),
            ("https://test.com/foo#top", "https://test.com/foo#bottom"),
            ("https://test.com/foo", "/foo"),
        ];
        for (expected, actual) in cases {
            let diff = diff_url(&url(expected), &received(actual));
            assert_eq!(diff.differences, 1, "{expected} vs {actual}");
            assert!(diff.report.starts_with("\t1: FAIL:"));
        }
    }

    #[test]
    fn test_url_equal_report() {
        let diff = diff_url(
            &url("https://test.com/foo#top"),
            &received("https://user@test.com/foo#top"),
        );
        assert_eq!(diff.differences, 0);
        assert_eq!(
            diff.report,
            "\t1: PASS:  https://user@test.com/foo#top == https://test.com/foo#top\n\
             \t\t    Scheme:  https == https\n\
             \t\t      Host:  test.com == test.com\n\
             \t\t      Path:  /foo == /foo\n\
             \t\t  Fragment:  top == top\n"
        );
    }

    #[test]
    fn test_url_path_compared_decoded() {
        let diff = diff_url(&url("/a%2Fb"), &received("/a/b"));
        assert_eq!(diff.differences, 0);
        assert!(diff.report.contains("Path:  /a/b == /a%2Fb"));
    }

    #[test]
    fn test_url_with_url_in_query_matches_served_uri() {
        let served: hyper::Uri = "/login?next=http://a/b".parse().unwrap();
        let request = Request::new("GET", RequestUrl::from_uri(&served), Body::Empty);
        let diff = diff_url(&url("/login?next=http://a/b"), &request);
        assert_eq!(diff.differences, 0, "{}", diff.report);
    }

    #[test]
    fn test_url_query_mismatch_is_one_difference() {
        let diff = diff_url(
            &url("https://test.com/foo?page=2"),
            &received("https://test.com/bar?page=3&limit=10"),
        );
        assert_eq!(diff.differences, 1);
        assert!(diff.report.contains("Query:  page=3 (limit=10&page=3) != page=2"));
    }

    proptest! {
        #[test]
        fn prop_query_subset_law(
            limit in "[a-z0-9]{1,6}",
            extra in proptest::collection::btree_map("[a-k]{1,4}", "[a-z0-9]{0,4}", 0..5),
            prepend in any::<bool>(),
        ) {
            let extras: Vec<String> = extra
                .iter()
                .filter(|(k, _)| k.as_str() != "limit")
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            let mut parts = extras.clone();
            if prepend {
                parts.insert(0, format!("limit={limit}"));
            } else {
                parts.push(format!("limit={limit}"));
            }
            let expected = url(&format!("/items?limit={limit}"));
            let actual = received(&format!("/items?{}", parts.join("&")));
            prop_assert_eq!(diff_query(&expected, &actual).differences, 0);
            prop_assert_eq!(diff_url(&expected, &actual).differences, 0);
        }
    }
}
