//! URL and query-string handling for expectations and received requests.
//!
//! URLs are kept as their components so the URL comparator can report on
//! each one separately. Query strings are decoded into a key -> values map
//! the way `application/x-www-form-urlencoded` data is.

use crate::error::MockError;
use hyper::http::uri::PathAndQuery;
use hyper::Uri;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A parsed request URL.
///
/// Accepts absolute URLs (`https://host/path?q#frag`) as well as
/// origin-form references (`/path?q#frag`), which is what a server sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestUrl {
    scheme: String,
    user_info: String,
    host: String,
    path: String,
    raw_query: String,
    fragment: String,
}

impl RequestUrl {
    /// Parse a URL string. The empty string is a valid, empty URL.
    pub fn parse(input: &str) -> Result<Self, MockError> {
        let invalid = |reason: String| MockError::InvalidUrl {
            url: input.to_string(),
            reason,
        };

        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, decode_component(fragment)),
            None => (input, String::new()),
        };

        let mut url = RequestUrl {
            fragment,
            ..Default::default()
        };
        if rest.is_empty() {
            return Ok(url);
        }

        match split_scheme(rest) {
            Some((scheme, hierarchy)) if hierarchy.starts_with("//") => {
                let uri = rest.parse::<Uri>().map_err(|e| invalid(e.to_string()))?;
                url.scheme = uri.scheme_str().unwrap_or(scheme).to_string();
                url.fill_from_authority(&hierarchy[2..], &uri);
            }
            None if rest.starts_with("//") => {
                let uri = format!("http:{rest}")
                    .parse::<Uri>()
                    .map_err(|e| invalid(e.to_string()))?;
                url.fill_from_authority(&rest[2..], &uri);
            }
            _ => {
                PathAndQuery::from_str(rest).map_err(|e| invalid(e.to_string()))?;
                match rest.split_once('?') {
                    Some((path, query)) => {
                        url.path = path.to_string();
                        url.raw_query = query.to_string();
                    }
                    None => url.path = rest.to_string(),
                }
            }
        }

        Ok(url)
    }

    /// Take user info, host, path and query from a parsed URI. `after` is
    /// the input following `//`; it tells an empty path apart from `/`.
    fn fill_from_authority(&mut self, after: &str, uri: &Uri) {
        let authority = uri.authority().map(|a| a.as_str()).unwrap_or_default();
        match authority.rsplit_once('@') {
            Some((user_info, host)) => {
                self.user_info = user_info.to_string();
                self.host = host.to_string();
            }
            None => self.host = authority.to_string(),
        }
        let remainder = after.get(authority.len()..).unwrap_or_default();
        if remainder.starts_with('/') {
            self.path = uri.path().to_string();
        }
        self.raw_query = uri.query().unwrap_or_default().to_string();
    }

    /// Build from the URI of a request received by a server.
    pub fn from_uri(uri: &Uri) -> Self {
        let (user_info, host) = match uri.authority().map(|a| a.as_str()) {
            Some(authority) => match authority.rsplit_once('@') {
                Some((user_info, host)) => (user_info.to_string(), host.to_string()),
                None => (String::new(), authority.to_string()),
            },
            None => (String::new(), String::new()),
        };

        RequestUrl {
            scheme: uri.scheme_str().unwrap_or_default().to_string(),
            user_info,
            host,
            path: uri.path().to_string(),
            raw_query: uri.query().unwrap_or_default().to_string(),
            fragment: String::new(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn user_info(&self) -> &str {
        &self.user_info
    }

    /// Decoded query parameters.
    pub fn query(&self) -> QueryValues {
        QueryValues::parse(&self.raw_query)
    }

    /// The path with percent-escapes decoded. An invalid escape leaves the
    /// path as written.
    pub fn decoded_path(&self) -> Cow<'_, str> {
        urlencoding::decode(&self.path).unwrap_or(Cow::Borrowed(&self.path))
    }

    /// Scheme, host, decoded path and fragment equality. User info and the
    /// raw query are not part of the comparison.
    pub fn structural_eq(&self, other: &RequestUrl) -> bool {
        self.scheme == other.scheme
            && self.host == other.host
            && self.decoded_path() == other.decoded_path()
            && self.fragment == other.fragment
    }

    /// Copy without user info, query and fragment, used when counting
    /// requests per endpoint.
    pub fn without_query_and_fragment(&self) -> RequestUrl {
        RequestUrl {
            user_info: String::new(),
            raw_query: String::new(),
            fragment: String::new(),
            ..self.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_string().is_empty()
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        if !self.scheme.is_empty() || !self.host.is_empty() {
            f.write_str("//")?;
            if !self.user_info.is_empty() {
                write!(f, "{}@", self.user_info)?;
            }
            f.write_str(&self.host)?;
            if !self.path.is_empty() && !self.path.starts_with('/') {
                f.write_str("/")?;
            }
        }
        f.write_str(&self.path)?;
        if !self.raw_query.is_empty() {
            write!(f, "?{}", self.raw_query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

impl FromStr for RequestUrl {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestUrl::parse(s)
    }
}

impl Serialize for RequestUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decoded query parameters, keyed and iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(BTreeMap<String, Vec<String>>);

impl QueryValues {
    /// Parse a raw query string. Pairs that fail to decode are dropped.
    pub fn parse(raw: &str) -> Self {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for pair in raw.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (Some(key), Some(value)) = (decode_form(key), decode_form(value)) else {
                continue;
            };
            values.entry(key).or_default().push(value);
        }
        QueryValues(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Keep only the keys that `keys` declares.
    pub fn filtered_to(&self, keys: &QueryValues) -> QueryValues {
        QueryValues(
            self.0
                .iter()
                .filter(|(k, _)| keys.contains_key(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Key-by-key equality where the values of each key are compared
    /// without regard to their order.
    pub fn unordered_eq(&self, other: &QueryValues) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(key, values)| {
                other.0.get(key).is_some_and(|theirs| {
                    let mut mine = values.clone();
                    let mut theirs = theirs.clone();
                    mine.sort();
                    theirs.sort();
                    mine == theirs
                })
            })
    }

    /// Re-encode as `k=v&k=v`, sorted by key.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .flat_map(|(k, values)| {
                values.iter().map(move |v| {
                    format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Split a leading `scheme:` off `s`. A scheme starts with a letter and
/// holds only letters, digits, `+`, `-` and `.`, so `/a?b=http://c` has none.
fn split_scheme(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))?;
    let starts_with_letter = s.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if end == 0 || !starts_with_letter || !s[end..].starts_with(':') {
        return None;
    }
    Some((&s[..end], &s[end + 1..]))
}

fn decode_form(s: &str) -> Option<String> {
    urlencoding::decode(&s.replace('+', " "))
        .ok()
        .map(|v| v.into_owned())
}

fn decode_component(s: &str) -> String {
    urlencoding::decode(s)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| s.to_string())
}
