//! Request matching logic.
//!
//! # Responsibilities
//! - Match path prefixes (forbidden-path interception)
//! - Match header values by prefix or exact value (feature-flag routing)
//! - Combine conditions with OR semantics
//!
//! # Design Decisions
//! - Header names are case-insensitive (RFC 9110)
//! - Path and header value matching are case-sensitive
//! - Paths are matched in percent-decoded form; the encoded path is what gets forwarded
//! - No regex to guarantee O(n) matching

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderName};
use percent_encoding::percent_decode_str;

/// Percent-decode a request path for matching. Invalid UTF-8 is replaced.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// The parts of an inbound request the resolver is allowed to look at.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

impl<'a> RequestMeta<'a> {
    pub fn new(path: &'a str, headers: &'a HeaderMap) -> Self {
        Self { path, headers }
    }

    /// Header value as UTF-8, if present and valid.
    pub fn header(&self, name: &HeaderName) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestMeta<'_>) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RequestMeta<'_>) -> bool {
        req.path.starts_with(&self.prefix)
    }
}

/// Matches when a header value starts with a prefix.
/// A missing header never matches, even for an empty prefix.
#[derive(Debug, Clone)]
pub struct HeaderPrefixMatcher {
    name: HeaderName,
    prefix: String,
}

impl HeaderPrefixMatcher {
    pub fn new(name: HeaderName, prefix: impl Into<String>) -> Self {
        Self {
            name,
            prefix: prefix.into(),
        }
    }
}

impl Matcher for HeaderPrefixMatcher {
    fn matches(&self, req: &RequestMeta<'_>) -> bool {
        req.header(&self.name)
            .map(|v| v.starts_with(&self.prefix))
            .unwrap_or(false)
    }
}

/// Matches when a header value equals an expected value.
#[derive(Debug, Clone)]
pub struct HeaderValueMatcher {
    name: HeaderName,
    value: String,
}

impl HeaderValueMatcher {
    pub fn new(name: HeaderName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

impl Matcher for HeaderValueMatcher {
    fn matches(&self, req: &RequestMeta<'_>) -> bool {
        req.header(&self.name)
            .map(|v| v == self.value)
            .unwrap_or(false)
    }
}

/// Combines multiple matchers with OR semantics. Empty never matches.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, req: &RequestMeta<'_>) -> bool {
        self.matchers.iter().any(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/%73ecret/keys"), "/secret/keys");
        assert_eq!(decode_path("/plain"), "/plain");
        assert!(matches!(decode_path("/plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/secret");
        let empty = HeaderMap::new();

        assert!(matcher.matches(&RequestMeta::new("/secret", &empty)));
        assert!(matcher.matches(&RequestMeta::new("/secret/keys", &empty)));
        assert!(matcher.matches(&RequestMeta::new("/secrets", &empty)));
        assert!(!matcher.matches(&RequestMeta::new("/public", &empty)));
        assert!(!matcher.matches(&RequestMeta::new("/SECRET", &empty))); // Case sensitive
    }

    #[test]
    fn test_header_prefix_matcher() {
        let matcher = HeaderPrefixMatcher::new(HeaderName::from_static("calling-service"), "a");

        let apple = headers("calling-service", "apple");
        assert!(matcher.matches(&RequestMeta::new("/", &apple)));

        let banana = headers("calling-service", "banana");
        assert!(!matcher.matches(&RequestMeta::new("/", &banana)));

        let missing = HeaderMap::new();
        assert!(!matcher.matches(&RequestMeta::new("/", &missing)));
    }

    #[test]
    fn test_missing_header_never_matches_empty_prefix() {
        let matcher = HeaderPrefixMatcher::new(HeaderName::from_static("calling-service"), "");
        let missing = HeaderMap::new();
        assert!(!matcher.matches(&RequestMeta::new("/", &missing)));

        let present = headers("calling-service", "anything");
        assert!(matcher.matches(&RequestMeta::new("/", &present)));
    }

    #[test]
    fn test_any_matcher() {
        let matcher = AnyMatcher::new(vec![
            Box::new(PathPrefixMatcher::new("/forbidden")),
            Box::new(PathPrefixMatcher::new("/secret")),
        ]);
        let empty = HeaderMap::new();

        assert!(matcher.matches(&RequestMeta::new("/forbidden/x", &empty)));
        assert!(matcher.matches(&RequestMeta::new("/secret", &empty)));
        assert!(!matcher.matches(&RequestMeta::new("/open", &empty)));

        let none = AnyMatcher::default();
        assert!(none.is_empty());
        assert!(!none.matches(&RequestMeta::new("/secret", &empty)));
    }

    #[test]
    fn test_header_value_matcher() {
        let matcher = HeaderValueMatcher::new(HeaderName::from_static("calling-service"), "billing");
        let exact = headers("calling-service", "billing");
        let other = headers("calling-service", "billing-v2");
        assert!(matcher.matches(&RequestMeta::new("/", &exact)));
        assert!(!matcher.matches(&RequestMeta::new("/", &other)));
    }
}
