//! Feature-flag routing.
//!
//! Callers identified by a header (e.g. `Calling-Service`) are either moved
//! onto the "new" aggregator table or left on the legacy default target.
//! Selection within the table is a pure function of the header value so the
//! same caller always lands on the same aggregator.

use std::sync::Arc;

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::routing::matcher::{
    AnyMatcher, HeaderPrefixMatcher, HeaderValueMatcher, Matcher, RequestMeta,
};
use crate::routing::target::ProxyTarget;

/// Outcome of the feature-flag check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteChoice {
    /// Keep the caller on the default target.
    Legacy,
    /// Send the caller to the selected aggregator.
    NewRoute(Arc<ProxyTarget>),
}

/// How an aggregator is picked from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// `value.len() % table.len()`.
    #[default]
    Length,
    /// FNV-1a of the value, modulo table size.
    Hash,
}

impl SelectionStrategy {
    /// Index into a table of `len` entries. `len` must be non-zero.
    pub fn index(&self, value: &str, len: usize) -> usize {
        match self {
            SelectionStrategy::Length => value.len() % len,
            SelectionStrategy::Hash => (fnv1a(value.as_bytes()) % len as u64) as usize,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ *b as u64).wrapping_mul(PRIME))
}

/// Feature-flag predicate plus the aggregator table it routes to.
#[derive(Debug)]
pub struct FlagPolicy {
    header: HeaderName,
    predicate: AnyMatcher,
    aggregators: Vec<Arc<ProxyTarget>>,
    strategy: SelectionStrategy,
}

impl FlagPolicy {
    pub fn new(
        header: HeaderName,
        prefixes: &[String],
        services: &[String],
        aggregators: Vec<ProxyTarget>,
        strategy: SelectionStrategy,
    ) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        for prefix in prefixes {
            matchers.push(Box::new(HeaderPrefixMatcher::new(header.clone(), prefix.clone())));
        }
        for service in services {
            matchers.push(Box::new(HeaderValueMatcher::new(header.clone(), service.clone())));
        }

        Self {
            header,
            predicate: AnyMatcher::new(matchers),
            aggregators: aggregators.into_iter().map(Arc::new).collect(),
            strategy,
        }
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    pub fn aggregators(&self) -> &[Arc<ProxyTarget>] {
        &self.aggregators
    }

    /// Decide between the legacy target and the new aggregator table.
    pub fn choose(&self, req: &RequestMeta<'_>) -> RouteChoice {
        if self.aggregators.is_empty() || !self.predicate.matches(req) {
            return RouteChoice::Legacy;
        }

        let value = req.header(&self.header).unwrap_or_default();
        let idx = self.strategy.index(value, self.aggregators.len());
        RouteChoice::NewRoute(self.aggregators[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn policy(strategy: SelectionStrategy) -> FlagPolicy {
        FlagPolicy::new(
            HeaderName::from_static("calling-service"),
            &["a".to_string()],
            &["billing".to_string()],
            vec![
                ProxyTarget::parse("https://aggregator1.example.com").unwrap(),
                ProxyTarget::parse("https://aggregator2.example.com").unwrap(),
            ],
            strategy,
        )
    }

    fn caller(name: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("calling-service", HeaderValue::from_str(name).unwrap());
        headers
    }

    #[test]
    fn test_prefix_selects_new_route_by_length() {
        let policy = policy(SelectionStrategy::Length);

        // "apple" has length 5 -> 5 % 2 = 1
        let headers = caller("apple");
        match policy.choose(&RequestMeta::new("/", &headers)) {
            RouteChoice::NewRoute(t) => assert_eq!(t.to_string(), "https://aggregator2.example.com"),
            other => panic!("expected new route, got {:?}", other),
        }

        // "acai" has length 4 -> 0
        let headers = caller("acai");
        match policy.choose(&RequestMeta::new("/", &headers)) {
            RouteChoice::NewRoute(t) => assert_eq!(t.to_string(), "https://aggregator1.example.com"),
            other => panic!("expected new route, got {:?}", other),
        }
    }

    #[test]
    fn test_non_matching_caller_stays_legacy() {
        let policy = policy(SelectionStrategy::Length);

        let headers = caller("banana");
        assert_eq!(policy.choose(&RequestMeta::new("/", &headers)), RouteChoice::Legacy);

        let empty = HeaderMap::new();
        assert_eq!(policy.choose(&RequestMeta::new("/", &empty)), RouteChoice::Legacy);
    }

    #[test]
    fn test_exact_service_match() {
        let policy = policy(SelectionStrategy::Length);
        let headers = caller("billing");
        assert!(matches!(
            policy.choose(&RequestMeta::new("/", &headers)),
            RouteChoice::NewRoute(_)
        ));
    }

    #[test]
    fn test_empty_table_is_legacy() {
        let policy = FlagPolicy::new(
            HeaderName::from_static("calling-service"),
            &["a".to_string()],
            &[],
            Vec::new(),
            SelectionStrategy::Length,
        );
        let headers = caller("apple");
        assert_eq!(policy.choose(&RequestMeta::new("/", &headers)), RouteChoice::Legacy);
    }

    #[test]
    fn test_hash_selection_is_stable() {
        let policy = policy(SelectionStrategy::Hash);
        let headers = caller("analytics");

        let first = policy.choose(&RequestMeta::new("/", &headers));
        for _ in 0..10 {
            assert_eq!(policy.choose(&RequestMeta::new("/", &headers)), first);
        }
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
