//! Target resolution.
//!
//! # Responsibilities
//! - Short-circuit forbidden paths with a synthetic response
//! - Apply feature-flag routing to pick an aggregator
//! - Fall back to the default (legacy) target
//!
//! # Design Decisions
//! - Pure: depends only on request metadata and the state snapshot passed in
//! - Always yields a decision; an unset default target short-circuits with 503
//! - Forbidden paths are checked before any routing

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::routing::flag::{FlagPolicy, RouteChoice};
use crate::routing::matcher::{AnyMatcher, Matcher, PathPrefixMatcher, RequestMeta};
use crate::routing::target::ProxyTarget;

/// Which routing rule produced a forward decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Legacy,
    NewRoute,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Legacy => "legacy",
            RouteKind::NewRoute => "new_route",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response produced by the proxy itself, without contacting upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl SyntheticResponse {
    /// Plain-text response with the given status.
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            body: body.into(),
            headers,
        }
    }
}

/// Per-request routing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    Forward {
        target: Arc<ProxyTarget>,
        route: RouteKind,
    },
    ShortCircuit(SyntheticResponse),
}

/// Forbidden-path interception settings.
#[derive(Debug)]
pub struct InterceptPolicy {
    forbidden: AnyMatcher,
    status: StatusCode,
    message: Bytes,
}

impl InterceptPolicy {
    pub fn new(prefixes: &[String], status: StatusCode, message: impl Into<Bytes>) -> Self {
        let matchers = prefixes
            .iter()
            .map(|p| Box::new(PathPrefixMatcher::new(p.clone())) as Box<dyn Matcher>)
            .collect();
        Self {
            forbidden: AnyMatcher::new(matchers),
            status,
            message: message.into(),
        }
    }

    /// Policy that never intercepts.
    pub fn disabled() -> Self {
        Self::new(&[], StatusCode::FORBIDDEN, Bytes::new())
    }

    fn check(&self, req: &RequestMeta<'_>) -> Option<SyntheticResponse> {
        if self.forbidden.matches(req) {
            Some(SyntheticResponse::text(self.status, self.message.clone()))
        } else {
            None
        }
    }
}

/// Resolves inbound requests to an [`InterceptDecision`].
#[derive(Debug)]
pub struct Resolver {
    intercept: InterceptPolicy,
    flag: Option<FlagPolicy>,
}

impl Resolver {
    pub fn new(intercept: InterceptPolicy, flag: Option<FlagPolicy>) -> Self {
        Self { intercept, flag }
    }

    /// Decide what to do with a request given the current default target.
    pub fn resolve(
        &self,
        req: &RequestMeta<'_>,
        default_target: Option<Arc<ProxyTarget>>,
    ) -> InterceptDecision {
        if let Some(response) = self.intercept.check(req) {
            tracing::debug!(path = %req.path, status = %response.status, "Intercepting forbidden path");
            return InterceptDecision::ShortCircuit(response);
        }

        if let Some(flag) = &self.flag {
            if let RouteChoice::NewRoute(target) = flag.choose(req) {
                tracing::debug!(
                    caller = req.header(flag.header()).unwrap_or_default(),
                    upstream = %target,
                    "Applying new route logic"
                );
                return InterceptDecision::Forward {
                    target,
                    route: RouteKind::NewRoute,
                };
            }
        }

        match default_target {
            Some(target) => InterceptDecision::Forward {
                target,
                route: RouteKind::Legacy,
            },
            None => InterceptDecision::ShortCircuit(SyntheticResponse::text(
                StatusCode::SERVICE_UNAVAILABLE,
                "no proxy target configured\n",
            )),
        }
    }
}
