//! Request rewriting.
//!
//! # Responsibilities
//! - Build the outbound request for a `Forward` decision
//! - Keep the URL authority and `Host` header in agreement
//! - Strip hop-by-hop and internal control headers
//! - Turn `ShortCircuit` decisions into a synthetic response that is never sent
//!
//! # Design Decisions
//! - Copy-on-rewrite: inbound parts are only borrowed, the body stream is moved
//! - Upstream always speaks HTTP/1.1; the client negotiates nothing else
//! - A URI that cannot be rebuilt yields a synthetic 400

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{
    header, request::Parts, uri::PathAndQuery, HeaderMap, HeaderName, HeaderValue, Request,
    StatusCode, Uri, Version,
};

use crate::config::HeadersConfig;
use crate::http::headers::{
    append_forwarded_for, strip_hop_by_hop, wants_trailers, X_FORWARDED_HOST, X_FORWARDED_PROTO,
};
use crate::routing::{InterceptDecision, ProxyTarget, RouteKind, SyntheticResponse};

/// A request ready to be sent to its target.
#[derive(Debug)]
pub struct OutboundRequest {
    request: Request<Body>,
    target: Arc<ProxyTarget>,
    route: RouteKind,
}

impl OutboundRequest {
    pub fn target(&self) -> &Arc<ProxyTarget> {
        &self.target
    }

    pub fn route(&self) -> RouteKind {
        self.route
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn into_request(self) -> Request<Body> {
        self.request
    }
}

/// Result of rewriting a request.
#[derive(Debug)]
pub enum Rewritten {
    Forward(OutboundRequest),
    Synthetic(SyntheticResponse),
}

/// Builds outbound requests from inbound ones.
#[derive(Debug, Clone)]
pub struct Rewriter {
    strip: Vec<HeaderName>,
    forwarded: bool,
}

impl Rewriter {
    pub fn new(strip: Vec<HeaderName>, forwarded: bool) -> Self {
        Self { strip, forwarded }
    }

    /// Build from config. Invalid header names are skipped; validation reports them.
    pub fn from_config(config: &HeadersConfig) -> Self {
        let strip = config
            .strip
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();
        Self::new(strip, config.forwarded)
    }

    pub fn rewrite(
        &self,
        inbound: &Parts,
        body: Body,
        decision: InterceptDecision,
        client: Option<SocketAddr>,
    ) -> Rewritten {
        match decision {
            InterceptDecision::ShortCircuit(response) => Rewritten::Synthetic(response),
            InterceptDecision::Forward { target, route } => {
                match self.forward(inbound, body, target, route, client) {
                    Ok(outbound) => Rewritten::Forward(outbound),
                    Err(e) => {
                        tracing::warn!(uri = %inbound.uri, error = %e, "Failed to rewrite request");
                        Rewritten::Synthetic(SyntheticResponse::text(
                            StatusCode::BAD_REQUEST,
                            "bad request\n",
                        ))
                    }
                }
            }
        }
    }

    fn forward(
        &self,
        inbound: &Parts,
        body: Body,
        target: Arc<ProxyTarget>,
        route: RouteKind,
        client: Option<SocketAddr>,
    ) -> Result<OutboundRequest, axum::http::Error> {
        let path = target.join_path(inbound.uri.path());
        let path_and_query = match inbound.uri.query() {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };
        let uri = Uri::builder()
            .scheme(target.scheme().clone())
            .authority(target.authority().clone())
            .path_and_query(PathAndQuery::try_from(path_and_query)?)
            .build()?;

        let mut headers = inbound.headers.clone();
        let keep_trailers = wants_trailers(&headers);
        strip_hop_by_hop(&mut headers);
        for name in &self.strip {
            headers.remove(name);
        }
        if keep_trailers {
            headers.insert(header::TE, HeaderValue::from_static("trailers"));
        }

        if self.forwarded {
            if let Some(addr) = client {
                append_forwarded_for(&mut headers, addr.ip());
            }
            let original_host = inbound
                .headers
                .get(header::HOST)
                .cloned()
                .or_else(|| {
                    inbound
                        .uri
                        .authority()
                        .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
                });
            if let Some(host) = original_host {
                headers.insert(X_FORWARDED_HOST, host);
            }
            headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        }

        // Host must always match the URI authority.
        headers.insert(header::HOST, HeaderValue::from_str(target.authority().as_str())?);

        let mut request = Request::builder()
            .method(inbound.method.clone())
            .uri(uri)
            .version(Version::HTTP_11)
            .body(body)?;
        *request.headers_mut() = headers;

        Ok(OutboundRequest {
            request,
            target,
            route,
        })
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::from_config(&HeadersConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn inbound(uri: &str) -> (Parts, Body) {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::HOST, "proxy.local:8080")
            .header(header::CONNECTION, "keep-alive, x-hop")
            .header("x-hop", "1")
            .header("interceptor-status-code", "403")
            .header("interceptor-status-text", "smuggled")
            .header("calling-service", "apple")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
            .into_parts()
    }

    fn forward_to(url: &str) -> InterceptDecision {
        InterceptDecision::Forward {
            target: Arc::new(ProxyTarget::parse(url).unwrap()),
            route: RouteKind::Legacy,
        }
    }

    fn expect_forward(rewritten: Rewritten) -> OutboundRequest {
        match rewritten {
            Rewritten::Forward(out) => out,
            other => panic!("expected forward, got {:?}", other),
        }
    }

    #[test]
    fn test_host_header_matches_uri_authority() {
        let (parts, body) = inbound("/orders?id=7");
        let client: SocketAddr = "192.168.1.5:40000".parse().unwrap();
        let out = expect_forward(Rewriter::default().rewrite(
            &parts,
            body,
            forward_to("http://localhost:9001"),
            Some(client),
        ));

        assert_eq!(out.uri().to_string(), "http://localhost:9001/orders?id=7");
        assert_eq!(
            out.headers().get(header::HOST).unwrap(),
            out.uri().authority().unwrap().as_str()
        );
    }

    #[test]
    fn test_prefix_is_joined() {
        let (parts, body) = inbound("/items");
        let out = expect_forward(Rewriter::default().rewrite(
            &parts,
            body,
            forward_to("http://localhost:8081/baseurl/"),
            None,
        ));
        assert_eq!(out.uri().to_string(), "http://localhost:8081/baseurl/items");
    }

    #[test]
    fn test_strips_hop_by_hop_and_control_headers() {
        let (parts, body) = inbound("/");
        let out = expect_forward(Rewriter::default().rewrite(
            &parts,
            body,
            forward_to("http://localhost:9001"),
            None,
        ));

        let headers = out.headers();
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("x-hop").is_none());
        assert!(headers.get("interceptor-status-code").is_none());
        assert!(headers.get("interceptor-status-text").is_none());
        assert_eq!(headers.get("calling-service").unwrap(), "apple");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_forwarded_headers() {
        let (parts, body) = inbound("/");
        let client: SocketAddr = "192.168.1.5:40000".parse().unwrap();
        let out = expect_forward(Rewriter::default().rewrite(
            &parts,
            body,
            forward_to("http://localhost:9001"),
            Some(client),
        ));

        let headers = out.headers();
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "192.168.1.5");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "proxy.local:8080");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");

        let (parts, body) = inbound("/");
        let out = expect_forward(Rewriter::new(Vec::new(), false).rewrite(
            &parts,
            body,
            forward_to("http://localhost:9001"),
            Some(client),
        ));
        assert!(out.headers().get("x-forwarded-for").is_none());
    }

    #[test]
    fn test_inbound_parts_are_untouched() {
        let (parts, body) = inbound("/orders");
        let before = parts.headers.clone();
        let uri_before = parts.uri.clone();

        let _ = Rewriter::default().rewrite(&parts, body, forward_to("https://aggregator1.example.com"), None);

        assert_eq!(parts.headers, before);
        assert_eq!(parts.uri, uri_before);
        assert_eq!(parts.headers.get(header::HOST).unwrap(), "proxy.local:8080");
    }

    #[test]
    fn test_short_circuit_is_synthetic() {
        let (parts, body) = inbound("/secret");
        let decision = InterceptDecision::ShortCircuit(SyntheticResponse::text(
            StatusCode::FORBIDDEN,
            "Forbidden path\n",
        ));

        match Rewriter::default().rewrite(&parts, body, decision, None) {
            Rewritten::Synthetic(resp) => assert_eq!(resp.status, StatusCode::FORBIDDEN),
            other => panic!("expected synthetic, got {:?}", other),
        }
    }

    #[test]
    fn test_upstream_version_is_http11() {
        let (mut parts, body) = inbound("/");
        parts.version = Version::HTTP_2;
        let out = expect_forward(Rewriter::default().rewrite(
            &parts,
            body,
            forward_to("http://localhost:9001"),
            None,
        ));
        assert_eq!(out.into_request().version(), Version::HTTP_11);
    }
}
