//! Response relay.
//!
//! # Responsibilities
//! - Pass upstream status, headers and body back to the caller
//! - Strip hop-by-hop headers from upstream responses
//! - Map transport failures to 502 / 504 when nothing has been sent yet
//! - Emit synthetic (short-circuit) responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Failures after the head went out abort the stream instead of truncating silently
//! - Error responses carry no body, so nothing upstream-derived leaks into them

use axum::body::Body;
use axum::http::Response;
use axum::response::IntoResponse;

use crate::http::headers::strip_hop_by_hop;
use crate::routing::SyntheticResponse;
use crate::transport::TransportError;

/// Turn the transport outcome into the response sent to the caller.
pub fn relay(result: Result<Response<Body>, TransportError>) -> Response<Body> {
    match result {
        Ok(upstream) => {
            let (mut parts, body) = upstream.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, body)
        }
        Err(e) => error_response(&e),
    }
}

/// Response for a request that failed before any upstream bytes arrived.
pub fn error_response(err: &TransportError) -> Response<Body> {
    err.status().into_response()
}

/// Emit a response produced by the proxy itself.
pub fn synthetic(response: SyntheticResponse) -> Response<Body> {
    let SyntheticResponse {
        status,
        body,
        headers,
    } = response;
    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{header, StatusCode};
    use std::time::Duration;

    #[tokio::test]
    async fn test_relay_preserves_status_and_body() {
        let upstream = Response::builder()
            .status(StatusCode::IM_A_TEAPOT)
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::CONNECTION, "close")
            .header(header::TRANSFER_ENCODING, "chunked")
            .header("x-upstream", "yes")
            .body(Body::from("hello world"))
            .unwrap();

        let response = relay(Ok(upstream));
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(response.headers().get(header::CONNECTION).is_none());
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_transport_errors_map_to_gateway_statuses() {
        let refused = relay(Err(TransportError::ConnectFailed("connection refused".into())));
        assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(refused.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        let timeout = relay(Err(TransportError::Timeout(Duration::from_secs(30))));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_synthetic_response() {
        let response = synthetic(SyntheticResponse::text(StatusCode::FORBIDDEN, "Forbidden path\n"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"Forbidden path\n"));
    }
}
