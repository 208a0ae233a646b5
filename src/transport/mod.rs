//! Upstream transport subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest (from the rewriter)
//!     → client.rs (pooled hyper client, connect timeout, request deadline)
//!     → body.rs (response body bounded by the same deadline)
//!     → Response<Body> or error.rs (TransportError)
//! ```
//!
//! # Design Decisions
//! - Connections pooled per (scheme, authority) and reused across requests
//! - One deadline per request covering the response head and the whole body
//! - Bodies are streamed, never buffered
//! - Dropping the in-flight future (caller went away) cancels the upstream call
//! - No retries: non-idempotent requests are never replayed

pub mod body;
pub mod client;
pub mod error;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;

use crate::http::rewrite::OutboundRequest;

pub use body::DeadlineBody;
pub use client::HyperTransport;
pub use error::TransportError;

/// Sends rewritten requests upstream.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, TransportError>;
}
