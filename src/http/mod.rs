//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → [routing::Resolver decides forward or short-circuit]
//!     → rewrite.rs (build outbound request, fix Host, strip headers)
//!     → [transport sends upstream]
//!     → response.rs (relay, strip hop-by-hop, map failures)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod rewrite;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use rewrite::{OutboundRequest, Rewriter, Rewritten};
pub use server::{AppState, HttpServer, ProxyPolicy};
