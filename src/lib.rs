//! Retargetable HTTP reverse proxy.
//!
//! Every inbound request is forwarded to a default target that can be swapped
//! at runtime through a control endpoint. Callers flagged by a request header
//! are routed to a table of aggregator targets instead, and configured path
//! prefixes are answered directly without contacting any upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────▶ http::server ──▶ routing::Resolver ──▶ http::rewrite ──▶ transport ──▶ Upstream
//!                 │                   ▲                    │
//!                 │                   │                    └─ synthetic response (intercept)
//!                 ▼                   │
//!             control ──────▶ control::ProxyState
//!
//!     Client Response ◀── http::response (relay) ◀── transport
//! ```

// Core subsystems
pub mod config;
pub mod control;
pub mod http;
pub mod routing;
pub mod transport;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use control::ProxyState;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::ProxyTarget;
