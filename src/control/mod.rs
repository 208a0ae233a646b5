//! Control plane for the default target.
//!
//! # Data Flow
//! ```text
//! GET  <path>              → handlers::get_target → ProxyState snapshot
//! POST <path>?target=<url> → auth → handlers::set_target → ProxyTarget::parse → swap
//! ```
//!
//! # Design Decisions
//! - Only the exact control path is served here; everything else is proxied
//! - Bearer auth is applied per route, so unknown paths never see a 401

pub mod auth;
pub mod handlers;
pub mod state;

use axum::{middleware, routing::get, Router};

use crate::http::server::AppState;

use self::auth::control_auth_middleware;
use self::handlers::{get_target, set_target};

pub use state::ProxyState;

/// Routes served on the control path.
pub fn control_routes(path: &str, state: AppState) -> Router<AppState> {
    Router::new()
        .route(path, get(get_target).post(set_target))
        .route_layer(middleware::from_fn_with_state(state, control_auth_middleware))
}
