use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct TargetParams {
    pub target: Option<String>,
}

/// `GET <control path>`: current target followed by a newline.
pub async fn get_target(State(state): State<AppState>) -> String {
    format!("{}\n", state.proxy_state.describe())
}

/// `POST <control path>?target=<url>`: validate and swap the default target.
pub async fn set_target(
    State(state): State<AppState>,
    Query(params): Query<TargetParams>,
) -> (StatusCode, String) {
    let previous = state.proxy_state.describe();

    match state.proxy_state.set_from_str(params.target.as_deref()) {
        Ok(target) => {
            metrics::record_target_change();
            tracing::info!(previous = %previous, upstream = %target, "Proxy target updated");
            (StatusCode::OK, format!("proxy target set to {}\n", target))
        }
        Err(e) => {
            tracing::warn!(input = ?params.target, error = %e, "Rejected proxy target");
            (
                StatusCode::BAD_REQUEST,
                format!("missing or bad target: {}\n", e),
            )
        }
    }
}
