//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate targets, header names, paths and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, StatusCode};

use crate::config::schema::ProxyConfig;
use crate::routing::{ProxyTarget, TargetError};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    Address { field: &'static str, value: String },
    #[error("{field}: invalid target `{value}`: {source}")]
    Target {
        field: &'static str,
        value: String,
        source: TargetError,
    },
    #[error("{field}: invalid header name `{value}`")]
    HeaderName { field: &'static str, value: String },
    #[error("{field}: path `{value}` must start with '/'")]
    Path { field: &'static str, value: String },
    #[error("control.path must not be '/'")]
    RootControlPath,
    #[error("control.path `{0}` must not contain '{{', '}}' or '*'")]
    ControlPathPattern(String),
    #[error("intercept.status: {0} is not a valid HTTP status")]
    Status(u16),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if let Some(default) = &config.target.default {
        check_target(&mut errors, "target.default", default);
    }

    if config.control.enabled {
        check_path(&mut errors, "control.path", &config.control.path);
        if config.control.path == "/" {
            errors.push(ValidationError::RootControlPath);
        }
        if config.control.path.contains(&['{', '}', '*'][..]) {
            errors.push(ValidationError::ControlPathPattern(config.control.path.clone()));
        }
    }

    for prefix in &config.intercept.forbidden_paths {
        check_path(&mut errors, "intercept.forbidden_paths", prefix);
    }
    if StatusCode::from_u16(config.intercept.status).is_err() {
        errors.push(ValidationError::Status(config.intercept.status));
    }

    if config.routing.enabled {
        check_header(&mut errors, "routing.flag_header", &config.routing.flag_header);
        for aggregator in &config.routing.aggregators {
            check_target(&mut errors, "routing.aggregators", aggregator);
        }
    }

    for name in &config.headers.strip {
        check_header(&mut errors, "headers.strip", name);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

fn check_target(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(source) = ProxyTarget::parse(value) {
        errors.push(ValidationError::Target {
            field,
            value: value.to_string(),
            source,
        });
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderName {
            field,
            value: value.to_string(),
        });
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::Path {
            field,
            value: value.to_string(),
        });
    }
}
