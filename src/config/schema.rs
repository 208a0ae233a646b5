//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::SelectionStrategy;

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Initial default target.
    pub target: TargetConfig,

    /// Control plane endpoint settings.
    pub control: ControlConfig,

    /// Forbidden-path interception.
    pub intercept: InterceptConfig,

    /// Feature-flag routing.
    pub routing: RoutingConfig,

    /// Outbound header handling.
    pub headers: HeadersConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream connection pool settings.
    pub pool: PoolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Default target the proxy starts with. Unset means every legacy-routed
/// request gets a 503 until the control plane sets one.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TargetConfig {
    pub default: Option<String>,
}

/// Control plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Serve the control endpoint.
    pub enabled: bool,

    /// Path of the control endpoint.
    pub path: String,

    /// Optional Bearer token required for control requests.
    pub api_key: Option<String>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/proxy_target".to_string(),
            api_key: None,
        }
    }
}

/// Forbidden-path interception.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Path prefixes answered without contacting upstream.
    pub forbidden_paths: Vec<String>,

    /// Status code of the synthetic response.
    pub status: u16,

    /// Body of the synthetic response.
    pub message: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            forbidden_paths: Vec::new(),
            status: 403,
            message: "Forbidden path\n".to_string(),
        }
    }
}

/// Feature-flag routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Enable feature-flag routing.
    pub enabled: bool,

    /// Header identifying the calling service.
    pub flag_header: String,

    /// Callers whose header value starts with one of these use the new route.
    pub flag_prefixes: Vec<String>,

    /// Callers whose header value equals one of these use the new route.
    pub flag_services: Vec<String>,

    /// Ordered table of new-route targets.
    pub aggregators: Vec<String>,

    /// Selection strategy within the aggregator table.
    pub selection: SelectionStrategy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            flag_header: "Calling-Service".to_string(),
            flag_prefixes: vec!["a".to_string()],
            flag_services: Vec::new(),
            aggregators: Vec::new(),
            selection: SelectionStrategy::Length,
        }
    }
}

/// Outbound header handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Add X-Forwarded-For/Host/Proto to forwarded requests.
    pub forwarded: bool,

    /// Internal control headers removed before forwarding.
    pub strip: Vec<String>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            forwarded: true,
            strip: vec![
                "interceptor-status-code".to_string(),
                "interceptor-status-text".to_string(),
            ],
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (response head and full body) in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 90,
        }
    }
}

/// Upstream connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum idle connections kept per (scheme, host).
    pub max_idle_per_host: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 32,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
