//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the control plane and the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener and shut down gracefully
//! - Dispatch requests: resolve → rewrite → transport or synthetic → relay
//! - Swap the routing policy when the config file changes

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request, Response, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{validation::validate_config, ConfigError, ProxyConfig, ValidationError};
use crate::control::{control_routes, ProxyState};
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{relay, synthetic};
use crate::http::rewrite::{Rewriter, Rewritten};
use crate::observability::metrics;
use crate::routing::matcher::decode_path;
use crate::routing::{FlagPolicy, InterceptPolicy, ProxyTarget, RequestMeta, Resolver};
use crate::transport::{HyperTransport, Transport};

/// Routing rules compiled from config. Replaced wholesale on reload.
#[derive(Debug)]
pub struct ProxyPolicy {
    pub resolver: Resolver,
    pub rewriter: Rewriter,
}

impl ProxyPolicy {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let intercept = InterceptPolicy::new(
            &config.intercept.forbidden_paths,
            StatusCode::from_u16(config.intercept.status)
                .map_err(|_| ConfigError::Validation(vec![ValidationError::Status(config.intercept.status)]))?,
            config.intercept.message.clone(),
        );

        let flag = if config.routing.enabled {
            let header = HeaderName::from_bytes(config.routing.flag_header.as_bytes()).map_err(|_| {
                ConfigError::Validation(vec![ValidationError::HeaderName {
                    field: "routing.flag_header",
                    value: config.routing.flag_header.clone(),
                }])
            })?;
            let aggregators = config
                .routing
                .aggregators
                .iter()
                .map(|a| parse_target("routing.aggregators", a))
                .collect::<Result<Vec<_>, _>>()?;
            Some(FlagPolicy::new(
                header,
                &config.routing.flag_prefixes,
                &config.routing.flag_services,
                aggregators,
                config.routing.selection,
            ))
        } else {
            None
        };

        Ok(Self {
            resolver: Resolver::new(intercept, flag),
            rewriter: Rewriter::from_config(&config.headers),
        })
    }
}

fn parse_target(field: &'static str, value: &str) -> Result<ProxyTarget, ConfigError> {
    ProxyTarget::parse(value).map_err(|source| {
        ConfigError::Validation(vec![ValidationError::Target {
            field,
            value: value.to_string(),
            source,
        }])
    })
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy_state: Arc<ProxyState>,
    pub policy: Arc<ArcSwap<ProxyPolicy>>,
    pub transport: Arc<dyn Transport>,
    pub control_api_key: Option<Arc<str>>,
}

impl AppState {
    /// Recompile the routing policy. The default target is left alone.
    pub fn reload(&self, config: &ProxyConfig) -> Result<(), ConfigError> {
        let policy = ProxyPolicy::from_config(config)?;
        self.policy.store(Arc::new(policy));
        Ok(())
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server forwarding through the pooled hyper client.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(HyperTransport::new(&config.timeouts, &config.pool));
        Self::with_transport(config, transport)
    }

    /// Create a server with a custom transport.
    pub fn with_transport(
        config: ProxyConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let policy = ProxyPolicy::from_config(&config)?;
        let initial = config
            .target
            .default
            .as_deref()
            .map(|t| parse_target("target.default", t))
            .transpose()?;

        let state = AppState {
            proxy_state: Arc::new(ProxyState::new(initial)),
            policy: Arc::new(ArcSwap::from_pointee(policy)),
            transport,
            control_api_key: config.control.api_key.as_deref().map(Arc::from),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new();
        if config.control.enabled {
            router = router.merge(control_routes(&config.control.path, state.clone()));
        }

        router
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            request_id = %request.request_id(),
                            method = %request.method(),
                            path = %request.uri().path(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match state.reload(&config) {
                    Ok(()) => tracing::info!("Routing policy reloaded"),
                    Err(e) => tracing::error!(error = %e, "Rejected config update, keeping current policy"),
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start = Instant::now();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let request_id = request.request_id().to_string();

    let (parts, body) = request.into_parts();
    let policy = state.policy.load_full();
    let path = decode_path(parts.uri.path());
    let decision = policy.resolver.resolve(
        &RequestMeta::new(&path, &parts.headers),
        state.proxy_state.current(),
    );

    match policy.rewriter.rewrite(&parts, body, decision, client) {
        Rewritten::Synthetic(response) => {
            tracing::debug!(
                request_id = %request_id,
                status = %response.status,
                "Answering without upstream"
            );
            metrics::record_request(parts.method.as_str(), response.status.as_u16(), "synthetic", start);
            synthetic(response)
        }
        Rewritten::Forward(outbound) => {
            let route = outbound.route();
            let upstream = outbound.target().clone();
            tracing::debug!(
                request_id = %request_id,
                route = %route,
                upstream = %upstream,
                uri = %outbound.uri(),
                "Forwarding request"
            );

            let result = state.transport.send(outbound).await;
            if let Err(e) = &result {
                metrics::record_transport_error(e.kind());
                tracing::error!(
                    request_id = %request_id,
                    upstream = %upstream,
                    kind = e.kind(),
                    error = %e,
                    "Upstream error"
                );
            }

            let response = relay(result);
            metrics::record_request(parts.method.as_str(), response.status().as_u16(), route.as_str(), start);
            response
        }
    }
}
