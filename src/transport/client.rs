//! Pooled upstream client.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;

use crate::config::{PoolConfig, TimeoutConfig};
use crate::http::rewrite::OutboundRequest;
use crate::transport::body::DeadlineBody;
use crate::transport::error::TransportError;
use crate::transport::Transport;

/// [`Transport`] backed by hyper's pooled client.
///
/// The pool is keyed by (scheme, authority). A connection is only handed
/// back once its response body has been read to the end; errored or
/// abandoned connections are closed instead.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HyperTransport {
    pub fn new(timeouts: &TimeoutConfig, pool: &PoolConfig) -> Self {
        let connect_timeout = Duration::from_secs(timeouts.connect_secs);
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(connect_timeout));
        http.set_nodelay(true);

        let connector = HttpsConnector::new_with_connector(http);
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .build(connector);

        Self {
            client,
            connect_timeout,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Override the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Body>, TransportError> {
        let timeout = self.request_timeout;
        let deadline = Instant::now() + timeout;
        let target = request.target().to_string();

        let response = match tokio::time::timeout_at(deadline, self.client.request(request.into_request())).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = TransportError::from_client(e, self.connect_timeout);
                tracing::warn!(upstream = %target, kind = err.kind(), error = %err, "Upstream request failed");
                return Err(err);
            }
            Err(_) => {
                tracing::warn!(upstream = %target, timeout = ?timeout, "Upstream response head timed out");
                return Err(TransportError::Timeout(timeout));
            }
        };

        Ok(response.map(|body| Body::new(DeadlineBody::new(body, deadline, timeout))))
    }
}
