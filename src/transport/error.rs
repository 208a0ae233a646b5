//! Transport error taxonomy and classification.
//!
//! An expired connect timeout counts as `Timeout` (504), not `ConnectFailed`.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use axum::http::StatusCode;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure talking to an upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream reset the connection: {0}")]
    UpstreamReset(String),
    #[error("upstream error: {0}")]
    Other(String),
}

impl TransportError {
    /// Status sent to the caller when no response bytes went out yet.
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::ConnectFailed(_) => "connect_failed",
            TransportError::Timeout(_) => "timeout",
            TransportError::UpstreamReset(_) => "upstream_reset",
            TransportError::Other(_) => "other",
        }
    }

    /// Classify an error from the pooled client.
    pub fn from_client(err: hyper_util::client::legacy::Error, connect_timeout: Duration) -> Self {
        classify(&err, err.is_connect(), connect_timeout)
    }

    /// Classify an error raised while streaming a response body.
    pub fn from_body(err: BoxError) -> Self {
        let mut current: Option<&(dyn StdError + 'static)> = Some(err.as_ref());
        while let Some(e) = current {
            if let Some(transport) = e.downcast_ref::<TransportError>() {
                return transport.clone();
            }
            current = e.source();
        }
        let detail = describe(err.as_ref());
        if is_reset(err.as_ref()) {
            TransportError::UpstreamReset(detail)
        } else {
            TransportError::Other(detail)
        }
    }
}

fn classify(err: &(dyn StdError + 'static), is_connect: bool, connect_timeout: Duration) -> TransportError {
    let detail = describe(err);
    if is_connect {
        if has_io_kind(err, &[io::ErrorKind::TimedOut]) {
            TransportError::Timeout(connect_timeout)
        } else {
            TransportError::ConnectFailed(detail)
        }
    } else if is_reset(err) {
        TransportError::UpstreamReset(detail)
    } else {
        TransportError::Other(detail)
    }
}

fn has_io_kind(err: &(dyn StdError + 'static), kinds: &[io::ErrorKind]) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if kinds.contains(&io_err.kind()) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Walk the source chain looking for a dropped connection.
fn is_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_closed() {
                return true;
            }
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Join an error and its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        out.push_str(": ");
        out.push_str(&e.to_string());
        current = e.source();
    }
    out
}
