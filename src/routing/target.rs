//! Upstream target definition and parsing.
//!
//! # Responsibilities
//! - Parse and validate absolute upstream URLs (scheme + host required)
//! - Hold the pre-parsed scheme/authority used by the rewriter
//! - Join the optional path prefix with inbound request paths
//!
//! # Design Decisions
//! - Immutable once built; shared as `Arc<ProxyTarget>`
//! - Only `http` and `https` are accepted
//! - Query strings and fragments are rejected rather than merged

use axum::http::uri::{Authority, Scheme};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Error returned when a target URL is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("target is missing")]
    Missing,
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),
    #[error("target has no host")]
    MissingHost,
    #[error("target must not carry a query or fragment")]
    UnexpectedComponent,
    #[error("invalid authority: {0}")]
    Authority(String),
}

/// An upstream a request can be forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    scheme: Scheme,
    authority: Authority,
    path_prefix: Option<String>,
}

impl ProxyTarget {
    /// Parse an absolute `http`/`https` URL.
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TargetError::Missing);
        }

        let url = Url::parse(input)?;
        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        };

        if url.query().is_some() || url.fragment().is_some() {
            return Err(TargetError::UnexpectedComponent);
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(TargetError::MissingHost),
        };
        let authority_str = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority_str)
            .map_err(|e| TargetError::Authority(e.to_string()))?;

        let trimmed = url.path().trim_end_matches('/');
        let path_prefix = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };

        Ok(Self {
            scheme,
            authority,
            path_prefix,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    /// Prepend the target's path prefix to an inbound path.
    pub fn join_path(&self, path: &str) -> String {
        match &self.path_prefix {
            Some(prefix) if path.starts_with('/') => format!("{}{}", prefix, path),
            Some(prefix) => format!("{}/{}", prefix, path),
            None if path.is_empty() => "/".to_string(),
            None => path.to_string(),
        }
    }
}

impl FromStr for ProxyTarget {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}",
            self.scheme,
            self.authority,
            self.path_prefix.as_deref().unwrap_or("")
        )
    }
}
