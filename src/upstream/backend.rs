//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent one of the two mirror destinations (primary or shadow)
//! - Build outbound URIs from the inbound path and query
//! - Carry the per-backend timeout and host rewrite policy

use axum::http::uri::InvalidUri;
use axum::http::Uri;
use std::fmt;
use std::time::Duration;

use crate::config::BackendConfig;

/// Which side of the mirror a backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendRole {
    /// Authoritative backend; its response reaches the client.
    Primary,
    /// Mirrored backend; its response is only compared.
    Shadow,
}

impl BackendRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendRole::Primary => "primary",
            BackendRole::Shadow => "shadow",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single backend server.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Primary or shadow.
    pub role: BackendRole,
    /// Network authority, `host:port`.
    pub address: String,
    /// Connect and response-header deadline.
    pub timeout: Duration,
    /// Replace the `Host` header with `address` on outbound requests.
    pub rewrite_host: bool,
}

impl Backend {
    pub fn new(role: BackendRole, config: &BackendConfig) -> Self {
        Self {
            role,
            address: config.address.clone(),
            timeout: config.timeout(),
            rewrite_host: config.rewrite_host,
        }
    }

    /// Absolute URI for `path_and_query` on this backend: `http://<address><path_and_query>`.
    pub fn target_uri(&self, path_and_query: &str) -> Result<Uri, InvalidUri> {
        let path_and_query = if path_and_query.is_empty() { "/" } else { path_and_query };
        format!("http://{}{}", self.address, path_and_query).parse()
    }
}
