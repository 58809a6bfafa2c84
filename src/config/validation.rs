//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (percent within 0..=100, timeouts > 0)
//! - Check backend addresses are plain `host:port` authorities
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{BackendConfig, ProxyConfig};

/// A single semantic problem found in a [`ProxyConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("{role}.address `{address}` is not a host:port authority")]
    BackendAddress { role: &'static str, address: String },

    #[error("{role}.timeout_ms must be greater than zero")]
    ZeroTimeout { role: &'static str },

    #[error("mirror.percent must be within 0..=100, got {0}")]
    Percent(f64),

    #[error("listener.tls requires both cert_path and key_path")]
    TlsPaths,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check every semantic constraint and collect all failures.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() || tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPaths);
        }
    }

    validate_backend("primary", &config.primary, &mut errors);
    validate_backend("shadow", &config.shadow, &mut errors);

    let percent = config.mirror.percent;
    if !(0.0..=100.0).contains(&percent) {
        errors.push(ValidationError::Percent(percent));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backend(role: &'static str, backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    if !is_authority(&backend.address) {
        errors.push(ValidationError::BackendAddress {
            role,
            address: backend.address.clone(),
        });
    }
    if backend.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout { role });
    }
}

/// `true` when `http://<address>` parses to a URL with a host and nothing after the authority.
fn is_authority(address: &str) -> bool {
    if address.is_empty() || address.contains('/') || address.contains('@') {
        return false;
    }
    match Url::parse(&format!("http://{}", address)) {
        Ok(url) => url.host_str().is_some() && url.path() == "/" && url.query().is_none(),
        Err(_) => false,
    }
}
