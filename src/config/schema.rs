//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tee proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the tee proxy.
///
/// Built once at startup and shared read-only with every request handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Production backend. Its responses are returned to clients.
    pub primary: BackendConfig,

    /// Shadow backend. Receives mirrored traffic; responses are only compared.
    pub shadow: BackendConfig,

    /// Mirroring policy.
    pub mirror: MirrorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            primary: BackendConfig {
                address: "localhost:8080".to_string(),
                timeout_ms: 2500,
                rewrite_host: false,
            },
            shadow: BackendConfig {
                address: "localhost:8081".to_string(),
                timeout_ms: 1000,
                rewrite_host: false,
            },
            mirror: MirrorConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Optional TLS configuration. When present the listener terminates TLS.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Backend server configuration.
///
/// A table that omits `timeout_ms` gets [`default_timeout_ms`], not the
/// role-specific default of [`ProxyConfig::default`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend authority (e.g., "127.0.0.1:3000"). Requests go to `http://<address><path>`.
    pub address: String,

    /// Deadline for connecting and receiving response headers, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Replace the inbound `Host` header with `address`.
    #[serde(default)]
    pub rewrite_host: bool,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Traffic mirroring policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Percentage of requests copied to the shadow backend (0..=100).
    pub percent: f64,

    /// Append the caller to `Forwarded` / `X-Forwarded-For` on the primary request.
    pub forward_client_ip: bool,

    /// Disable keep-alive towards clients and backends.
    pub close_connections: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            percent: 100.0,
            forward_client_ip: false,
            close_connections: false,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_flags() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8888");
        assert_eq!(config.primary.address, "localhost:8080");
        assert_eq!(config.primary.timeout(), Duration::from_millis(2500));
        assert_eq!(config.shadow.address, "localhost:8081");
        assert_eq!(config.shadow.timeout(), Duration::from_millis(1000));
        assert_eq!(config.mirror.percent, 100.0);
        assert!(!config.mirror.forward_client_ip);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [shadow]
            address = "10.0.0.2:9000"
            rewrite_host = true

            [mirror]
            percent = 12.5
            "#,
        )
        .unwrap();

        assert_eq!(config.primary.address, "localhost:8080");
        assert_eq!(config.shadow.address, "10.0.0.2:9000");
        assert_eq!(config.shadow.timeout_ms, 1000);
        assert!(config.shadow.rewrite_host);
        assert_eq!(config.mirror.percent, 12.5);
        assert!(!config.mirror.close_connections);
    }
}
