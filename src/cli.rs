//! Command-line interface.
//!
//! Flags override values from the optional `--config` file, which in turn
//! override built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{load_config, validate_config, ConfigError, ProxyConfig, TlsConfig};

#[derive(Debug, Parser)]
#[command(name = "teeproxy")]
#[command(about = "Mirror HTTP traffic to a shadow backend and compare responses", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to accept requests on.
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Where production traffic goes (host:port).
    #[arg(short = 'a', long)]
    pub primary: Option<String>,

    /// Where mirrored traffic goes (host:port); responses are discarded.
    #[arg(short = 'b', long)]
    pub shadow: Option<String>,

    /// Timeout in milliseconds for production traffic.
    #[arg(long)]
    pub primary_timeout_ms: Option<u64>,

    /// Timeout in milliseconds for mirrored traffic.
    #[arg(long)]
    pub shadow_timeout_ms: Option<u64>,

    /// Rewrite the Host header when proxying production traffic.
    #[arg(long)]
    pub primary_rewrite_host: bool,

    /// Rewrite the Host header when proxying mirrored traffic.
    #[arg(long)]
    pub shadow_rewrite_host: bool,

    /// Percentage of traffic to mirror (0-100).
    #[arg(short = 'p', long)]
    pub percent: Option<f64>,

    /// TLS certificate file (PEM).
    #[arg(long, requires = "key_file")]
    pub cert_file: Option<String>,

    /// TLS private key file (PEM).
    #[arg(long, requires = "cert_file")]
    pub key_file: Option<String>,

    /// Forward the client IP via `X-Forwarded-For` and `Forwarded`.
    #[arg(long)]
    pub forward_client_ip: bool,

    /// Close connections to clients and backends after each request.
    #[arg(long)]
    pub close_connections: bool,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_address: Option<String>,

    /// More logging, including comparison details.
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Resolve the effective configuration: file or defaults, then flags, then validation.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply(self, config: &mut ProxyConfig) {
        if let Some(listen) = self.listen {
            config.listener.bind_address = normalize_listen(listen);
        }
        if let Some(primary) = self.primary {
            config.primary.address = primary;
        }
        if let Some(shadow) = self.shadow {
            config.shadow.address = shadow;
        }
        if let Some(ms) = self.primary_timeout_ms {
            config.primary.timeout_ms = ms;
        }
        if let Some(ms) = self.shadow_timeout_ms {
            config.shadow.timeout_ms = ms;
        }
        config.primary.rewrite_host |= self.primary_rewrite_host;
        config.shadow.rewrite_host |= self.shadow_rewrite_host;
        if let Some(percent) = self.percent {
            config.mirror.percent = percent;
        }
        if let (Some(cert_path), Some(key_path)) = (self.cert_file, self.key_file) {
            config.listener.tls = Some(TlsConfig { cert_path, key_path });
        }
        config.mirror.forward_client_ip |= self.forward_client_ip;
        config.mirror.close_connections |= self.close_connections;
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr;
        }
        if self.debug {
            config.observability.log_level = "debug".to_string();
        }
    }
}

/// Accept the port-only form `:8888` by binding every interface.
fn normalize_listen(listen: String) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen
    }
}
