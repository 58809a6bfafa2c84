//! teeproxy
//!
//! Duplicates live HTTP traffic to a shadow backend to validate a new
//! implementation against production without affecting clients.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                     TEEPROXY                      │
//!                         │                                                   │
//!     Client Request      │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!     ────────────────────┼─▶│  http   │──▶│ request  │──▶│  dispatcher  │───┼──▶ Primary
//!                         │  │ server  │   │ splitter │   │  (primary)   │   │
//!                         │  └─────────┘   └────┬─────┘   └──────┬───────┘   │
//!                         │                     │  sampled        │           │
//!                         │                     ▼                 │           │
//!                         │               ┌──────────────┐        │           │
//!                         │               │  dispatcher  │────────┼───────────┼──▶ Shadow
//!                         │               │   (shadow)   │        │           │
//!                         │               └──────┬───────┘        │           │
//!                         │                      ▼                ▼           │
//!     Client Response     │  ┌──────────┐   ┌────────────────────────────┐   │
//!     ◀───────────────────┼──│ response │◀──│    coordinator (race)      │   │
//!                         │  │  writer  │   └─────────────┬──────────────┘   │
//!                         │  └──────────┘                 ▼                  │
//!                         │                        ┌──────────────┐          │
//!                         │                        │  comparator  │ (async)  │
//!                         │                        └──────────────┘          │
//!                         └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use teeproxy::cli::Cli;
use teeproxy::lifecycle::startup;
use teeproxy::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    init_logging(&config.observability.log_level);
    tracing::info!("teeproxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        primary = %config.primary.address,
        shadow = %config.shadow.address,
        percent = config.mirror.percent,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
