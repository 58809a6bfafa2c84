//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handler, dispatcher, comparator produce:
//!     → logging.rs (structured log events, one span per request)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the handler span into dispatch and comparison tasks
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
