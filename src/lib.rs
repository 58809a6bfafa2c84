//! HTTP traffic-mirroring ("tee") proxy library.
//!
//! Every inbound request is answered from the primary backend; a sampled copy
//! goes to the shadow backend and the two response bodies are compared in the
//! background.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mirror;
pub mod net;
pub mod observability;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mirror::MirrorCoordinator;
