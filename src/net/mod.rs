//! Network layer subsystem.
//!
//! Plain listeners are bound directly with Tokio; TLS listeners are served by
//! `axum-server` with the certificate loaded here.

pub mod tls;
