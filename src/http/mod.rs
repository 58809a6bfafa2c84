//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, catch-all route, panic boundary)
//!     → request_id.rs (correlation id for logs)
//!     → request.rs (capture inbound request, duplicate body)
//!     → forwarded.rs (client address headers on the primary copy)
//!     → [mirror coordinator dispatches and races]
//!     → response.rs (copy primary response, keep body bytes)
//!     → Send to client
//! ```

pub mod forwarded;
pub mod request;
pub mod request_id;
pub mod response;
pub mod server;

pub use request::{split_request, DuplicatedRequest, InboundRequest};
pub use response::BodyError;
pub use request_id::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
