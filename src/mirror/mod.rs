//! Traffic mirroring subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → http::request (split body into two copies)
//!     → http::forwarded (optional, primary copy only)
//!     → sampling.rs (mirror this request?)
//!     → upstream::dispatcher (primary, and shadow when sampled)
//!     → coordinator.rs (race completions, respond from primary)
//!     → http::response (client response + body bytes)
//!     → comparator.rs (background, primary bytes vs shadow body)
//! ```
//!
//! # Design Decisions
//! - Shadow results never reach the client
//! - No retries: one attempt per backend per request
//! - Comparison is fire-and-forget and is lost on shutdown

pub mod comparator;
pub mod coordinator;
pub mod sampling;

pub use comparator::{compare_bodies, Comparison};
pub use coordinator::{Handled, MirrorCoordinator};
pub use sampling::Sampler;
