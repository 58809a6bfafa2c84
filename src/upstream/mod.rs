//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! DuplicatedRequest
//!     → backend.rs (target URI, host rewrite policy, timeout)
//!     → dispatcher.rs (single round trip on its own task)
//!     → oneshot completion signal carrying a DispatchResult
//! ```

pub mod backend;
pub mod dispatcher;

pub use backend::{Backend, BackendRole};
pub use dispatcher::{settle, DispatchError, DispatchResult, Dispatcher, PendingDispatch};
