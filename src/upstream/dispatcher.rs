//! Backend dispatch.
//!
//! # Responsibilities
//! - Perform exactly one HTTP round trip per outbound request
//! - Bound connect and response-header receipt by the backend timeout
//! - Convert every failure into a [`DispatchError`] value
//! - Run dispatches as independent tasks with a single-use completion channel
//!
//! # Design Decisions
//! - Plain hyper client: no redirect following, no cookie jar
//! - One client per backend; clients share only immutable transport settings
//! - Timed-out calls are not cancelled beyond dropping the in-flight future

use axum::body::Body;
use axum::http::uri::InvalidUri;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::http::request::DuplicatedRequest;
use crate::observability::metrics;
use crate::upstream::backend::Backend;

/// Why a dispatch produced no response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no response headers within {0:?}")]
    Timeout(std::time::Duration),

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("invalid upstream target: {0}")]
    InvalidTarget(#[from] InvalidUri),

    #[error("dispatch task ended without a result")]
    Canceled,
}

impl DispatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout(_))
    }

    fn label(&self) -> &'static str {
        match self {
            DispatchError::Timeout(_) => "timeout",
            DispatchError::Transport(_) => "transport_error",
            DispatchError::InvalidTarget(_) => "invalid_target",
            DispatchError::Canceled => "canceled",
        }
    }
}

/// Outcome of one round trip. Produced at most once per dispatched request.
pub type DispatchResult = Result<Response<Body>, DispatchError>;

/// Single-use completion signal for an asynchronous dispatch.
pub type PendingDispatch = oneshot::Receiver<DispatchResult>;

/// Issues requests to one backend.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    backend: Backend,
    client: Client<HttpConnector, Body>,
}

impl Dispatcher {
    /// Create a dispatcher for `backend`. With `close_connections` no idle
    /// upstream connection is kept for reuse.
    pub fn new(backend: Backend, close_connections: bool) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(backend.timeout));
        connector.set_keepalive(Some(backend.timeout * 10));
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        if close_connections {
            builder.pool_max_idle_per_host(0);
        }
        let client = builder.build(connector);

        Self { backend, client }
    }

    /// Address `request` to this backend and perform the round trip.
    pub async fn dispatch(&self, request: DuplicatedRequest) -> DispatchResult {
        let start = Instant::now();
        let result = self.round_trip(request).await;

        match &result {
            Ok(response) => {
                tracing::debug!(
                    backend = %self.backend.role,
                    address = %self.backend.address,
                    status = %response.status(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                metrics::record_dispatch(self.backend.role, "ok", start);
            }
            Err(e) => {
                tracing::warn!(
                    backend = %self.backend.role,
                    address = %self.backend.address,
                    error = %e,
                    "Request failed"
                );
                metrics::record_dispatch(self.backend.role, e.label(), start);
            }
        }
        result
    }

    async fn round_trip(&self, request: DuplicatedRequest) -> DispatchResult {
        let request: Request<Body> = request.into_outbound(&self.backend)?;
        let timeout = self.backend.timeout;

        match tokio::time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response.map(Body::new)),
            Ok(Err(e)) => Err(DispatchError::Transport(e)),
            Err(_) => Err(DispatchError::Timeout(timeout)),
        }
    }

    /// Start the round trip on its own task and return its completion signal.
    pub fn dispatch_async(self: &Arc<Self>, request: DuplicatedRequest) -> PendingDispatch {
        let (tx, rx) = oneshot::channel();
        let dispatcher = Arc::clone(self);
        tokio::spawn(
            async move {
                let result = dispatcher.dispatch(request).await;
                // Receiver gone means nobody waits for this side any more.
                let _ = tx.send(result);
            }
            .in_current_span(),
        );
        rx
    }
}

/// Resolve a completion signal into its result; a dropped sender reads as [`DispatchError::Canceled`].
pub async fn settle(pending: PendingDispatch) -> DispatchResult {
    pending.await.unwrap_or(Err(DispatchError::Canceled))
}
