//! Per-request mirroring pipeline.
//!
//! # States
//! ```text
//! AwaitingSamplingDecision ─┬─▶ NotMirrored: dispatch primary, await it, respond
//!                           └─▶ Mirrored:    dispatch both, race completions
//!
//! Mirrored, primary first:  respond from primary, then await shadow and compare
//! Mirrored, shadow first:   wait for primary, respond, compare with held shadow
//! ```
//!
//! The client only ever sees the primary result. Comparison runs on its own
//! task and never delays the response.

use axum::body::{Body, Bytes};
use axum::http::Response;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::forwarded::append_forwarded_headers;
use crate::http::request::{split_request, InboundRequest};
use crate::http::response::write_primary;
use crate::mirror::comparator::{compare_responses, Comparison};
use crate::mirror::sampling::Sampler;
use crate::upstream::{settle, Backend, BackendRole, DispatchError, DispatchResult, Dispatcher};

/// Result of handling one inbound request.
#[derive(Debug)]
pub struct Handled {
    /// The response for the client, written exactly once by the caller.
    pub response: Response<Body>,
    /// Whether a copy went to the shadow backend.
    pub mirrored: bool,
    /// Background comparison, present when both a primary body and a shadow dispatch exist.
    /// Dropping the handle detaches the task.
    pub comparison: Option<JoinHandle<Option<Comparison>>>,
}

/// Which completion signal fired first.
enum FirstCompletion {
    Primary(DispatchResult),
    Shadow(DispatchResult),
}

/// Splits, dispatches and reconciles requests according to the mirror policy.
#[derive(Debug, Clone)]
pub struct MirrorCoordinator {
    primary: Arc<Dispatcher>,
    shadow: Arc<Dispatcher>,
    sampler: Sampler,
    forward_client_ip: bool,
}

impl MirrorCoordinator {
    pub fn new(config: &ProxyConfig) -> Self {
        let close = config.mirror.close_connections;
        Self {
            primary: Arc::new(Dispatcher::new(Backend::new(BackendRole::Primary, &config.primary), close)),
            shadow: Arc::new(Dispatcher::new(Backend::new(BackendRole::Shadow, &config.shadow), close)),
            sampler: Sampler::new(config.mirror.percent),
            forward_client_ip: config.mirror.forward_client_ip,
        }
    }

    pub async fn handle(&self, inbound: InboundRequest) -> Handled {
        let remote_addr = inbound.remote_addr.clone();
        let (mut primary, shadow) = split_request(inbound).await;

        if self.forward_client_ip {
            append_forwarded_headers(&mut primary.headers, &remote_addr);
        }

        if !self.sampler.should_mirror() {
            tracing::trace!("Request not sampled for mirroring");
            let (response, _) = write_primary(self.primary.dispatch(primary).await).await;
            return Handled {
                response,
                mirrored: false,
                comparison: None,
            };
        }

        let mut primary_rx = self.primary.dispatch_async(primary);
        let mut shadow_rx = self.shadow.dispatch_async(shadow);

        let first = tokio::select! {
            result = &mut primary_rx => FirstCompletion::Primary(result.unwrap_or(Err(DispatchError::Canceled))),
            result = &mut shadow_rx => FirstCompletion::Shadow(result.unwrap_or(Err(DispatchError::Canceled))),
        };

        let (response, comparison) = match first {
            FirstCompletion::Primary(primary) => {
                tracing::trace!("Primary completed first");
                let (response, body) = write_primary(primary).await;
                let comparison = body.map(|body| spawn_comparison(body, settle(shadow_rx)));
                (response, comparison)
            }
            FirstCompletion::Shadow(shadow) => {
                tracing::trace!("Shadow completed first, waiting for primary");
                let (response, body) = write_primary(settle(primary_rx).await).await;
                let comparison = body.map(|body| spawn_comparison(body, async move { shadow }));
                (response, comparison)
            }
        };

        Handled {
            response,
            mirrored: true,
            comparison,
        }
    }
}

fn spawn_comparison<F>(primary_body: Bytes, shadow: F) -> JoinHandle<Option<Comparison>>
where
    F: Future<Output = DispatchResult> + Send + 'static,
{
    tokio::spawn(
        async move { compare_responses(primary_body, shadow.await).await }.in_current_span(),
    )
}
