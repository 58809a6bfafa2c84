//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router sending every method and path to the mirror handler
//! - Wire up middleware (tracing, request ID, connection close)
//! - Serve on a plain TCP listener or a TLS listener
//! - Contain panics raised while handling a single request

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::CONNECTION, HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::InboundRequest;
use crate::http::request_id::{assign_request_id, RequestIdExt};
use crate::mirror::MirrorCoordinator;
use crate::observability::metrics;

/// How long in-flight TLS connections may drain after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MirrorCoordinator>,
}

/// HTTP server for the tee proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let state = AppState {
            coordinator: Arc::new(MirrorCoordinator::new(&config)),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/{*path}", any(mirror_handler))
            .route("/", any(mirror_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .request_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
            .layer(middleware::from_fn(assign_request_id));

        if config.mirror.close_connections {
            // Clients are asked to drop the connection after each response.
            router.layer(SetResponseHeaderLayer::overriding(
                CONNECTION,
                HeaderValue::from_static("close"),
            ))
        } else {
            router
        }
    }

    /// Run the server, accepting plain connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        self.log_start(addr, false);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server terminating TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        self.log_start(addr, true);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn log_start(&self, addr: SocketAddr, tls: bool) {
        tracing::info!(
            address = %addr,
            tls,
            primary = %self.config.primary.address,
            shadow = %self.config.shadow.address,
            percent = self.config.mirror.percent,
            "HTTP server starting"
        );
    }
}

/// Main proxy handler: mirrors the request and answers from the primary.
async fn mirror_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let inbound = InboundRequest::new(request, addr);

    let mut mirrored = false;
    let response = catch_panic(async {
        let handled = state.coordinator.handle(inbound).await;
        mirrored = handled.mirrored;
        // Dropping the handle leaves the comparison running detached.
        drop(handled.comparison);
        handled.response
    })
    .await;

    metrics::record_request(&method, response.status().as_u16(), mirrored, start_time);
    response
}

/// Run `handler`, turning a panic into `500 Internal Server Error` for this request only.
pub async fn catch_panic<F>(handler: F) -> Response
where
    F: Future<Output = Response>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(panic = %panic_message(panic.as_ref()), "Request handler panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal proxy error").into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::connect_info::MockConnectInfo;
    use tower::ServiceExt;

    fn unreachable_primary() -> ProxyConfig {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = ProxyConfig::default();
        config.primary.address = addr.to_string();
        config.mirror.percent = 0.0;
        config
    }

    async fn call(config: ProxyConfig, uri: &str) -> Response {
        let app = HttpServer::new(config)
            .router
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn any_path_reaches_mirror_handler() {
        for uri in ["/", "/deep/nested/path?q=1"] {
            let response = call(unreachable_primary(), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[tokio::test]
    async fn close_connections_marks_responses() {
        let mut config = unreachable_primary();
        config.mirror.close_connections = true;
        let response = call(config, "/").await;
        assert_eq!(response.headers()[CONNECTION], "close");
    }

    #[tokio::test]
    async fn keep_alive_by_default() {
        let response = call(unreachable_primary(), "/").await;
        assert!(response.headers().get(CONNECTION).is_none());
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let response = catch_panic(async {
            if true {
                panic!("boom");
            }
            StatusCode::OK.into_response()
        })
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn normal_response_passes_through() {
        let response = catch_panic(async { StatusCode::ACCEPTED.into_response() }).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn panic_payload_messages() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let fixed: Box<dyn Any + Send> = Box::new("fixed");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(fixed.as_ref()), "fixed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
