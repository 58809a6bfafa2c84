//! Request duplication.
//!
//! # Responsibilities
//! - Capture the inbound request (method, target, version, headers, peer)
//! - Drain the single-read body once into memory
//! - Produce two independent copies, one per backend
//! - Turn a copy into an outbound request for a given backend
//!
//! # Design Decisions
//! - The body is materialized as `Bytes`; each copy hands out fresh readers over it
//! - Original request preserved for logging; modified copy forwarded
//! - Every outbound copy carries `Connection: close`

use axum::body::{Body, Bytes};
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::http::uri::InvalidUri;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Uri, Version};
use futures_util::StreamExt;
use std::net::SocketAddr;

use crate::upstream::Backend;

/// A request as received from a client, before duplication.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    /// Single-consumption body stream.
    pub body: Body,
    /// Raw peer address, `ip:port`.
    pub remote_addr: String,
    /// `Host` header, or the URI authority for HTTP/2 requests.
    pub host: Option<HeaderValue>,
}

impl InboundRequest {
    pub fn new(request: Request<Body>, remote_addr: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();
        let host = parts.headers.get(HOST).cloned().or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        });

        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr: remote_addr.to_string(),
            host,
        }
    }
}

/// One of the two copies produced by [`split_request`].
#[derive(Debug, Clone)]
pub struct DuplicatedRequest {
    pub method: Method,
    /// Origin-form target (`/path?query`).
    pub path_and_query: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub host: Option<HeaderValue>,
    body: Bytes,
}

impl DuplicatedRequest {
    /// A fresh reader positioned at the start of the body.
    pub fn body_reader(&self) -> Body {
        Body::from(self.body.clone())
    }

    /// Build the outbound request addressed to `backend`.
    pub fn into_outbound(self, backend: &Backend) -> Result<Request<Body>, InvalidUri> {
        let uri = backend.target_uri(&self.path_and_query)?;
        let body = self.body_reader();

        let mut headers = self.headers;
        let host = if backend.rewrite_host {
            HeaderValue::from_str(&backend.address).ok()
        } else {
            self.host
        };
        if let Some(host) = host {
            headers.insert(HOST, host);
        }
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        // The outbound client only speaks HTTP/1.
        *request.version_mut() = match self.version {
            Version::HTTP_09 | Version::HTTP_10 => self.version,
            _ => Version::HTTP_11,
        };
        *request.headers_mut() = headers;
        Ok(request)
    }
}

/// Drain `inbound`'s body once and return `(primary, shadow)` copies of the request.
///
/// A read error stops the copy; both sides then carry the same partial body
/// and a `Content-Length` that matches it.
pub async fn split_request(inbound: InboundRequest) -> (DuplicatedRequest, DuplicatedRequest) {
    let InboundRequest {
        method,
        uri,
        version,
        mut headers,
        body,
        host,
        ..
    } = inbound;

    let mut copied = Vec::new();
    let mut truncated = false;
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => copied.extend_from_slice(&bytes),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    copied = copied.len(),
                    "Request body read failed, duplicating partial body"
                );
                truncated = true;
                break;
            }
        }
    }
    drop(stream);

    if truncated {
        headers.remove(TRANSFER_ENCODING);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(copied.len()));
    }

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let body = Bytes::from(copied);

    let primary = DuplicatedRequest {
        method,
        path_and_query,
        version,
        headers,
        host,
        body,
    };
    let shadow = primary.clone();
    (primary, shadow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::upstream::BackendRole;
    use futures_util::stream;

    fn inbound(body: Body) -> InboundRequest {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/orders?id=42")
            .header(HOST, "shop.example.com")
            .header("x-custom", "a")
            .header("x-custom", "b")
            .body(body)
            .unwrap();
        InboundRequest::new(request, "203.0.113.5:54321".parse().unwrap())
    }

    async fn read(body: Body) -> Bytes {
        axum::body::to_bytes(body, usize::MAX).await.unwrap()
    }

    fn backend(rewrite_host: bool) -> Backend {
        Backend::new(
            BackendRole::Primary,
            &BackendConfig {
                address: "127.0.0.1:8080".into(),
                timeout_ms: 100,
                rewrite_host,
            },
        )
    }

    #[tokio::test]
    async fn copies_are_byte_exact_and_independent() {
        let chunks = vec!["hello ", "mirrored ", "world"];
        let body = Body::from_stream(stream::iter(
            chunks.into_iter().map(Ok::<_, std::io::Error>),
        ));
        let (primary, shadow) = split_request(inbound(body)).await;

        assert_eq!(read(primary.body_reader()).await, "hello mirrored world");
        // Reading one copy leaves the other untouched, and readers restart.
        assert_eq!(read(shadow.body_reader()).await, "hello mirrored world");
        assert_eq!(read(primary.body_reader()).await, "hello mirrored world");
    }

    #[tokio::test]
    async fn empty_body_gives_two_empty_copies() {
        let (primary, shadow) = split_request(inbound(Body::empty())).await;
        assert!(read(primary.body_reader()).await.is_empty());
        assert!(read(shadow.body_reader()).await.is_empty());
        assert!(primary.headers.get(CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn read_error_keeps_consistent_prefix() {
        let body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"never")),
        ]));
        let (primary, shadow) = split_request(inbound(body)).await;

        assert_eq!(read(primary.body_reader()).await, "partial");
        assert_eq!(read(shadow.body_reader()).await, "partial");
        assert_eq!(primary.headers[CONTENT_LENGTH], "7");
    }

    #[tokio::test]
    async fn copies_keep_request_fields() {
        let (primary, _) = split_request(inbound(Body::from("x"))).await;
        assert_eq!(primary.method, Method::POST);
        assert_eq!(primary.path_and_query, "/orders?id=42");
        let custom: Vec<_> = primary.headers.get_all("x-custom").iter().collect();
        assert_eq!(custom, vec!["a", "b"]);
        assert_eq!(primary.host.as_ref().unwrap(), "shop.example.com");
    }

    #[tokio::test]
    async fn outbound_targets_backend_and_closes() {
        let (primary, _) = split_request(inbound(Body::from("payload"))).await;
        let request = primary.into_outbound(&backend(false)).unwrap();

        assert_eq!(request.uri().to_string(), "http://127.0.0.1:8080/orders?id=42");
        assert_eq!(request.headers()[HOST], "shop.example.com");
        assert_eq!(request.headers()[CONNECTION], "close");
        assert_eq!(read(request.into_body()).await, "payload");
    }

    #[tokio::test]
    async fn outbound_rewrites_host_when_enabled() {
        let (primary, _) = split_request(inbound(Body::empty())).await;
        let request = primary.into_outbound(&backend(true)).unwrap();
        assert_eq!(request.headers()[HOST], "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn http2_is_forwarded_as_http11() {
        let request = Request::builder()
            .version(Version::HTTP_2)
            .uri("https://shop.example.com/cart")
            .body(Body::empty())
            .unwrap();
        let inbound = InboundRequest::new(request, "10.0.0.1:1".parse().unwrap());
        assert_eq!(inbound.host.as_ref().unwrap(), "shop.example.com");

        let (primary, _) = split_request(inbound).await;
        let outbound = primary.into_outbound(&backend(false)).unwrap();
        assert_eq!(outbound.version(), Version::HTTP_11);
        assert_eq!(outbound.uri().path(), "/cart");
        assert_eq!(outbound.headers()[HOST], "shop.example.com");
    }
}
