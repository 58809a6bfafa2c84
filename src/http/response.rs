//! Response handling.
//!
//! # Responsibilities
//! - Copy a backend response (status, headers, body) into the client response
//! - Hand back the exact body bytes sent to the client for comparison
//! - Map a missing primary response to a gateway error status
//!
//! # Design Decisions
//! - The body is buffered once; the client and the comparator share those bytes
//! - Backend timeouts result in 504 Gateway Timeout, other failures in 502

use axum::body::{Body, Bytes};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::upstream::{DispatchError, DispatchResult};

/// Why a backend response body could not be buffered.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("upstream body unreadable: {0}")]
    Read(#[from] axum::Error),
}

/// Buffer a backend response body in full.
pub async fn read_body(body: Body) -> Result<Bytes, BodyError> {
    Ok(axum::body::to_bytes(body, usize::MAX).await?)
}

/// A client response produced from a backend response.
#[derive(Debug)]
pub struct WrittenResponse {
    pub response: Response<Body>,
    /// Bytes placed in the client body, identical to `response`'s body.
    pub body: Bytes,
}

/// Copy `response` into a client-facing response, buffering its body.
///
/// Returns `Ok(None)` when `response` is absent and [`BodyError`] when its
/// body cannot be read in full.
pub async fn write_response(
    response: Option<Response<Body>>,
) -> Result<Option<WrittenResponse>, BodyError> {
    let Some(response) = response else {
        return Ok(None);
    };
    let (parts, body) = response.into_parts();
    let body = read_body(body).await?;

    let mut client = Response::new(Body::from(body.clone()));
    *client.status_mut() = parts.status;
    *client.headers_mut() = parts.headers;

    Ok(Some(WrittenResponse { response: client, body }))
}

/// Response sent when the primary backend produced nothing usable.
pub fn gateway_error(error: Option<&DispatchError>) -> Response<Body> {
    match error {
        Some(e) if e.is_timeout() => {
            (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
        }
        _ => (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response(),
    }
}

/// Write the primary result, falling back to [`gateway_error`].
///
/// The returned body is `None` whenever the client did not get the primary's bytes.
pub async fn write_primary(result: DispatchResult) -> (Response<Body>, Option<Bytes>) {
    match result {
        Ok(response) => match write_response(Some(response)).await {
            Ok(Some(written)) => (written.response, Some(written.body)),
            Ok(None) => (gateway_error(None), None),
            Err(e) => {
                tracing::warn!(error = %e, "Primary response dropped");
                (gateway_error(None), None)
            }
        },
        Err(e) => (gateway_error(Some(&e)), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use futures_util::stream;

    #[tokio::test]
    async fn copies_status_headers_and_body() {
        let upstream = Response::builder()
            .status(StatusCode::CREATED)
            .header(CONTENT_TYPE, "application/json")
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .body(Body::from(r#"{"id":1}"#))
            .unwrap();

        let written = write_response(Some(upstream)).await.unwrap().unwrap();
        assert_eq!(written.body, r#"{"id":1}"#);
        assert_eq!(written.response.status(), StatusCode::CREATED);
        assert_eq!(written.response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(written.response.headers().get_all("set-cookie").iter().count(), 2);

        let sent = axum::body::to_bytes(written.response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(sent, written.body);
    }

    #[tokio::test]
    async fn absent_response_writes_nothing() {
        assert!(write_response(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn broken_body_reports_read_error() {
        let body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"half")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]));
        let err = write_response(Some(Response::new(body))).await.unwrap_err();
        assert!(matches!(err, BodyError::Read(_)));
        assert!(err.to_string().starts_with("upstream body unreadable"));
    }

    #[tokio::test]
    async fn broken_body_is_treated_as_absent() {
        let body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"half")),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof")),
        ]));
        let (response, bytes) = write_primary(Ok(Response::new(body))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(bytes.is_none());
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let err = DispatchError::Timeout(std::time::Duration::from_millis(5));
        let (response, bytes) = write_primary(Err(err)).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(bytes.is_none());
    }

    #[tokio::test]
    async fn other_failures_map_to_502() {
        let (response, _) = write_primary(Err(DispatchError::Canceled)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
