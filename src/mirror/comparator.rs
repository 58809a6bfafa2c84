//! Best-effort body comparison between primary and shadow responses.
//!
//! Bodies that both parse as JSON are compared as documents, so key order
//! does not matter and numbers compare by value (`1` equals `1.0`). Anything
//! else falls back to byte equality. Headers and status codes are ignored.

use axum::body::Bytes;
use serde_json::Value;

use crate::http::response::read_body;
use crate::observability::metrics;
use crate::upstream::DispatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Equal => "equal",
            Comparison::NotEqual => "not_equal",
        }
    }
}

pub fn compare_bodies(primary: &[u8], shadow: &[u8]) -> Comparison {
    let equal = match (
        serde_json::from_slice::<Value>(primary),
        serde_json::from_slice::<Value>(shadow),
    ) {
        (Ok(primary), Ok(shadow)) => same_document(&primary, &shadow),
        _ => primary == shadow,
    };

    if equal {
        Comparison::Equal
    } else {
        Comparison::NotEqual
    }
}

/// Structural equality with numbers compared as `f64`.
fn same_document(primary: &Value, shadow: &Value) -> bool {
    match (primary, shadow) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_document(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).is_some_and(|b| same_document(a, b)))
        }
        _ => primary == shadow,
    }
}

/// Compare the body the client received with the shadow's response.
///
/// Returns `None` (indeterminate) when the shadow produced no readable response.
pub async fn compare_responses(primary_body: Bytes, shadow: DispatchResult) -> Option<Comparison> {
    let shadow = match shadow {
        Ok(response) => response,
        Err(e) => {
            tracing::info!(error = %e, "Comparison skipped, shadow response missing");
            metrics::record_comparison("indeterminate");
            return None;
        }
    };

    let status = shadow.status();
    let shadow_body = match read_body(shadow.into_body()).await {
        Ok(body) => body,
        Err(e) => {
            tracing::info!(error = %e, "Comparison skipped, shadow body unreadable");
            metrics::record_comparison("indeterminate");
            return None;
        }
    };

    let outcome = compare_bodies(&primary_body, &shadow_body);
    match outcome {
        Comparison::Equal => tracing::info!(shadow_status = %status, "Equal"),
        Comparison::NotEqual => tracing::info!(
            shadow_status = %status,
            primary_len = primary_body.len(),
            shadow_len = shadow_body.len(),
            "Not equal"
        ),
    }
    metrics::record_comparison(outcome.as_str());
    Some(outcome)
}
