//! Client address forwarding headers.
//!
//! Extends `Forwarded` (RFC 7239, `for=` parameter) and `X-Forwarded-For`
//! with the caller's address. Existing chains are extended, never replaced.

use axum::http::header::{HeaderName, FORWARDED};
use axum::http::{HeaderMap, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Strip the trailing `:port` from a raw peer address.
///
/// Falls back to the whole value when there is no colon.
pub fn client_ip(remote_addr: &str) -> &str {
    match remote_addr.rfind(':') {
        Some(pos) => &remote_addr[..pos],
        None => {
            tracing::warn!(
                remote_addr = %remote_addr,
                "Peer address is not in ip:port form, forwarding it verbatim"
            );
            remote_addr
        }
    }
}

/// Append the caller derived from `remote_addr` to both forwarding headers.
pub fn append_forwarded_headers(headers: &mut HeaderMap, remote_addr: &str) {
    let ip = client_ip(remote_addr);
    extend_header(headers, FORWARDED, &format!("for={}", ip));
    extend_header(headers, X_FORWARDED_FOR, ip);
}

/// Set `name` to `<existing values>, <element>`, or to `element` when absent.
///
/// Existing values are joined as raw bytes, so opaque elements survive.
fn extend_header(headers: &mut HeaderMap, name: HeaderName, element: &str) {
    let mut value: Vec<u8> = Vec::new();
    for existing in headers.get_all(&name) {
        let existing = existing.as_bytes().trim_ascii();
        if existing.is_empty() {
            continue;
        }
        value.extend_from_slice(existing);
        value.extend_from_slice(b", ");
    }
    value.extend_from_slice(element.as_bytes());

    match HeaderValue::from_bytes(&value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => {
            tracing::warn!(header = %name, error = %e, "Cannot encode forwarding header, left unchanged");
        }
    }
}
