//! Plain-text response builders.
//!
//! The public API speaks ASCII: a claimed number in the body on success, the
//! canonical status text otherwise.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// Build a plain-text response.
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(body.into()))
        .expect("response builder should not fail")
}

/// 200 with the claimed number as its ASCII decimal representation.
pub fn number(value: u64) -> Response<Full<Bytes>> {
    text(StatusCode::OK, value.to_string())
}

/// A response carrying the canonical reason phrase for a status.
pub fn status_text(status: StatusCode) -> Response<Full<Bytes>> {
    text(status, status.canonical_reason().unwrap_or_default())
}

/// The claim response JSON for the peer protocol.
pub fn peer_body(body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("response builder should not fail")
}
