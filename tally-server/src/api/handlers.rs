//! Request handlers: public namespace claims, healthcheck, peer protocol.

use crate::api::response;
use crate::api::state::AppState;
use crate::api::validate::validate_public_path;
use crate::coordinator;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tally_core::{ClaimContext, ClaimKind, TallyError};

/// GET `{public_prefix}/*`
///
/// Validates the path, then asks the coordinator for the next number in the
/// namespace. The namespace key always carries the `pub/` prefix, whatever
/// prefix the route is mounted under.
pub async fn public_ns(
    req: &Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    if !state.can_serve {
        return response::status_text(StatusCode::SERVICE_UNAVAILABLE);
    }

    if !host_allowed(req, &state.domains) {
        return response::status_text(StatusCode::NOT_FOUND);
    }

    let path = req.uri().path();
    if let Err(reason) = validate_public_path(path) {
        tracing::debug!(path = %path, reason = %reason, "rejected namespace path");
        return response::status_text(StatusCode::BAD_REQUEST);
    }

    let rest = path[state.public_prefix.len()..].trim_start_matches('/');
    let ns = format!("pub/{rest}");

    match coordinator::next_number(&state, &ns).await {
        Ok(value) => response::number(value),
        Err(TallyError::MaxIncrementRange) => {
            tracing::warn!(namespace = %ns, "probe window exhausted");
            response::status_text(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            tracing::error!(namespace = %ns, error = %e, "claim failed");
            response::status_text(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET `/.healthcheck`
///
/// 200 once the local store is open, 503 before that.
pub fn healthcheck(state: Arc<AppState>) -> Response<Full<Bytes>> {
    if !state.can_serve {
        return response::status_text(StatusCode::SERVICE_UNAVAILABLE);
    }
    response::status_text(StatusCode::OK)
}

/// GET `{base_path}{group}/{key}`, the peer protocol.
///
/// Reconstructs the claim context from the transport headers and runs the
/// owner-side load path. The caller elected this node owner through its own
/// ring, so the answer is served locally without re-forwarding.
pub async fn peer(req: &Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    let rest = &path[state.base_path.len()..];
    let Some((group, key)) = rest.split_once('/') else {
        return response::status_text(StatusCode::NOT_FOUND);
    };
    if group != state.cache.name() || key.is_empty() {
        return response::status_text(StatusCode::NOT_FOUND);
    }

    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    let Some(kind) = ClaimKind::parse(&header(&state.headers.kind)) else {
        return response::status_text(StatusCode::BAD_REQUEST);
    };
    let ctx = ClaimContext::from_parts(
        header(&state.headers.id),
        header(&state.headers.ts),
        kind,
    );

    match state.cache.load_local(&ctx, key).await {
        Ok(body) => response::peer_body(body),
        Err(e) => {
            tracing::error!(key = %key, error = %e, "peer load failed");
            response::status_text(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Host allow-list check. An empty list accepts every host.
fn host_allowed(req: &Request<Incoming>, domains: &[String]) -> bool {
    if domains.is_empty() {
        return true;
    }
    let host = req
        .headers()
        .get(hyper::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    domains.iter().any(|d| d.to_ascii_lowercase() == host)
}
