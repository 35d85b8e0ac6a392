//! Path-based request routing.

use crate::api::{handlers, response};
use crate::api::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

/// Route an incoming request to the appropriate handler.
pub async fn route(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    tracing::debug!(method = %req.method(), path = %path, "routing request");

    if req.method() != Method::GET {
        return Ok(response::status_text(StatusCode::METHOD_NOT_ALLOWED));
    }

    let response = if path == state.healthcheck_path {
        handlers::healthcheck(state)
    } else if path.starts_with(&state.base_path) {
        handlers::peer(&req, state).await
    } else if path == state.public_prefix
        || path.starts_with(&format!("{}/", state.public_prefix))
    {
        handlers::public_ns(&req, state).await
    } else {
        response::status_text(StatusCode::NOT_FOUND)
    };

    Ok(response)
}
