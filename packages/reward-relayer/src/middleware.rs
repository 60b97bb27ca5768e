//! Authentication and request correlation middleware.

use crate::response::ClaimResponse;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info_span, warn, Instrument};

const REQUEST_ID_HEADER: &str = "x-request-id";
/// Longer client-supplied ids are replaced rather than echoed into logs.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Validate `X-Api-Key` or `Authorization: Bearer` against `Config::api_key`.
/// Bypassed when no key is configured (dev mode).
pub async fn api_key_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let expected = match state.config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => key,
        None => return next.run(request).await,
    };

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string());

    match provided {
        Some(ref key)
            if key.len() == expected.len() && key.as_bytes().ct_eq(expected.as_bytes()).into() =>
        {
            next.run(request).await
        }
        _ => {
            warn!(path = %request.uri().path(), "Rejected request without a valid API key");
            let body = ClaimResponse::err("Unauthorized", "invalid or missing API key");
            (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
        }
    }
}

/// Propagate or generate `x-request-id`, and run the rest of the request
/// inside a span carrying it so handler logs correlate without repeating it.
pub async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let span = info_span!(
        "request",
        req_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| debug!(status = response.status().as_u16(), "Request finished"));
    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}

fn generate_request_id() -> String {
    format!("claim-{:016x}", rand::thread_rng().gen::<u64>())
}

/// Request correlation ID, extractable from `Request::extensions()`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);
