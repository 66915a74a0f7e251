use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::AppError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

// CORS preflight. Answered for any path and never counted against the client.
pub fn preflight(state: &AppState) -> Response {
    let allow_headers = if state.require_auth {
        "Content-Type, Authorization, X-API-Key"
    } else {
        "Content-Type"
    };

    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS")),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(allow_headers)),
        ],
    )
        .into_response()
}

// Runs ahead of every route: preflight, then the per-client rate limit, then
// the token check for /play when auth is enforced.
pub async fn admission_gate(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight(&state);
    }

    let client = addr.ip().to_string();

    if let Err(rejection) = state.rate_limiter.admit(&client) {
        return AppError::from(rejection).into_response();
    }

    if state.require_auth && request.uri().path() == "/play" {
        let authorized = presented_token(request.headers())
            .map(|token| state.tokens.validate(token))
            .unwrap_or(false);

        if !authorized {
            tracing::warn!(client = %client, "rejected request without a valid token");
            return AppError::Unauthorized.into_response();
        }
    }

    next.run(request).await
}

// `Authorization: Bearer <token>` or `X-API-Key: <token>`
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim());
        }
    }

    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}
