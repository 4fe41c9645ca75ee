//! Shared-credential check for admin routes.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

/// Header accepted as an alternative to `Authorization: Bearer`.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Middleware for `/api/admin/*`.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(presented) = presented_token(req.headers()) else {
        tracing::warn!("Admin request without credential: {}", req.uri().path());
        return Err(ApiError::unauthorized("missing_admin_token"));
    };
    if !tokens_match(presented, &state.admin_token) {
        tracing::warn!("Admin request with wrong credential: {}", req.uri().path());
        return Err(ApiError::unauthorized("invalid_admin_token"));
    }
    Ok(next.run(req).await)
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer
        .or_else(|| headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Length-revealing but otherwise constant-time comparison.
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
