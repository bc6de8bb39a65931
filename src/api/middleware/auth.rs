//! Bearer token authentication middleware

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;

/// Rejects requests without `Authorization: Bearer <token>`
///
/// A missing or malformed header is 401, a wrong token 403.
pub async fn auth_middleware(
    State(expected_token): State<String>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("invalid Authorization format (expected: Bearer <token>)".to_string())
    })?;

    if token != expected_token {
        return Err(ApiError::Forbidden("invalid token".to_string()));
    }

    Ok(next.run(request).await)
}
