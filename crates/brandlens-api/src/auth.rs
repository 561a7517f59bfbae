use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{ApiError, AppState};

/// Bearer-token gate for the /v1 routes.
///
/// When `api.auth_token` is configured the presented token must match it
/// exactly; otherwise any non-empty bearer token is accepted.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        return Err(ApiError::Unauthorized("missing bearer token".to_string()));
    };

    if let Some(expected) = state.config.api.auth_token.as_deref() {
        if token != expected {
            return Err(ApiError::Unauthorized("invalid bearer token".to_string()));
        }
    }

    Ok(next.run(request).await)
}
