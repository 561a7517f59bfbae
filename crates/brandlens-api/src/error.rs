use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brandlens_core::BrandLensError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("BrandLens error: {0}")]
    BrandLens(#[from] BrandLensError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BrandLens(ref err) => match err {
                BrandLensError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
                BrandLensError::InvalidOperation(_) | BrandLensError::Config(_) => {
                    (StatusCode::BAD_REQUEST, self.to_string())
                }
                BrandLensError::UsageLimit { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, self.to_string())
                }
                BrandLensError::AllProvidersFailed(_) => {
                    (StatusCode::BAD_GATEWAY, self.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            },
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_of(ApiError::BrandLens(BrandLensError::UsageLimit {
                used: 5,
                limit: 5
            })),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(ApiError::BrandLens(BrandLensError::NotFound(
                "analysis".into()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::BrandLens(BrandLensError::InvalidOperation(
                "bad".into()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::BrandLens(BrandLensError::AllProvidersFailed(
                "down".into()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::BrandLens(BrandLensError::Database("io".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Unauthorized("no token".into())),
            StatusCode::UNAUTHORIZED
        );
    }
}
