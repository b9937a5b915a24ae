use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;
use wheel_shared::{format_wait, ApiError};

use crate::{service::SpinError, store::StoreError};

/// Error returned by route handlers, rendered as a JSON [`ApiError`] body.
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::NotEligible { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        error!("store failure: {e}");
        Self(ApiError::Internal)
    }
}

impl From<SpinError> for AppError {
    fn from(e: SpinError) -> Self {
        match e {
            SpinError::NotEligible {
                next_eligible_at,
                wait,
                ..
            } => Self(ApiError::NotEligible {
                next_eligible_at,
                wait_seconds: wait.num_seconds(),
                wait_display: format_wait(wait),
            }),
            SpinError::InvalidClientSeed(e) => Self(ApiError::Invalid(e.to_string())),
            SpinError::InvalidRequest(msg) => Self(ApiError::Invalid(msg)),
            SpinError::Store(e) => e.into(),
        }
    }
}
