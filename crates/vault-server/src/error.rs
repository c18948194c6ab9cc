//! API errors, rendered as `{ "message": ... }` with a matching status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use vault_core::{DriveError, ServiceError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<DriveError> for ApiError {
    fn from(e: DriveError) -> Self {
        ApiError::Service(e.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Service(e.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Service(e) => service_status(e),
        }
    }
}

fn service_status(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::VaultNotFound(_) | ServiceError::FileNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Store(StoreError::VaultNotFound(_)) => StatusCode::NOT_FOUND,
        ServiceError::Store(StoreError::PathTaken { .. }) => StatusCode::CONFLICT,
        ServiceError::Store(_) => StatusCode::BAD_REQUEST,
        ServiceError::Drive(DriveError::NotFound(_)) => StatusCode::NOT_FOUND,
        ServiceError::Drive(DriveError::Decode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Drive(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Tree(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
