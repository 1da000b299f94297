use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use quill_types::api::{ErrorDetail, FieldErrors};

/// Every way a request can fail. Each variant maps to exactly one status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Validation failure on a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(fields) => (StatusCode::BAD_REQUEST, Json(fields)).into_response(),
            ApiError::BadRequest(detail) => detail_response(StatusCode::BAD_REQUEST, detail),
            ApiError::Unauthorized(reason) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Token")],
                Json(ErrorDetail {
                    detail: reason.to_string(),
                }),
            )
                .into_response(),
            ApiError::NotFound => detail_response(StatusCode::NOT_FOUND, "Not found."),
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                detail_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

fn detail_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
        .into_response()
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` that reports undecodable bodies as a plain 400 `{detail}`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
