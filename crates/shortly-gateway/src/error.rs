use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shortly_core::{CacheError, CoreError, ErrorKind};
use shortly_generator::ShortenError;
use shortly_redirector::RedirectError;
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::AlreadyExists | ErrorKind::UniqueConstraintViolation => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        let message = if self.kind == ErrorKind::Internal {
            error!(error = %self.message, "request failed");
            "internal server error".to_string()
        } else {
            self.message
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<RedirectError> for AppError {
    fn from(err: RedirectError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<ShortenError> for AppError {
    fn from(err: ShortenError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}
