//! HTTP face of [`AppError`]: status code plus a `{"message": ...}` body.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rt_core::error::AppError;
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError(pub AppError);

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError(AppError::Store(err.to_string()))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ApiError {
    /// Text shown to clients. Store details stay in the log.
    pub fn message(&self) -> String {
        match &self.0 {
            AppError::NotFound(kind, _) => format!("{kind} not found"),
            AppError::ValidationError(msg) | AppError::Duplicate(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Store(_) => "Database error".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::ValidationError(_) | AppError::Duplicate(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Store(detail) = &self.0 {
            log::error!("request failed: {detail}");
        }
        let message = self.message();
        HttpResponse::build(self.status_code()).json(ErrorBody { message: &message })
    }
}
