use actix_web::error::{BlockingError, JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::FieldErrors;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{message}")]
    Validation { message: &'static str, details: FieldErrors },
    #[error("{message}: {reason}")]
    Upstream { message: &'static str, reason: String },
    #[error("{message}")]
    Failed { message: &'static str },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_input(details: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Invalid input data",
            details,
        }
    }

    pub fn invalid_query(details: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Invalid query parameters",
            details,
        }
    }

    pub fn not_found(label: &str) -> Self {
        ApiError::NotFound(format!("{label} not found"))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream { .. } | ApiError::Failed { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation { message, details } => json!({ "error": message, "details": details }),
            ApiError::Upstream { message, reason } => json!({ "error": message, "reason": reason }),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

/// Maps actix JSON extractor failures onto the API's error bodies.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            ApiError::PayloadTooLarge("Request body too large".to_owned()).into()
        }
        JsonPayloadError::ContentType => {
            ApiError::BadRequest("Expected an application/json body".to_owned()).into()
        }
        other => {
            tracing::debug!(error = %other, "rejected request body");
            ApiError::BadRequest("Invalid JSON in request body".to_owned()).into()
        }
    }
}

pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let mut details = FieldErrors::default();
    details.push("query", err.to_string());
    ApiError::invalid_query(details).into()
}
