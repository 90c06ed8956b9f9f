//! HTTP-facing error type.
//!
//! Every error leaves the service as
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Ad not found", "details": { "ad_id": "x" } } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::application::ingestion::ClickError;
use crate::domain::repositories::StoreError;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    ServiceUnavailable { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message, details) = match self {
            AppError::Validation { message, details } => ("validation_error", message, details),
            AppError::NotFound { message, details } => ("not_found", message, details),
            AppError::ServiceUnavailable { message, details } => {
                ("service_unavailable", message, details)
            }
            AppError::Internal { message, details } => ("internal_error", message, details),
        };

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ClickError> for AppError {
    fn from(err: ClickError) -> Self {
        match err {
            ClickError::NotFound(ad_id) => {
                AppError::not_found("Ad not found", json!({ "ad_id": ad_id }))
            }
            ClickError::Decode(e) => {
                AppError::bad_request("Invalid click payload", json!({ "reason": e.to_string() }))
            }
            ClickError::CircuitOpen
            | ClickError::TransientStoreFailure(_)
            | ClickError::TransportUnavailable(_)
            | ClickError::BufferFull { .. } => {
                tracing::error!(error = %err, "Click could not be processed");
                AppError::unavailable(
                    "Click could not be processed, try again later",
                    json!({ "reason": err.kind() }),
                )
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AdNotFound(ad_id) => {
                AppError::not_found("Ad not found", json!({ "ad_id": ad_id }))
            }
            StoreError::Database(ref e) => {
                tracing::error!(error = %e, "Database error");
                AppError::internal("Database error", json!({}))
            }
            StoreError::Unavailable(reason) => {
                AppError::unavailable("Storage unavailable", json!({ "reason": reason }))
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: serde_json::Map<String, Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect();

        AppError::bad_request("Validation failed", json!({ "fields": fields }))
    }
}
