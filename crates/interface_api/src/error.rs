//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_billing::BillingError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String, Vec<String>),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    /// Status code and machine-readable error type
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Validation(..) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::Billing(e) => {
                let status = match e {
                    BillingError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                    BillingError::InvalidState(_) | BillingError::ConcurrentModification(_) => {
                        StatusCode::CONFLICT
                    }
                    BillingError::InvalidAmount(_) | BillingError::Validation(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
                    BillingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        let (message, details) = match self {
            ApiError::Validation(msg, details) => (msg, Some(details)),
            ApiError::Billing(BillingError::Storage(source)) => {
                error!(error = %source, "Storage failure");
                ("storage failure".to_string(), None)
            }
            ApiError::Billing(e) => (e.to_string(), None),
            ApiError::NotFound(msg) => (msg, None),
            ApiError::Unauthorized => ("Unauthorized".to_string(), None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| format!("{}: {}", field, e.code))
            })
            .collect();
        ApiError::Validation(errors.to_string(), details)
    }
}
