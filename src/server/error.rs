//! Error types for the server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{InferenceErrorKind, RiskError, ValidationErrorKind};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("Malformed request body: {message}")]
    MalformedBody { status: StatusCode, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        ServerError::MalformedBody {
            status,
            message: rejection.body_text(),
        }
    }
}

/// JSON error body shared by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error category
    pub error_kind: String,
    /// Fine-grained reason within the category
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorBody {
    pub fn new(error_kind: &str, kind: &str, message: impl Into<String>) -> Self {
        Self {
            error_kind: error_kind.to_string(),
            kind: kind.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

fn risk_status(err: &RiskError) -> StatusCode {
    match err {
        RiskError::Validation(v) if v.kind == ValidationErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
        RiskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RiskError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RiskError::Inference { kind: InferenceErrorKind::Timeout, .. } => StatusCode::GATEWAY_TIMEOUT,
        RiskError::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Risk(err) => {
                let status = risk_status(err);
                let message = match err {
                    RiskError::Validation(v) => v.message.clone(),
                    RiskError::ModelUnavailable { message, .. } | RiskError::Inference { message, .. } => {
                        message.clone()
                    }
                    other => {
                        tracing::error!(detail = %other, "Internal server error");
                        "An internal error occurred".to_string()
                    }
                };
                let mut body = ErrorBody::new(err.error_kind(), err.detail_kind(), message);
                if let RiskError::Validation(v) = err {
                    body.field = v.field.clone();
                }
                (status, body)
            }
            ServerError::MalformedBody { status, message } => (
                *status,
                ErrorBody::new("validation_error", "malformed_request", message.clone()),
            ),
            ServerError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new("not_found", "not_found", format!("No route for {}", path)),
            ),
            ServerError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody::new(
                    "method_not_allowed",
                    "method_not_allowed",
                    "Method not allowed. See / for the available endpoints.",
                ),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
