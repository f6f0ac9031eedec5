//! Error types for the diabetes risk serving core

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for serving operations
pub type Result<T> = std::result::Result<T, RiskError>;

/// Why an inbound request was rejected by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// One of the eight required fields is absent
    MissingField,
    /// Value is not numeric, or not integral for an integer field
    TypeMismatch,
    /// Value violates the field's domain bound
    OutOfRange,
    /// A key outside the eight known fields was supplied
    UnknownField,
    /// The body is not a JSON object
    MalformedRequest,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::TypeMismatch => "type_mismatch",
            Self::OutOfRange => "out_of_range",
            Self::UnknownField => "unknown_field",
            Self::MalformedRequest => "malformed_request",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failure carrying the offending field
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub field: Option<String>,
    pub value: Option<f64>,
    pub message: String,
}

impl ValidationError {
    pub fn missing(field: &str) -> Self {
        Self {
            kind: ValidationErrorKind::MissingField,
            field: Some(field.to_string()),
            value: None,
            message: format!("field '{}' is required", field),
        }
    }

    pub fn type_mismatch(field: &str, expected: &str) -> Self {
        Self {
            kind: ValidationErrorKind::TypeMismatch,
            field: Some(field.to_string()),
            value: None,
            message: format!("field '{}' must be {}", field, expected),
        }
    }

    pub fn out_of_range(field: &str, value: f64, bound: &str) -> Self {
        Self {
            kind: ValidationErrorKind::OutOfRange,
            field: Some(field.to_string()),
            value: Some(value),
            message: format!("field '{}' must be {}, got {}", field, bound, value),
        }
    }

    pub fn unknown(field: &str) -> Self {
        Self {
            kind: ValidationErrorKind::UnknownField,
            field: Some(field.to_string()),
            value: None,
            message: format!("field '{}' is not part of the patient schema", field),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::MalformedRequest,
            field: None,
            value: None,
            message: message.into(),
        }
    }
}

/// Why no usable model could be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelUnavailableKind {
    /// Nothing has been loaded into the model slot yet
    NotLoaded,
    /// Registry has no artifact for the requested name/stage
    NotFound,
    /// Registry storage could not be read
    RegistryUnreachable,
    /// Artifact bytes could not be decoded
    FormatMismatch,
    /// Artifact feature order differs from the serving schema
    SchemaMismatch,
}

impl ModelUnavailableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::NotFound => "not_found",
            Self::RegistryUnreachable => "registry_unreachable",
            Self::FormatMismatch => "format_mismatch",
            Self::SchemaMismatch => "schema_mismatch",
        }
    }
}

impl fmt::Display for ModelUnavailableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a scoring call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceErrorKind {
    ShapeMismatch,
    ComputationFailure,
    Timeout,
}

impl InferenceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShapeMismatch => "shape_mismatch",
            Self::ComputationFailure => "computation_failure",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for InferenceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a model registry backend
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Model '{name}' has no artifact for stage '{stage}'")]
    NotFound { name: String, stage: String },

    #[error("Registry unreachable: {0}")]
    Unreachable(String),

    #[error("Registry index corrupt: {0}")]
    Corrupt(String),

    #[error("Invalid registry operation: {0}")]
    InvalidOperation(String),
}

/// Main error type for the serving core
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model unavailable ({kind}): {message}")]
    ModelUnavailable {
        kind: ModelUnavailableKind,
        message: String,
    },

    #[error("Inference error ({kind}): {message}")]
    Inference {
        kind: InferenceErrorKind,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RiskError {
    pub fn model_unavailable(kind: ModelUnavailableKind, message: impl Into<String>) -> Self {
        RiskError::ModelUnavailable {
            kind,
            message: message.into(),
        }
    }

    pub fn inference(kind: InferenceErrorKind, message: impl Into<String>) -> Self {
        RiskError::Inference {
            kind,
            message: message.into(),
        }
    }

    /// Top-level error category reported to clients and metrics
    pub fn error_kind(&self) -> &'static str {
        match self {
            RiskError::Validation(_) => "validation_error",
            RiskError::ModelUnavailable { .. } => "model_unavailable",
            RiskError::Inference { .. } => "inference_error",
            RiskError::ConfigError(_) => "config_error",
            RiskError::SerializationError(_) => "serialization_error",
            RiskError::IoError(_) => "io_error",
        }
    }

    /// Fine-grained kind used as a metric label
    pub fn detail_kind(&self) -> &'static str {
        match self {
            RiskError::Validation(e) => e.kind.as_str(),
            RiskError::ModelUnavailable { kind, .. } => kind.as_str(),
            RiskError::Inference { kind, .. } => kind.as_str(),
            other => other.error_kind(),
        }
    }
}

impl From<RegistryError> for RiskError {
    fn from(err: RegistryError) -> Self {
        let kind = match &err {
            RegistryError::NotFound { .. } => ModelUnavailableKind::NotFound,
            RegistryError::Unreachable(_) => ModelUnavailableKind::RegistryUnreachable,
            RegistryError::Corrupt(_) => ModelUnavailableKind::RegistryUnreachable,
            RegistryError::InvalidOperation(_) => ModelUnavailableKind::NotFound,
        };
        RiskError::model_unavailable(kind, err.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::SerializationError(err.to_string())
    }
}
