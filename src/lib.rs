//! Diabetes Risk - prediction serving core
//!
//! Predicts a binary diabetes-risk outcome from eight patient measurements
//! and serves it over HTTP/JSON.
//!
//! # Modules
//!
//! ## Decision path
//! - [`features`] - Request validation and fixed-order vectorization
//! - [`preprocessing`] - Imputation and scaling replayed from training
//! - [`model`] - Artifacts, model families, registry and hot-swappable runtime
//! - [`inference`] - Request orchestration, timeouts and confidence
//!
//! ## Services
//! - [`monitoring`] - Metric observations, background recorder, Prometheus text
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod features;
pub mod preprocessing;
pub mod model;
pub mod inference;

pub mod monitoring;
pub mod server;
pub mod cli;

pub use error::{Result, RiskError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{
        InferenceErrorKind, ModelUnavailableKind, Result, RiskError, ValidationError, ValidationErrorKind,
    };
    pub use crate::features::{validate, vectorize, FeatureVector, PatientFeatures, FEATURE_NAMES};
    pub use crate::inference::{confidence, PredictionResponse, PredictionService, ScoredResult, ServingConfig};
    pub use crate::model::{
        ArtifactEncoding, ArtifactHandle, Classifier, ClassProbabilities, FsModelRegistry, LoadedModel,
        ModelArtifact, ModelRegistry, ModelRuntime, ModelSlot,
    };
    pub use crate::monitoring::{MetricsRecorder, MetricsRegistry, PredictionEvent};
    pub use crate::preprocessing::{Preprocessor, Scaler, ScalerType, ZeroImputer};
    pub use crate::server::{create_router, AppState, ServerConfig};
}
