//! A model that passed every load-time check and is ready to score

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::ModelArtifact;
use super::classifier::{Classifier, ScoringFunction};
use super::registry::ArtifactHandle;
use crate::error::{InferenceErrorKind, ModelUnavailableKind, Result, RiskError};
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::preprocessing::Preprocessor;

/// Class distribution `(p0, p1)` of a binary prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub negative: f64,
    pub positive: f64,
}

impl ClassProbabilities {
    pub fn from_positive(positive: f64) -> Self {
        Self {
            negative: 1.0 - positive,
            positive,
        }
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.negative, self.positive)
    }
}

/// Served model summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub stage: String,
    pub version: u32,
    pub artifact_version: String,
    pub location: String,
    pub model_type: String,
    pub feature_names: Vec<String>,
    pub threshold: f64,
    pub metrics: BTreeMap<String, f64>,
    pub trained_at: Option<DateTime<Utc>>,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable scoring function plus provenance
#[derive(Debug)]
pub struct LoadedModel {
    pub name: String,
    pub stage: String,
    /// Registry version the handle resolved to
    pub version: u32,
    pub location: String,
    pub classifier: Classifier,
    pub preprocessor: Preprocessor,
    pub threshold: f64,
    pub artifact_version: String,
    pub feature_names: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
    pub trained_at: Option<DateTime<Utc>>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    /// Check an artifact against the serving schema and wrap it
    pub fn from_artifact(artifact: ModelArtifact, handle: &ArtifactHandle) -> Result<Self> {
        let schema_err = |msg: String| RiskError::model_unavailable(ModelUnavailableKind::SchemaMismatch, msg);

        let names = &artifact.metadata.feature_names;
        if names.len() != FEATURE_NAMES.len() || names.iter().zip(FEATURE_NAMES.iter()).any(|(a, b)| a != b) {
            return Err(schema_err(format!(
                "artifact feature order {:?} does not match serving order {:?}",
                names, FEATURE_NAMES
            )));
        }

        if artifact.classifier.n_features() != FEATURE_NAMES.len() {
            return Err(schema_err(format!(
                "classifier expects {} features, serving provides {}",
                artifact.classifier.n_features(),
                FEATURE_NAMES.len()
            )));
        }

        if !(artifact.threshold > 0.0 && artifact.threshold < 1.0) {
            return Err(schema_err(format!(
                "decision threshold {} outside (0, 1)",
                artifact.threshold
            )));
        }

        Ok(Self {
            name: handle.name.clone(),
            stage: handle.stage.clone(),
            version: handle.version,
            location: handle.uri.clone(),
            classifier: artifact.classifier,
            preprocessor: artifact.preprocessor,
            threshold: artifact.threshold,
            artifact_version: artifact.metadata.version,
            feature_names: artifact.metadata.feature_names,
            metrics: artifact.metadata.metrics.into_iter().collect(),
            trained_at: artifact.metadata.trained_at,
            loaded_at: Utc::now(),
        })
    }

    /// Score one vector, returning the predicted class and distribution
    pub fn score(&self, vector: &FeatureVector) -> Result<(u8, ClassProbabilities)> {
        let sample = self.preprocessor.apply(vector.as_slice())?;
        let p1 = self.classifier.positive_probability(&sample)?;

        if !p1.is_finite() || !(0.0..=1.0).contains(&p1) {
            return Err(RiskError::inference(
                InferenceErrorKind::ComputationFailure,
                format!("classifier produced invalid probability {}", p1),
            ));
        }

        let class = u8::from(p1 >= self.threshold);
        Ok((class, ClassProbabilities::from_positive(p1)))
    }

    pub fn family(&self) -> &'static str {
        self.classifier.family()
    }

    /// True when `handle` points at the artifact this model was built from
    pub fn is_same_artifact(&self, handle: &ArtifactHandle) -> bool {
        self.version == handle.version && self.location == handle.uri
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            stage: self.stage.clone(),
            version: self.version,
            artifact_version: self.artifact_version.clone(),
            location: self.location.clone(),
            model_type: self.family().to_string(),
            feature_names: self.feature_names.clone(),
            threshold: self.threshold,
            metrics: self.metrics.clone(),
            trained_at: self.trained_at,
            loaded_at: self.loaded_at,
        }
    }
}
