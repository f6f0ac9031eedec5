//! Serialized model artifacts
//!
//! Two encodings are accepted:
//! - JSON, portable and human-readable
//! - Binary, the `DRSK` magic followed by a bincode payload
//!
//! The encoding is detected from the leading bytes on decode.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::{Classifier, ScoringFunction};
use crate::error::{ModelUnavailableKind, Result, RiskError};
use crate::features::FEATURE_NAMES;
use crate::preprocessing::Preprocessor;

/// Highest artifact format this build can decode
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Leading bytes of a binary artifact
pub const BINARY_MAGIC: [u8; 4] = *b"DRSK";

fn default_threshold() -> f64 {
    0.5
}

/// Artifact encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactEncoding {
    #[default]
    Json,
    Binary,
}

impl ArtifactEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactEncoding::Json => "json",
            ArtifactEncoding::Binary => "bin",
        }
    }

    /// Detect the encoding from the first bytes of an artifact
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&BINARY_MAGIC) {
            return Some(ArtifactEncoding::Binary);
        }
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Some(ArtifactEncoding::Json),
            _ => None,
        }
    }
}

/// Descriptive metadata recorded by training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub version: String,
    pub trained_at: Option<DateTime<Utc>>,
    /// Feature order the classifier was trained on
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub model_type: String,
    #[serde(default)]
    pub hyperparameters: HashMap<String, String>,
    /// Evaluation metrics (accuracy, precision, recall, f1_score, ...)
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
}

impl ArtifactMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            trained_at: None,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            target_name: "outcome".to_string(),
            model_type: String::new(),
            hyperparameters: HashMap::new(),
            metrics: HashMap::new(),
        }
    }
}

/// A trained classifier with everything needed to serve it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub metadata: ArtifactMetadata,
    #[serde(default)]
    pub preprocessor: Preprocessor,
    pub classifier: Classifier,
    /// Decision threshold on the positive-class probability
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl ModelArtifact {
    pub fn new(name: impl Into<String>, classifier: Classifier) -> Self {
        let mut metadata = ArtifactMetadata::new(name);
        metadata.model_type = classifier.family().to_string();
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata,
            preprocessor: Preprocessor::default(),
            classifier,
            threshold: default_threshold(),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.metadata.feature_names = names;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = version.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metadata.metrics.insert(key.into(), value);
        self
    }

    /// Encode the artifact
    pub fn to_bytes(&self, encoding: ArtifactEncoding) -> Result<Vec<u8>> {
        match encoding {
            ArtifactEncoding::Json => Ok(serde_json::to_vec_pretty(self)?),
            ArtifactEncoding::Binary => {
                let payload = bincode::serialize(self).map_err(|e| {
                    RiskError::SerializationError(format!("Failed to serialize artifact: {}", e))
                })?;
                let mut bytes = Vec::with_capacity(BINARY_MAGIC.len() + payload.len());
                bytes.extend_from_slice(&BINARY_MAGIC);
                bytes.extend_from_slice(&payload);
                Ok(bytes)
            }
        }
    }

    /// Decode an artifact, detecting its encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format_err = |msg: String| RiskError::model_unavailable(ModelUnavailableKind::FormatMismatch, msg);

        let artifact: ModelArtifact = match ArtifactEncoding::detect(bytes) {
            Some(ArtifactEncoding::Binary) => bincode::deserialize(&bytes[BINARY_MAGIC.len()..])
                .map_err(|e| format_err(format!("invalid binary artifact: {}", e)))?,
            Some(ArtifactEncoding::Json) => serde_json::from_slice(bytes)
                .map_err(|e| format_err(format!("invalid JSON artifact: {}", e)))?,
            None => return Err(format_err("unrecognized artifact encoding".to_string())),
        };

        if artifact.format_version == 0 || artifact.format_version > ARTIFACT_FORMAT_VERSION {
            return Err(format_err(format!(
                "unsupported artifact format version {} (max {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        Ok(artifact)
    }

    pub fn write_file(&self, path: impl AsRef<Path>, encoding: ArtifactEncoding) -> Result<()> {
        std::fs::write(path, self.to_bytes(encoding)?)?;
        Ok(())
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
