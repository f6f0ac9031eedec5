//! Model registry collaborator
//!
//! The serving core only needs two calls from a registry: resolve a
//! (name, stage) pair to an artifact handle, and fetch the raw bytes
//! behind a handle. [`FsModelRegistry`] is a filesystem implementation
//! that also supports registering versions and moving them between stages.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::artifact::{ArtifactEncoding, ModelArtifact};
use crate::error::RegistryError;

/// Stage selector meaning "highest registered version"
pub const LATEST: &str = "latest";

/// Resolved location of one artifact version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub name: String,
    pub version: u32,
    /// Stage selector the handle was resolved from
    pub stage: String,
    /// Backend-specific location of the artifact bytes
    pub uri: String,
}

/// Lookup interface the serving core depends on
pub trait ModelRegistry: Send + Sync {
    /// Resolve a model name and stage (stage name, `latest`, or a version
    /// number) to a concrete artifact
    fn resolve(&self, name: &str, stage: &str) -> Result<ArtifactHandle, RegistryError>;

    /// Read the artifact bytes behind a handle
    fn fetch(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, RegistryError>;
}

/// One registered version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub version: u32,
    /// File path relative to registry root
    pub path: String,
    pub encoding: ArtifactEncoding,
    pub model_type: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub description: String,
    pub registered_at: DateTime<Utc>,
}

/// All versions and stage assignments of one model name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub versions: Vec<RegistryEntry>,
    /// Stage name -> version
    pub stages: BTreeMap<String, u32>,
}

impl RegisteredModel {
    fn latest(&self) -> Option<&RegistryEntry> {
        self.versions.iter().max_by_key(|e| e.version)
    }

    fn version(&self, version: u32) -> Option<&RegistryEntry> {
        self.versions.iter().find(|e| e.version == version)
    }

    fn stage(&self, stage: &str) -> Option<u32> {
        self.stages
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(stage))
            .map(|(_, v)| *v)
    }

    /// Stages currently pointing at `version`
    pub fn stages_of(&self, version: u32) -> Vec<String> {
        self.stages
            .iter()
            .filter(|(_, v)| **v == version)
            .map(|(s, _)| s.clone())
            .collect()
    }
}

/// Registry index persisted as `index.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryIndex {
    pub models: BTreeMap<String, RegisteredModel>,
}

/// Filesystem-backed registry.
///
/// The index is re-read on every call so versions registered or promoted
/// by another process are visible to the next reload.
pub struct FsModelRegistry {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsModelRegistry {
    /// Open a registry rooted at `path`; no IO happens until first use
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Open a registry, creating its root directory if needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let registry = Self::new(path);
        fs::create_dir_all(&registry.root).map_err(|e| {
            RegistryError::Unreachable(format!("Failed to create registry {}: {}", registry.root.display(), e))
        })?;
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    /// Load the current index
    pub fn index(&self) -> Result<RegistryIndex, RegistryError> {
        if !self.root.is_dir() {
            return Err(RegistryError::Unreachable(format!(
                "registry root {} does not exist",
                self.root.display()
            )));
        }

        match fs::read(self.index_path()) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| RegistryError::Corrupt(format!("Failed to read index: {}", e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RegistryIndex::default()),
            Err(e) => Err(RegistryError::Unreachable(format!("Failed to open index: {}", e))),
        }
    }

    fn save_index(&self, index: &RegistryIndex) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(index)
            .map_err(|e| RegistryError::Corrupt(format!("Failed to write index: {}", e)))?;

        // Readers must never see a half-written index
        let tmp = self.root.join("index.json.tmp");
        fs::write(&tmp, bytes)
            .and_then(|_| fs::rename(&tmp, self.index_path()))
            .map_err(|e| RegistryError::Unreachable(format!("Failed to write index: {}", e)))
    }

    /// Store an artifact as the next version of `name`
    pub fn register(
        &self,
        name: &str,
        artifact: &ModelArtifact,
        encoding: ArtifactEncoding,
        description: &str,
    ) -> Result<u32, RegistryError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(RegistryError::InvalidOperation(format!("invalid model name '{}'", name)));
        }

        let _guard = self.write_lock.lock();
        let mut index = self.index()?;
        let model = index.models.entry(name.to_string()).or_default();
        let version = model.latest().map(|e| e.version + 1).unwrap_or(1);

        let model_dir = self.root.join(name);
        fs::create_dir_all(&model_dir)
            .map_err(|e| RegistryError::Unreachable(format!("Failed to create model dir: {}", e)))?;

        let file_name = format!("v{}.{}", version, encoding.extension());
        let bytes = artifact
            .to_bytes(encoding)
            .map_err(|e| RegistryError::InvalidOperation(e.to_string()))?;
        fs::write(model_dir.join(&file_name), bytes)
            .map_err(|e| RegistryError::Unreachable(format!("Failed to write model: {}", e)))?;

        model.versions.push(RegistryEntry {
            version,
            path: format!("{}/{}", name, file_name),
            encoding,
            model_type: artifact.metadata.model_type.clone(),
            metrics: artifact.metadata.metrics.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            description: description.to_string(),
            registered_at: Utc::now(),
        });

        self.save_index(&index)?;
        info!(model = %name, version, "Registered model version");
        Ok(version)
    }

    /// Point `stage` at `version`, returning the version it replaced
    pub fn transition(&self, name: &str, version: u32, stage: &str) -> Result<Option<u32>, RegistryError> {
        if stage.is_empty() || stage.eq_ignore_ascii_case(LATEST) || stage.parse::<u32>().is_ok() {
            return Err(RegistryError::InvalidOperation(format!("'{}' cannot be used as a stage name", stage)));
        }

        let _guard = self.write_lock.lock();
        let mut index = self.index()?;
        let model = index.models.get_mut(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
            stage: stage.to_string(),
        })?;

        if model.version(version).is_none() {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
                stage: format!("version {}", version),
            });
        }

        // Stage keys are matched case-insensitively; keep a single spelling
        let existing_key = model
            .stages
            .keys()
            .find(|k| k.eq_ignore_ascii_case(stage))
            .cloned();
        let previous = existing_key.as_ref().and_then(|k| model.stages.remove(k));
        model.stages.insert(existing_key.unwrap_or_else(|| stage.to_string()), version);

        self.save_index(&index)?;
        info!(model = %name, version, stage = %stage, previous = ?previous, "Transitioned model stage");
        Ok(previous)
    }
}

impl ModelRegistry for FsModelRegistry {
    fn resolve(&self, name: &str, stage: &str) -> Result<ArtifactHandle, RegistryError> {
        let index = self.index()?;
        let not_found = || RegistryError::NotFound {
            name: name.to_string(),
            stage: stage.to_string(),
        };

        let model = index.models.get(name).ok_or_else(not_found)?;
        let entry = if stage.eq_ignore_ascii_case(LATEST) {
            model.latest()
        } else if let Ok(version) = stage.parse::<u32>() {
            model.version(version)
        } else {
            model.stage(stage).and_then(|v| model.version(v))
        }
        .ok_or_else(not_found)?;

        Ok(ArtifactHandle {
            name: name.to_string(),
            version: entry.version,
            stage: stage.to_string(),
            uri: entry.path.clone(),
        })
    }

    fn fetch(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, RegistryError> {
        fs::read(self.root.join(&handle.uri)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RegistryError::NotFound {
                name: handle.name.clone(),
                stage: handle.stage.clone(),
            },
            _ => RegistryError::Unreachable(format!("Failed to read {}: {}", handle.uri, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::classifier::{Classifier, LogisticModel};

    fn artifact() -> ModelArtifact {
        ModelArtifact::new(
            "diabetes-predictor",
            Classifier::LogisticRegression(LogisticModel::new(vec![0.01; 8], -1.0)),
        )
        .add_metric("f1_score", 0.66)
    }

    #[test]
    fn test_register_assigns_increasing_versions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();

        let v1 = registry.register("diabetes-predictor", &artifact(), ArtifactEncoding::Json, "").unwrap();
        let v2 = registry.register("diabetes-predictor", &artifact(), ArtifactEncoding::Binary, "").unwrap();
        assert_eq!((v1, v2), (1, 2));

        let index = registry.index().unwrap();
        let model = &index.models["diabetes-predictor"];
        assert_eq!(model.versions[1].path, "diabetes-predictor/v2.bin");
        assert_eq!(model.versions[0].metrics["f1_score"], 0.66);
    }

    #[test]
    fn test_resolve_by_stage_version_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();
        registry.register("m", &artifact(), ArtifactEncoding::Json, "").unwrap();
        registry.register("m", &artifact(), ArtifactEncoding::Json, "").unwrap();

        assert_eq!(registry.transition("m", 1, "Production").unwrap(), None);

        assert_eq!(registry.resolve("m", "Production").unwrap().version, 1);
        assert_eq!(registry.resolve("m", "production").unwrap().version, 1);
        assert_eq!(registry.resolve("m", "latest").unwrap().version, 2);
        assert_eq!(registry.resolve("m", "2").unwrap().version, 2);

        assert_eq!(registry.transition("m", 2, "PRODUCTION").unwrap(), Some(1));
        let index = registry.index().unwrap();
        assert_eq!(index.models["m"].stages.len(), 1);
        assert_eq!(index.models["m"].stages_of(2), vec!["Production".to_string()]);
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();
        registry.register("m", &artifact(), ArtifactEncoding::Json, "").unwrap();

        assert!(matches!(registry.resolve("m", "Staging"), Err(RegistryError::NotFound { .. })));
        assert!(matches!(registry.resolve("other", "latest"), Err(RegistryError::NotFound { .. })));
        assert!(matches!(registry.resolve("m", "9"), Err(RegistryError::NotFound { .. })));
    }

    #[test]
    fn test_missing_root_is_unreachable() {
        let registry = FsModelRegistry::new("/nonexistent/diabetes-risk-registry");
        assert!(matches!(
            registry.resolve("m", "Production"),
            Err(RegistryError::Unreachable(_))
        ));
    }

    #[test]
    fn test_fetch_returns_artifact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();
        registry.register("m", &artifact(), ArtifactEncoding::Binary, "").unwrap();

        let handle = registry.resolve("m", "latest").unwrap();
        let bytes = registry.fetch(&handle).unwrap();
        assert_eq!(ModelArtifact::from_bytes(&bytes).unwrap(), artifact());
    }

    #[test]
    fn test_invalid_operations() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();
        assert!(registry.register("../escape", &artifact(), ArtifactEncoding::Json, "").is_err());

        registry.register("m", &artifact(), ArtifactEncoding::Json, "").unwrap();
        assert!(registry.transition("m", 1, "latest").is_err());
        assert!(registry.transition("m", 1, "3").is_err());
        assert!(matches!(
            registry.transition("m", 5, "Staging"),
            Err(RegistryError::NotFound { .. })
        ));
    }
}
