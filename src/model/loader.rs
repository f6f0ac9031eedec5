//! Registry-backed model loading

use std::sync::Arc;

use tracing::{debug, info};

use super::artifact::ModelArtifact;
use super::loaded::LoadedModel;
use super::registry::{ArtifactHandle, ModelRegistry};
use crate::error::Result;

/// Resolves, fetches and decodes artifacts into [`LoadedModel`]s.
///
/// Every call does blocking IO; async callers run it on the blocking pool.
#[derive(Clone)]
pub struct ModelLoader {
    registry: Arc<dyn ModelRegistry>,
}

impl ModelLoader {
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, name: &str, stage: &str) -> Result<ArtifactHandle> {
        Ok(self.registry.resolve(name, stage)?)
    }

    /// Fetch and decode the artifact behind an already resolved handle
    pub fn load_handle(&self, handle: &ArtifactHandle) -> Result<LoadedModel> {
        let bytes = self.registry.fetch(handle)?;
        debug!(model = %handle.name, version = handle.version, bytes = bytes.len(), "Fetched artifact");

        let artifact = ModelArtifact::from_bytes(&bytes)?;
        let model = LoadedModel::from_artifact(artifact, handle)?;

        info!(
            model = %model.name,
            stage = %model.stage,
            version = model.version,
            family = model.family(),
            location = %model.location,
            "Model loaded"
        );
        Ok(model)
    }

    pub fn load(&self, name: &str, stage: &str) -> Result<LoadedModel> {
        let handle = self.resolve(name, stage)?;
        self.load_handle(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ModelUnavailableKind, RiskError};
    use crate::model::artifact::ArtifactEncoding;
    use crate::model::registry::FsModelRegistry;
    use crate::model::testing::logistic_artifact;

    #[test]
    fn test_load_production_model() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();
        let version = registry
            .register("diabetes-predictor", &logistic_artifact(), ArtifactEncoding::Binary, "")
            .unwrap();
        registry.transition("diabetes-predictor", version, "Production").unwrap();

        let loader = ModelLoader::new(Arc::new(registry));
        let model = loader.load("diabetes-predictor", "Production").unwrap();
        assert_eq!(model.version, 1);
        assert_eq!(model.stage, "Production");
    }

    #[test]
    fn test_corrupt_artifact_is_format_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsModelRegistry::create(dir.path()).unwrap();
        registry
            .register("diabetes-predictor", &logistic_artifact(), ArtifactEncoding::Json, "")
            .unwrap();
        std::fs::write(dir.path().join("diabetes-predictor/v1.json"), b"not an artifact").unwrap();

        let loader = ModelLoader::new(Arc::new(registry));
        let err = loader.load("diabetes-predictor", "latest").unwrap_err();
        assert!(matches!(
            err,
            RiskError::ModelUnavailable { kind: ModelUnavailableKind::FormatMismatch, .. }
        ));
    }

    #[test]
    fn test_unresolvable_stage_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new(Arc::new(FsModelRegistry::create(dir.path()).unwrap()));
        let err = loader.load("diabetes-predictor", "Production").unwrap_err();
        assert!(matches!(
            err,
            RiskError::ModelUnavailable { kind: ModelUnavailableKind::NotFound, .. }
        ));
    }
}
