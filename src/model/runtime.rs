//! Active model management: startup load, lazy load and hot reload

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::loaded::LoadedModel;
use super::loader::ModelLoader;
use super::slot::ModelSlot;
use crate::error::{ModelUnavailableKind, Result, RiskError};

/// What a reload did to the slot
#[derive(Debug, Clone)]
pub enum ReloadOutcome {
    /// A different artifact was loaded and swapped in
    Swapped {
        previous_version: Option<u32>,
        model: Arc<LoadedModel>,
    },
    /// The registry still points at the active artifact
    Unchanged(Arc<LoadedModel>),
}

impl ReloadOutcome {
    pub fn model(&self) -> &Arc<LoadedModel> {
        match self {
            ReloadOutcome::Swapped { model, .. } => model,
            ReloadOutcome::Unchanged(model) => model,
        }
    }

    pub fn swapped(&self) -> bool {
        matches!(self, ReloadOutcome::Swapped { .. })
    }
}

/// Owns the model slot for one configured (name, stage)
pub struct ModelRuntime {
    name: String,
    stage: String,
    loader: ModelLoader,
    slot: ModelSlot,
    // Serializes loads; scoring never takes it
    load_lock: Mutex<()>,
}

impl ModelRuntime {
    pub fn new(loader: ModelLoader, name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: stage.into(),
            loader,
            slot: ModelSlot::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn slot(&self) -> &ModelSlot {
        &self.slot
    }

    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.slot.current()
    }

    /// Load the configured model and swap it in.
    ///
    /// The replacement is built fully before the swap; on any failure the
    /// active model is left untouched.
    pub async fn reload(&self) -> Result<ReloadOutcome> {
        let _guard = self.load_lock.lock().await;
        self.reload_locked().await
    }

    async fn reload_locked(&self) -> Result<ReloadOutcome> {
        let active = self.slot.current();
        let loader = self.loader.clone();
        let (name, stage) = (self.name.clone(), self.stage.clone());
        let cached = active.clone();

        let loaded = tokio::task::spawn_blocking(move || -> Result<Option<LoadedModel>> {
            let handle = loader.resolve(&name, &stage)?;
            if cached.as_ref().is_some_and(|m| m.is_same_artifact(&handle)) {
                return Ok(None);
            }
            loader.load_handle(&handle).map(Some)
        })
        .await
        .unwrap_or_else(|e| {
            Err(RiskError::model_unavailable(
                ModelUnavailableKind::FormatMismatch,
                format!("load task panicked while decoding the artifact: {}", e),
            ))
        });

        match loaded {
            Ok(Some(model)) => {
                let model = Arc::new(model);
                let previous = self.slot.replace(model.clone());
                let previous_version = previous.map(|m| m.version);
                info!(
                    model = %model.name,
                    version = model.version,
                    previous_version = ?previous_version,
                    generation = self.slot.generation(),
                    "Model swapped in"
                );
                Ok(ReloadOutcome::Swapped { previous_version, model })
            }
            Ok(None) => {
                let model = active.ok_or_else(|| {
                    RiskError::model_unavailable(ModelUnavailableKind::NotLoaded, "active model vanished")
                })?;
                info!(model = %model.name, version = model.version, "Reload skipped, artifact unchanged");
                Ok(ReloadOutcome::Unchanged(model))
            }
            Err(e) => {
                warn!(
                    model = %self.name,
                    stage = %self.stage,
                    error = %e,
                    kept_version = ?active.map(|m| m.version),
                    "Model reload failed"
                );
                Err(e)
            }
        }
    }

    /// Active model, loading it first if the slot is still empty
    pub async fn ensure_loaded(&self) -> Result<Arc<LoadedModel>> {
        if let Some(model) = self.slot.current() {
            return Ok(model);
        }

        let _guard = self.load_lock.lock().await;
        // Another request may have finished the load while we waited
        if let Some(model) = self.slot.current() {
            return Ok(model);
        }
        Ok(self.reload_locked().await?.model().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::ArtifactEncoding;
    use crate::model::registry::FsModelRegistry;
    use crate::error::RegistryError;
    use crate::model::registry::{ArtifactHandle, ModelRegistry};
    use crate::model::testing::logistic_artifact;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn runtime(dir: &std::path::Path) -> (Arc<FsModelRegistry>, ModelRuntime) {
        let registry = Arc::new(FsModelRegistry::create(dir).unwrap());
        let runtime = ModelRuntime::new(ModelLoader::new(registry.clone()), "diabetes-predictor", "Production");
        (registry, runtime)
    }

    fn promote(registry: &FsModelRegistry) -> u32 {
        let v = registry
            .register("diabetes-predictor", &logistic_artifact(), ArtifactEncoding::Json, "")
            .unwrap();
        registry.transition("diabetes-predictor", v, "Production").unwrap();
        v
    }

    /// Delegates to a filesystem registry, panicking on fetch once armed
    struct PanickingRegistry {
        inner: Arc<FsModelRegistry>,
        armed: AtomicBool,
    }

    impl ModelRegistry for PanickingRegistry {
        fn resolve(&self, name: &str, stage: &str) -> std::result::Result<ArtifactHandle, RegistryError> {
            self.inner.resolve(name, stage)
        }

        fn fetch(&self, handle: &ArtifactHandle) -> std::result::Result<Vec<u8>, RegistryError> {
            if self.armed.load(Ordering::SeqCst) {
                panic!("decoder blew up");
            }
            self.inner.fetch(handle)
        }
    }

    #[tokio::test]
    async fn test_panicking_load_is_format_mismatch_and_keeps_model() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(FsModelRegistry::create(dir.path()).unwrap());
        let registry = Arc::new(PanickingRegistry {
            inner: inner.clone(),
            armed: AtomicBool::new(false),
        });
        let runtime = ModelRuntime::new(ModelLoader::new(registry.clone()), "diabetes-predictor", "Production");

        promote(&inner);
        runtime.reload().await.unwrap();

        registry.armed.store(true, Ordering::SeqCst);
        promote(&inner);
        let err = runtime.reload().await.unwrap_err();
        assert!(matches!(
            err,
            RiskError::ModelUnavailable { kind: ModelUnavailableKind::FormatMismatch, .. }
        ));
        assert_eq!(runtime.current().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_reload_swaps_then_caches() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, runtime) = runtime(dir.path());
        promote(&registry);

        let first = runtime.reload().await.unwrap();
        assert!(first.swapped());
        assert_eq!(runtime.slot().generation(), 1);

        let second = runtime.reload().await.unwrap();
        assert!(!second.swapped());
        assert_eq!(runtime.slot().generation(), 1);

        promote(&registry);
        let third = runtime.reload().await.unwrap();
        match third {
            ReloadOutcome::Swapped { previous_version, model } => {
                assert_eq!(previous_version, Some(1));
                assert_eq!(model.version, 2);
            }
            other => panic!("expected swap, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_active_model() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, runtime) = runtime(dir.path());
        promote(&registry);
        runtime.reload().await.unwrap();

        let v2 = promote(&registry);
        std::fs::write(dir.path().join(format!("diabetes-predictor/v{}.json", v2)), b"{}").unwrap();

        assert!(runtime.reload().await.is_err());
        assert_eq!(runtime.current().unwrap().version, 1);
        assert_eq!(runtime.slot().generation(), 1);
    }

    #[tokio::test]
    async fn test_ensure_loaded_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, runtime) = runtime(dir.path());

        assert!(runtime.ensure_loaded().await.is_err());
        promote(&registry);

        let model = runtime.ensure_loaded().await.unwrap();
        assert_eq!(model.version, 1);
        runtime.ensure_loaded().await.unwrap();
        assert_eq!(runtime.slot().generation(), 1);
    }
}
