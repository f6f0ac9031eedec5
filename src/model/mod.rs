//! Model runtime
//!
//! Everything between a registry entry and a scored vector:
//! - [`artifact`]: serialized artifact format and codec
//! - [`classifier`]: scoring functions per model family
//! - [`registry`]: registry collaborator trait and filesystem backend
//! - [`loader`] / [`loaded`]: decode and check artifacts into servable models
//! - [`slot`] / [`runtime`]: the hot-swappable active model

pub mod artifact;
pub mod classifier;
pub mod loaded;
pub mod loader;
pub mod registry;
pub mod runtime;
pub mod slot;

pub use artifact::{ArtifactEncoding, ArtifactMetadata, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use classifier::{Classifier, ForestModel, LogisticModel, ScoringFunction, TreeNode};
pub use loaded::{ClassProbabilities, LoadedModel, ModelInfo};
pub use loader::ModelLoader;
pub use registry::{ArtifactHandle, FsModelRegistry, ModelRegistry, RegistryEntry, RegistryIndex};
pub use runtime::{ModelRuntime, ReloadOutcome};
pub use slot::ModelSlot;
