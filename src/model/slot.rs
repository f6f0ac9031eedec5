//! Hot-swappable reference to the active model

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::loaded::LoadedModel;

/// Versioned cell holding the model that serves new requests.
///
/// Readers clone the `Arc` and drop the lock before scoring, so a swap never
/// waits on in-flight work and never disturbs it.
#[derive(Default)]
pub struct ModelSlot {
    active: RwLock<Option<Arc<LoadedModel>>>,
    generation: AtomicU64,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active model, if any
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.active.read().clone()
    }

    /// Install `model`, returning the one it replaced
    pub fn replace(&self, model: Arc<LoadedModel>) -> Option<Arc<LoadedModel>> {
        let mut guard = self.active.write();
        let previous = guard.replace(model);
        self.generation.fetch_add(1, Ordering::SeqCst);
        previous
    }

    /// Number of swaps performed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.active.read().is_some()
    }
}
