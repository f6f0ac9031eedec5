//! Serving configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Configuration for the prediction service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    /// Registered model name to serve
    pub model_name: String,

    /// Stage name, `latest`, or a version number
    pub model_stage: String,

    /// Root directory of the filesystem registry
    pub registry_dir: PathBuf,

    /// Upper bound on a single scoring call
    pub score_timeout_ms: u64,

    /// Bounded capacity of the metrics queue
    pub metrics_queue_capacity: usize,

    /// Defer the model load to the first prediction
    pub lazy_load: bool,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            model_name: std::env::var("MODEL_NAME").unwrap_or_else(|_| "diabetes-predictor".to_string()),
            model_stage: std::env::var("MODEL_STAGE").unwrap_or_else(|_| "Production".to_string()),
            registry_dir: std::env::var("MODEL_REGISTRY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
            score_timeout_ms: env_or("SCORE_TIMEOUT_MS", 2000),
            metrics_queue_capacity: env_or("METRICS_QUEUE_CAPACITY", 1024),
            lazy_load: env_flag("MODEL_LAZY_LOAD"),
        }
    }
}

impl ServingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the served model
    pub fn with_model(mut self, name: impl Into<String>, stage: impl Into<String>) -> Self {
        self.model_name = name.into();
        self.model_stage = stage.into();
        self
    }

    /// Builder method to set the registry root
    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    /// Builder method to set the scoring timeout
    pub fn with_score_timeout(mut self, timeout: Duration) -> Self {
        self.score_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_metrics_queue_capacity(mut self, capacity: usize) -> Self {
        self.metrics_queue_capacity = capacity;
        self
    }

    pub fn with_lazy_load(mut self, lazy: bool) -> Self {
        self.lazy_load = lazy;
        self
    }

    pub fn score_timeout(&self) -> Duration {
        Duration::from_millis(self.score_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = ServingConfig::new()
            .with_model("m", "Staging")
            .with_registry_dir("/tmp/registry")
            .with_score_timeout(Duration::from_millis(250))
            .with_metrics_queue_capacity(8)
            .with_lazy_load(true);

        assert_eq!(config.model_name, "m");
        assert_eq!(config.model_stage, "Staging");
        assert_eq!(config.registry_dir, PathBuf::from("/tmp/registry"));
        assert_eq!(config.score_timeout(), Duration::from_millis(250));
        assert_eq!(config.metrics_queue_capacity, 8);
        assert!(config.lazy_load);
    }
}
