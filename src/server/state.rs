//! Application state management

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::inference::PredictionService;

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub service: Arc<PredictionService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, service: Arc<PredictionService>) -> Self {
        Self {
            config,
            service,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}
