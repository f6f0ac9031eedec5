//! Diabetes Risk Server Module
//!
//! HTTP surface of the prediction service: predict, health, model info,
//! reload and Prometheus metrics endpoints.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::{ErrorBody, ServerError};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::inference::{PredictionService, ServingConfig};
use crate::model::FsModelRegistry;
use crate::monitoring::{spawn_metrics_recorder, MetricsRegistry};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64 * 1024),
        }
    }
}

/// Reload the model every time the process receives SIGHUP
#[cfg(unix)]
fn spawn_reload_on_sighup(service: Arc<PredictionService>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGHUP handler, signal reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading model");
            match service.reload().await {
                Ok(outcome) => info!(
                    swapped = outcome.swapped(),
                    version = outcome.model().version,
                    "Signal reload finished"
                ),
                Err(e) => error!(error = %e, "Signal reload failed, keeping current model"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_sighup(_service: Arc<PredictionService>) {}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig, serving: ServingConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        model = %serving.model_name,
        stage = %serving.model_stage,
        registry_dir = %serving.registry_dir.display(),
        lazy_load = serving.lazy_load,
        started_at = %start_time.to_rfc3339(),
        "Initializing prediction service"
    );

    let metrics = Arc::new(MetricsRegistry::new());
    let (recorder, recorder_task) = spawn_metrics_recorder(metrics.clone(), serving.metrics_queue_capacity);
    let registry = Arc::new(FsModelRegistry::new(&serving.registry_dir));
    let lazy_load = serving.lazy_load;
    let service = Arc::new(PredictionService::new(
        serving,
        registry,
        Arc::new(recorder.clone()),
        metrics,
    ));

    if lazy_load {
        info!("Lazy loading enabled, model will load on first prediction");
    } else {
        let model = service
            .load_initial()
            .await
            .context("failed to load model at startup")?;
        info!(model = %model.name, version = model.version, family = model.family(), "Serving model");
    }

    spawn_reload_on_sighup(service.clone());

    let state = Arc::new(AppState::new(config.clone(), service));
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        max_body_size = config.max_body_size,
        started_at = %start_time.to_rfc3339(),
        "Diabetes risk server starting"
    );
    info!(url = %format!("http://{}/predict", addr), "Prediction endpoint available");
    info!(url = %format!("http://{}/metrics", addr), "Metrics endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    recorder.flush().await;
    drop(recorder);
    recorder_task.abort();
    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_body_size, 64 * 1024);
    }
}
