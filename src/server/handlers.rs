//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ModelUnavailableKind, RiskError, ValidationError};
use crate::inference::PredictionResponse;
use crate::monitoring::API_HEALTH_STATUS;

use super::error::Result;
use super::state::AppState;

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Diabetes Risk Prediction API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/predict", "/health", "/model/info", "/model/reload", "/metrics"],
    }))
}

/// Score one patient record
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => {
            state
                .service
                .reject(&ValidationError::malformed(rejection.body_text()).into());
            return Err(rejection.into());
        }
    };
    let scored = state.service.predict(&raw).await?;
    Ok(Json(PredictionResponse::from(&scored)))
}

/// Liveness plus model state; 503 until a model is loaded
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = &state.service;
    let model = service.current_model();
    let config = service.config();

    let status = if model.is_some() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = json!({
        "status": if model.is_some() { "healthy" } else { "degraded" },
        "model_loaded": model.is_some(),
        "model_name": config.model_name,
        "model_stage": config.model_stage,
        "model_version": model.as_ref().map(|m| m.version),
        "generation": service.runtime().slot().generation(),
        "uptime_secs": state.uptime_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    });

    (status, Json(body))
}

/// Metadata of the active model
pub async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let model = state.service.current_model().ok_or_else(|| {
        RiskError::model_unavailable(ModelUnavailableKind::NotLoaded, "no model is loaded")
    })?;

    Ok(Json(json!({
        "model": model.info(),
        "generation": state.service.runtime().slot().generation(),
    })))
}

/// Re-resolve the configured model and swap it in if it changed
pub async fn reload_model(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    info!("Model reload requested over HTTP");
    let outcome = state.service.reload().await?;

    Ok(Json(json!({
        "reloaded": outcome.swapped(),
        "model": outcome.model().info(),
        "generation": state.service.runtime().slot().generation(),
    })))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = &state.service;
    let metrics = service.metrics();
    let up = if service.runtime().slot().is_loaded() { 1.0 } else { 0.0 };
    metrics.set_gauge(API_HEALTH_STATUS, up);

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render_prometheus(),
    )
}
