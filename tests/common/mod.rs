//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use diabetes_risk::inference::{PredictionService, ServingConfig};
use diabetes_risk::model::{
    ArtifactEncoding, Classifier, ForestModel, FsModelRegistry, LogisticModel, ModelArtifact, TreeNode,
};
use diabetes_risk::monitoring::{spawn_metrics_recorder, ChannelRecorder, MetricsRegistry};
use diabetes_risk::preprocessing::{Preprocessor, Scaler, ScalerParams, ScalerType, ZeroImputer};
use diabetes_risk::server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const MODEL_NAME: &str = "diabetes-predictor";

/// Standard-scaled logistic model with zero imputation on the physiological columns
pub fn logistic_artifact() -> ModelArtifact {
    let means = [3.8, 121.0, 72.0, 29.0, 155.0, 32.5, 0.47, 33.2];
    let stds = [3.4, 30.4, 12.1, 8.8, 85.0, 6.9, 0.33, 11.8];
    let scaler = Scaler::from_params(
        ScalerType::Standard,
        means
            .iter()
            .zip(stds.iter())
            .map(|(&center, &scale)| ScalerParams { center, scale })
            .collect(),
    );
    let imputer = ZeroImputer::from_fill_values(vec![
        None,
        Some(117.0),
        Some(72.0),
        Some(29.0),
        Some(125.0),
        Some(32.3),
        None,
        None,
    ]);

    ModelArtifact::new(
        MODEL_NAME,
        Classifier::LogisticRegression(LogisticModel::new(
            vec![0.39, 1.08, -0.14, 0.03, -0.08, 0.71, 0.32, 0.17],
            -0.86,
        )),
    )
    .with_preprocessor(Preprocessor::new().with_imputer(imputer).with_scaler(scaler))
    .add_metric("accuracy", 0.77)
    .add_metric("f1_score", 0.64)
}

/// Small forest voting on glucose and bmi
pub fn forest_artifact() -> ModelArtifact {
    let glucose = |t| TreeNode::split(1, t, TreeNode::leaf(0.0), TreeNode::leaf(1.0));
    let bmi = |t| TreeNode::split(5, t, TreeNode::leaf(0.1), TreeNode::leaf(0.8));
    ModelArtifact::new(
        MODEL_NAME,
        Classifier::RandomForest(ForestModel::new(8, vec![glucose(125.0), glucose(140.0), bmi(30.0)])),
    )
    .with_version("2.0.0")
}

/// Forest wide enough that scoring takes measurable time
pub fn wide_forest_artifact(n_trees: usize) -> ModelArtifact {
    let trees = (0..n_trees)
        .map(|i| TreeNode::split(1, 100.0 + (i % 50) as f64, TreeNode::leaf(0.0), TreeNode::leaf(1.0)))
        .collect();
    ModelArtifact::new(MODEL_NAME, Classifier::RandomForest(ForestModel::new(8, trees)))
}

pub fn high_risk_patient() -> Value {
    json!({
        "pregnancies": 6,
        "glucose": 148,
        "blood_pressure": 72,
        "skin_thickness": 35,
        "insulin": 0,
        "bmi": 33.6,
        "diabetes_pedigree": 0.627,
        "age": 50
    })
}

pub fn low_risk_patient() -> Value {
    json!({
        "pregnancies": 1,
        "glucose": 85,
        "blood_pressure": 66,
        "skin_thickness": 29,
        "insulin": 0,
        "bmi": 26.6,
        "diabetes_pedigree": 0.351,
        "age": 31
    })
}

/// Register `artifact` and point Production at it
pub fn promote(registry: &FsModelRegistry, artifact: &ModelArtifact, encoding: ArtifactEncoding) -> u32 {
    let version = registry.register(MODEL_NAME, artifact, encoding, "test").unwrap();
    registry.transition(MODEL_NAME, version, "Production").unwrap();
    version
}

pub struct TestApp {
    pub dir: TempDir,
    pub registry: Arc<FsModelRegistry>,
    pub metrics: Arc<MetricsRegistry>,
    pub recorder: ChannelRecorder,
    pub service: Arc<PredictionService>,
    pub router: Router,
}

impl TestApp {
    /// Service over an empty registry, nothing loaded
    pub fn empty() -> Self {
        Self::with_config(|c| c)
    }

    pub fn with_config(configure: impl FnOnce(ServingConfig) -> ServingConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(FsModelRegistry::create(dir.path()).unwrap());
        let metrics = Arc::new(MetricsRegistry::new());
        let (recorder, _task) = spawn_metrics_recorder(metrics.clone(), 256);

        let serving = configure(
            ServingConfig::new()
                .with_model(MODEL_NAME, "Production")
                .with_registry_dir(dir.path())
                .with_lazy_load(false),
        );
        let service = Arc::new(PredictionService::new(
            serving,
            registry.clone(),
            Arc::new(recorder.clone()),
            metrics.clone(),
        ));

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_body_size: 64 * 1024,
        };
        let state = Arc::new(AppState::new(config.clone(), service.clone()));
        let router = create_router(state, &config);

        Self {
            dir,
            registry,
            metrics,
            recorder,
            service,
            router,
        }
    }

    /// Service with the logistic artifact promoted and loaded
    pub async fn loaded() -> Self {
        let app = Self::empty();
        promote(&app.registry, &logistic_artifact(), ArtifactEncoding::Binary);
        app.service.load_initial().await.unwrap();
        app
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, bytes) = self.get(uri).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}
