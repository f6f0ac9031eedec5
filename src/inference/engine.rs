//! Prediction orchestration
//!
//! One request moves through
//! `Received -> Validated -> Vectorized -> Scored -> Responded`
//! or exits through `Failed`. Exactly one metric event is recorded per
//! attempt, including attempts whose future is dropped mid-flight.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::confidence::confidence;
use super::ServingConfig;
use crate::error::{InferenceErrorKind, ModelUnavailableKind, Result, RiskError};
use crate::features::{validate, vectorize};
use crate::model::{ClassProbabilities, LoadedModel, ModelLoader, ModelRegistry, ModelRuntime, ReloadOutcome};
use crate::monitoring::{MetricsRecorder, MetricsRegistry, PredictionEvent, API_HEALTH_STATUS};

/// Where a request is in the prediction pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Vectorized,
    Scored,
    Responded,
    Failed(&'static str),
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Responded | RequestState::Failed(_))
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Received => f.write_str("received"),
            RequestState::Validated => f.write_str("validated"),
            RequestState::Vectorized => f.write_str("vectorized"),
            RequestState::Scored => f.write_str("scored"),
            RequestState::Responded => f.write_str("responded"),
            RequestState::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Outcome of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub predicted_class: u8,
    pub class_probabilities: ClassProbabilities,
    pub confidence: f64,
    /// Registry version of the model that produced it
    pub model_version: u32,
}

/// Wire shape of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    /// Probability of the positive class
    pub probability: f64,
    pub confidence: f64,
}

impl From<&ScoredResult> for PredictionResponse {
    fn from(result: &ScoredResult) -> Self {
        Self {
            prediction: result.predicted_class,
            probability: result.class_probabilities.positive,
            confidence: result.confidence,
        }
    }
}

/// Tracks one attempt and guarantees it is recorded exactly once
struct AttemptGuard {
    recorder: Arc<dyn MetricsRecorder>,
    started: Instant,
    state: RequestState,
}

impl AttemptGuard {
    fn new(recorder: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            recorder,
            started: Instant::now(),
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug!(from = %self.state, to = %next, "Request state transition");
        self.state = next;
    }

    fn succeed(&mut self, result: &ScoredResult) {
        self.advance(RequestState::Responded);
        self.recorder.record(&PredictionEvent::success(
            self.started.elapsed(),
            result.predicted_class,
            result.confidence,
        ));
    }

    fn fail(&mut self, err: &RiskError) {
        let kind = err.detail_kind();
        self.advance(RequestState::Failed(kind));
        self.recorder.record(&PredictionEvent::failure(self.started.elapsed(), kind));
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(state = %self.state, "Prediction attempt dropped before completion");
            self.recorder.record(&PredictionEvent::aborted(self.started.elapsed()));
        }
    }
}

/// Run a CPU-bound closure on the blocking pool with an upper time bound.
///
/// Expiry only abandons the wait; the closure itself runs to completion.
pub async fn run_with_timeout<T, F>(timeout: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(RiskError::inference(
            InferenceErrorKind::ComputationFailure,
            format!("scoring task failed: {}", join_err),
        )),
        Err(_) => Err(RiskError::inference(
            InferenceErrorKind::Timeout,
            format!("scoring exceeded {} ms", timeout.as_millis()),
        )),
    }
}

/// Validates, scores and records predictions against the active model
pub struct PredictionService {
    config: ServingConfig,
    runtime: ModelRuntime,
    recorder: Arc<dyn MetricsRecorder>,
    metrics: Arc<MetricsRegistry>,
}

impl PredictionService {
    pub fn new(
        config: ServingConfig,
        registry: Arc<dyn ModelRegistry>,
        recorder: Arc<dyn MetricsRecorder>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let runtime = ModelRuntime::new(
            ModelLoader::new(registry),
            config.model_name.clone(),
            config.model_stage.clone(),
        );
        let service = Self {
            config,
            runtime,
            recorder,
            metrics,
        };
        service.refresh_health_gauge();
        service
    }

    pub fn config(&self) -> &ServingConfig {
        &self.config
    }

    pub fn runtime(&self) -> &ModelRuntime {
        &self.runtime
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn current_model(&self) -> Option<Arc<LoadedModel>> {
        self.runtime.current()
    }

    fn refresh_health_gauge(&self) {
        let up = if self.runtime.slot().is_loaded() { 1.0 } else { 0.0 };
        self.metrics.set_gauge(API_HEALTH_STATUS, up);
    }

    /// Startup load of the configured model
    pub async fn load_initial(&self) -> Result<Arc<LoadedModel>> {
        Ok(self.reload().await?.model().clone())
    }

    /// Load the configured (name, stage) and swap it in if it changed
    pub async fn reload(&self) -> Result<ReloadOutcome> {
        let result = self.runtime.reload().await;
        let label = match &result {
            Ok(outcome) if outcome.swapped() => "swapped",
            Ok(_) => "unchanged",
            Err(_) => "failed",
        };
        self.recorder.record_reload(label);
        self.refresh_health_gauge();
        result
    }

    /// Serve one prediction request
    pub async fn predict(&self, raw: &Value) -> Result<ScoredResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("predict", %request_id);

        async move {
            let mut guard = AttemptGuard::new(self.recorder.clone());
            let result = self.run(&mut guard, raw).await;

            match &result {
                Ok(scored) => {
                    guard.succeed(scored);
                    info!(
                        prediction = scored.predicted_class,
                        probability = scored.class_probabilities.positive,
                        confidence = scored.confidence,
                        model_version = scored.model_version,
                        "Prediction served"
                    );
                }
                Err(e @ RiskError::Validation(_)) => {
                    guard.fail(e);
                    debug!(error = %e, "Prediction rejected");
                }
                Err(e) => {
                    guard.fail(e);
                    error!(error = %e, "Prediction failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Record an attempt whose body never made it to validation
    pub fn reject(&self, err: &RiskError) {
        let mut guard = AttemptGuard::new(self.recorder.clone());
        guard.fail(err);
        debug!(error = %err, "Prediction body rejected");
    }

    async fn run(&self, guard: &mut AttemptGuard, raw: &Value) -> Result<ScoredResult> {
        let features = validate(raw)?;
        guard.advance(RequestState::Validated);

        let vector = vectorize(&features);
        guard.advance(RequestState::Vectorized);

        let model = if self.config.lazy_load {
            self.runtime.ensure_loaded().await?
        } else {
            self.runtime.current().ok_or_else(|| {
                RiskError::model_unavailable(ModelUnavailableKind::NotLoaded, "no model is loaded")
            })?
        };

        let version = model.version;
        let (predicted_class, class_probabilities) =
            run_with_timeout(self.config.score_timeout(), move || model.score(&vector)).await?;
        guard.advance(RequestState::Scored);

        Ok(ScoredResult {
            predicted_class,
            class_probabilities,
            confidence: confidence(&class_probabilities),
            model_version: version,
        })
    }
}
