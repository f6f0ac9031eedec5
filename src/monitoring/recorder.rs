//! Fire-and-forget metric delivery
//!
//! Request paths hand observations to a bounded channel with `try_send`
//! and move on. A background task drains the channel into the
//! [`MetricsRegistry`]. When the queue is full the observation is dropped,
//! counted and logged; the request is never slowed down by metrics.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::metrics::{
    MetricsRegistry, MODEL_CONFIDENCE, MODEL_RELOADS_TOTAL, PREDICTIONS_TOTAL, PREDICTION_CONFIDENCE,
    PREDICTION_DURATION,
};

/// Metric family an observation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Counter,
    Histogram,
    Gauge,
}

/// A single metric data point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricObservation {
    pub kind: ObservationKind,
    pub name: String,
    pub value: f64,
    pub labels: Vec<(String, String)>,
}

impl MetricObservation {
    fn new(kind: ObservationKind, name: &str, value: f64) -> Self {
        Self {
            kind,
            name: name.to_string(),
            value,
            labels: Vec::new(),
        }
    }

    pub fn counter(name: &str, value: f64) -> Self {
        Self::new(ObservationKind::Counter, name, value)
    }

    pub fn histogram(name: &str, value: f64) -> Self {
        Self::new(ObservationKind::Histogram, name, value)
    }

    pub fn gauge(name: &str, value: f64) -> Self {
        Self::new(ObservationKind::Gauge, name, value)
    }

    pub fn with_label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.push((key.to_string(), value.into()));
        self
    }
}

/// Terminal state of a prediction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    /// The request was dropped before it finished
    Aborted,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Aborted => "aborted",
        }
    }
}

/// One completed prediction attempt
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEvent {
    pub latency: Duration,
    pub predicted_class: Option<u8>,
    pub confidence: Option<f64>,
    pub outcome: Outcome,
    pub error_kind: Option<&'static str>,
}

impl PredictionEvent {
    pub fn success(latency: Duration, predicted_class: u8, confidence: f64) -> Self {
        Self {
            latency,
            predicted_class: Some(predicted_class),
            confidence: Some(confidence),
            outcome: Outcome::Success,
            error_kind: None,
        }
    }

    pub fn failure(latency: Duration, error_kind: &'static str) -> Self {
        Self {
            latency,
            predicted_class: None,
            confidence: None,
            outcome: Outcome::Failure,
            error_kind: Some(error_kind),
        }
    }

    pub fn aborted(latency: Duration) -> Self {
        Self {
            latency,
            predicted_class: None,
            confidence: None,
            outcome: Outcome::Aborted,
            error_kind: None,
        }
    }

    /// Observations this event contributes
    pub fn observations(&self) -> Vec<MetricObservation> {
        let class = self.predicted_class.map(|c| c.to_string()).unwrap_or_default();
        let mut out = vec![
            MetricObservation::counter(PREDICTIONS_TOTAL, 1.0)
                .with_label("outcome", self.outcome.as_str())
                .with_label("predicted_class", class)
                .with_label("error_kind", self.error_kind.unwrap_or("")),
            MetricObservation::histogram(PREDICTION_DURATION, self.latency.as_secs_f64()),
        ];

        if let Some(confidence) = self.confidence {
            out.push(MetricObservation::histogram(PREDICTION_CONFIDENCE, confidence));
            out.push(MetricObservation::gauge(MODEL_CONFIDENCE, confidence));
        }
        out
    }
}

/// Sink for metric observations
pub trait MetricsRecorder: Send + Sync {
    /// Hand observations off without blocking
    fn emit(&self, observations: Vec<MetricObservation>);

    fn record(&self, event: &PredictionEvent) {
        self.emit(event.observations());
    }

    fn record_reload(&self, result: &str) {
        self.emit(vec![
            MetricObservation::counter(MODEL_RELOADS_TOTAL, 1.0).with_label("result", result),
        ]);
    }
}

enum RecorderMessage {
    Observations(Vec<MetricObservation>),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle feeding the background aggregation task
#[derive(Clone)]
pub struct ChannelRecorder {
    tx: mpsc::Sender<RecorderMessage>,
    metrics: Arc<MetricsRegistry>,
}

impl ChannelRecorder {
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Wait until everything sent before this call has been applied
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(RecorderMessage::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl MetricsRecorder for ChannelRecorder {
    fn emit(&self, observations: Vec<MetricObservation>) {
        let n = observations.len() as u64;
        match self.tx.try_send(RecorderMessage::Observations(observations)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_dropped(n);
                warn!(dropped = n, "Metrics queue full, dropping observations");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.record_dropped(n);
                warn!(dropped = n, "Metrics recorder stopped, dropping observations");
            }
        }
    }
}

/// Recorder that applies observations inline; handy for tools and tests
pub struct DirectRecorder {
    metrics: Arc<MetricsRegistry>,
}

impl DirectRecorder {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }
}

impl MetricsRecorder for DirectRecorder {
    fn emit(&self, observations: Vec<MetricObservation>) {
        for observation in &observations {
            self.metrics.apply(observation);
        }
    }
}

/// Spawn the aggregation task and return a handle for emitting into it.
///
/// The task exits once every [`ChannelRecorder`] clone has been dropped.
pub fn spawn_metrics_recorder(
    metrics: Arc<MetricsRegistry>,
    capacity: usize,
) -> (ChannelRecorder, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(recorder_loop(rx, metrics.clone()));
    (ChannelRecorder { tx, metrics }, task)
}

async fn recorder_loop(mut rx: mpsc::Receiver<RecorderMessage>, metrics: Arc<MetricsRegistry>) {
    while let Some(message) = rx.recv().await {
        match message {
            RecorderMessage::Observations(observations) => {
                for observation in &observations {
                    metrics.apply(observation);
                }
            }
            RecorderMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Metrics recorder loop exiting (all senders dropped)");
}
