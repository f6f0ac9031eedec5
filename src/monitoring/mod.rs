//! Monitoring Module
//!
//! Prediction metrics: observation types, the non-blocking recorder and
//! the Prometheus-format aggregate behind `/metrics`.

mod metrics;
mod recorder;

pub use metrics::{
    Histogram, MetricsRegistry, API_HEALTH_STATUS, METRICS_DROPPED_TOTAL, MODEL_CONFIDENCE, MODEL_RELOADS_TOTAL,
    PREDICTIONS_TOTAL, PREDICTION_CONFIDENCE, PREDICTION_DURATION,
};
pub use recorder::{
    spawn_metrics_recorder, ChannelRecorder, DirectRecorder, MetricObservation, MetricsRecorder, ObservationKind,
    Outcome, PredictionEvent,
};
