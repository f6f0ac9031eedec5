//! Prediction Metrics
//!
//! In-process aggregation of metric observations, rendered in the
//! Prometheus text format. All series live under a single lock; the
//! dropped-observation counter is a lock-free atomic so the recorder can
//! bump it without touching the aggregate state.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::recorder::{MetricObservation, ObservationKind};

pub const PREDICTIONS_TOTAL: &str = "diabetes_predictions_total";
pub const PREDICTION_DURATION: &str = "diabetes_prediction_duration_seconds";
pub const PREDICTION_CONFIDENCE: &str = "diabetes_prediction_confidence";
pub const MODEL_CONFIDENCE: &str = "diabetes_model_confidence";
pub const API_HEALTH_STATUS: &str = "diabetes_api_health_status";
pub const MODEL_RELOADS_TOTAL: &str = "diabetes_model_reloads_total";
pub const METRICS_DROPPED_TOTAL: &str = "diabetes_metrics_dropped_total";

/// Latency buckets in seconds
const DURATION_BUCKETS: &[f64] = &[0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Confidence never drops below 0.5 for a binary model
const CONFIDENCE_BUCKETS: &[f64] = &[0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99, 1.0];

const HELP: &[(&str, &str)] = &[
    (PREDICTIONS_TOTAL, "Prediction attempts by outcome."),
    (PREDICTION_DURATION, "Time spent serving a prediction attempt."),
    (PREDICTION_CONFIDENCE, "Confidence of successful predictions."),
    (MODEL_CONFIDENCE, "Confidence of the most recent prediction."),
    (API_HEALTH_STATUS, "1 when a model is loaded and serving."),
    (MODEL_RELOADS_TOTAL, "Model reload attempts by result."),
    (METRICS_DROPPED_TOTAL, "Metric observations dropped because the recorder queue was full."),
];

type Labels = Vec<(String, String)>;

/// Cumulative histogram for one series
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bounds, ascending, excluding +Inf
    pub bounds: Vec<f64>,
    /// Cumulative counts per bound
    pub counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl Histogram {
    fn new(bounds: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            counts: vec![0; bounds.len()],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, value: f64) {
        for (bound, count) in self.bounds.iter().zip(self.counts.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
        self.sum += value;
        self.count += 1;
    }
}

/// Inner mutable state protected by a single lock
#[derive(Default)]
struct MetricsInner {
    counters: BTreeMap<(String, Labels), f64>,
    gauges: BTreeMap<(String, Labels), f64>,
    histograms: BTreeMap<(String, Labels), Histogram>,
}

/// Aggregated metrics for the serving process
#[derive(Default)]
pub struct MetricsRegistry {
    inner: RwLock<MetricsInner>,
    dropped: AtomicU64,
}

fn sorted_labels(labels: &[(String, String)]) -> Labels {
    let mut labels = labels.to_vec();
    labels.sort();
    labels
}

fn buckets_for(name: &str) -> &'static [f64] {
    if name == PREDICTION_CONFIDENCE {
        CONFIDENCE_BUCKETS
    } else {
        DURATION_BUCKETS
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the aggregate
    pub fn apply(&self, observation: &MetricObservation) {
        let key = (observation.name.clone(), sorted_labels(&observation.labels));
        if let Ok(mut inner) = self.inner.write() {
            match observation.kind {
                ObservationKind::Counter => {
                    *inner.counters.entry(key).or_insert(0.0) += observation.value;
                }
                ObservationKind::Gauge => {
                    inner.gauges.insert(key, observation.value);
                }
                ObservationKind::Histogram => {
                    let bounds = buckets_for(&observation.name);
                    inner
                        .histograms
                        .entry(key)
                        .or_insert_with(|| Histogram::new(bounds))
                        .observe(observation.value);
                }
            }
        }
    }

    /// Set a gauge directly, bypassing the recorder queue
    pub fn set_gauge(&self, name: &str, value: f64) {
        self.apply(&MetricObservation::gauge(name, value));
    }

    pub fn record_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Counter value for an exact label set
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        let key = (name.to_string(), owned_labels(labels));
        self.inner
            .read()
            .map(|inner| inner.counters.get(&key).copied().unwrap_or(0.0))
            .unwrap_or(0.0)
    }

    /// Sum of a counter across all label sets
    pub fn counter_total(&self, name: &str) -> f64 {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .counters
                    .iter()
                    .filter(|((n, _), _)| n == name)
                    .fold(0.0, |acc, (_, v)| acc + v)
            })
            .unwrap_or(0.0)
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        let key = (name.to_string(), Labels::new());
        self.inner.read().ok().and_then(|inner| inner.gauges.get(&key).copied())
    }

    /// Observation count of an unlabelled histogram
    pub fn histogram_count(&self, name: &str) -> u64 {
        let key = (name.to_string(), Labels::new());
        self.inner
            .read()
            .map(|inner| inner.histograms.get(&key).map(|h| h.count).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Render every series in the Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let inner = match self.inner.read() {
            Ok(inner) => inner,
            Err(_) => return out,
        };

        let mut last_name = "";
        for ((name, labels), value) in &inner.counters {
            if name != last_name {
                write_header(&mut out, name, "counter");
                last_name = name.as_str();
            }
            let _ = writeln!(out, "{}{} {}", name, format_labels(labels, None), value);
        }

        write_header(&mut out, METRICS_DROPPED_TOTAL, "counter");
        let _ = writeln!(out, "{} {}", METRICS_DROPPED_TOTAL, self.dropped());

        last_name = "";
        for ((name, labels), value) in &inner.gauges {
            if name != last_name {
                write_header(&mut out, name, "gauge");
                last_name = name.as_str();
            }
            let _ = writeln!(out, "{}{} {}", name, format_labels(labels, None), value);
        }

        last_name = "";
        for ((name, labels), hist) in &inner.histograms {
            if name != last_name {
                write_header(&mut out, name, "histogram");
                last_name = name.as_str();
            }
            for (bound, count) in hist.bounds.iter().zip(&hist.counts) {
                let le = bound.to_string();
                let _ = writeln!(out, "{}_bucket{} {}", name, format_labels(labels, Some(&le)), count);
            }
            let _ = writeln!(out, "{}_bucket{} {}", name, format_labels(labels, Some("+Inf")), hist.count);
            let _ = writeln!(out, "{}_sum{} {}", name, format_labels(labels, None), hist.sum);
            let _ = writeln!(out, "{}_count{} {}", name, format_labels(labels, None), hist.count);
        }

        out
    }
}

fn owned_labels(labels: &[(&str, &str)]) -> Labels {
    let mut labels: Labels = labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    labels.sort();
    labels
}

fn write_header(out: &mut String, name: &str, kind: &str) {
    if let Some((_, help)) = HELP.iter().find(|(n, _)| *n == name) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
    }
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn format_labels(labels: &[(String, String)], le: Option<&str>) -> String {
    let mut parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{}\"", le));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}
