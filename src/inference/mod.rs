//! Inference module
//!
//! The synchronous decision path of a prediction request:
//! - Validation and vectorization of the raw request
//! - Scoring against the active model on the blocking pool, under a timeout
//! - Confidence estimation
//! - One metric event per attempt, aborted attempts included

mod config;
mod confidence;
mod engine;

pub use confidence::confidence;
pub use config::ServingConfig;
pub use engine::{run_with_timeout, PredictionResponse, PredictionService, RequestState, ScoredResult};
