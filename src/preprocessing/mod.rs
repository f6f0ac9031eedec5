//! Preprocessing replayed at inference time
//!
//! Artifacts carry the transforms fitted during training so the vector
//! handed to the raw classifier matches its training-time distribution:
//! - Zero-value median imputation
//! - Feature scaling (Standard, MinMax, Robust, MaxAbs)

mod imputer;
mod pipeline;
mod scaler;

pub use imputer::ZeroImputer;
pub use pipeline::Preprocessor;
pub use scaler::{Scaler, ScalerParams, ScalerType};
