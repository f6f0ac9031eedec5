//! Patient feature handling
//!
//! Turns a raw inbound request into the fixed-order numeric vector a
//! trained model consumes:
//! - [`validate`] checks structure, types and domain bounds of the eight fields
//! - [`vectorize`] lays validated fields out in canonical training order

mod patient;
mod validator;
mod vector;

pub use patient::{Bound, FieldSpec, FieldType, PatientFeatures, FEATURE_NAMES, FIELD_SPECS, N_FEATURES};
pub use validator::{validate, validate_fields};
pub use vector::{vectorize, FeatureVector};
