//! Patient measurement schema

use serde::{Deserialize, Serialize};

/// Number of features every served model must accept
pub const N_FEATURES: usize = 8;

/// Canonical feature order. Served artifacts must have been trained on
/// exactly this order; the loader rejects anything else.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "pregnancies",
    "glucose",
    "blood_pressure",
    "skin_thickness",
    "insulin",
    "bmi",
    "diabetes_pedigree",
    "age",
];

/// Declared numeric type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
}

/// Lower domain bound of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// value >= 0
    NonNegative,
    /// value > 0
    Positive,
}

impl Bound {
    pub fn admits(&self, value: f64) -> bool {
        match self {
            Bound::NonNegative => value >= 0.0,
            Bound::Positive => value > 0.0,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Bound::NonNegative => ">= 0",
            Bound::Positive => "> 0",
        }
    }
}

/// Schema entry for one inbound field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub bound: Bound,
}

pub const FIELD_SPECS: [FieldSpec; N_FEATURES] = [
    FieldSpec { name: "pregnancies", field_type: FieldType::Integer, bound: Bound::NonNegative },
    FieldSpec { name: "glucose", field_type: FieldType::Float, bound: Bound::NonNegative },
    FieldSpec { name: "blood_pressure", field_type: FieldType::Float, bound: Bound::NonNegative },
    FieldSpec { name: "skin_thickness", field_type: FieldType::Float, bound: Bound::NonNegative },
    FieldSpec { name: "insulin", field_type: FieldType::Float, bound: Bound::NonNegative },
    FieldSpec { name: "bmi", field_type: FieldType::Float, bound: Bound::Positive },
    FieldSpec { name: "diabetes_pedigree", field_type: FieldType::Float, bound: Bound::Positive },
    FieldSpec { name: "age", field_type: FieldType::Integer, bound: Bound::Positive },
];

/// Validated patient measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientFeatures {
    pub pregnancies: u32,
    pub glucose: f64,
    pub blood_pressure: f64,
    pub skin_thickness: f64,
    pub insulin: f64,
    pub bmi: f64,
    pub diabetes_pedigree: f64,
    pub age: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specs_follow_canonical_order() {
        let names: Vec<&str> = FIELD_SPECS.iter().map(|s| s.name).collect();
        assert_eq!(names, FEATURE_NAMES.to_vec());
    }

    #[test]
    fn test_bounds() {
        assert!(Bound::NonNegative.admits(0.0));
        assert!(!Bound::NonNegative.admits(-0.1));
        assert!(!Bound::Positive.admits(0.0));
        assert!(Bound::Positive.admits(0.01));
    }
}
