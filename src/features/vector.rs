//! Fixed-order feature vectors

use std::ops::Index;

use super::patient::{PatientFeatures, N_FEATURES};

/// Numeric encoding of one patient in canonical training order.
///
/// The length invariant is carried by the array type; a vector is built
/// per request and dropped after scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        N_FEATURES
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

impl From<[f64; N_FEATURES]> for FeatureVector {
    fn from(values: [f64; N_FEATURES]) -> Self {
        Self(values)
    }
}

/// Lay out validated features in canonical order
pub fn vectorize(features: &PatientFeatures) -> FeatureVector {
    FeatureVector([
        features.pregnancies as f64,
        features.glucose,
        features.blood_pressure,
        features.skin_thickness,
        features.insulin,
        features.bmi,
        features.diabetes_pedigree,
        features.age as f64,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::validate;

    #[test]
    fn test_vector_order_ignores_request_key_order() {
        let forward = r#"{"pregnancies":6,"glucose":148,"blood_pressure":72,"skin_thickness":35,
            "insulin":0,"bmi":33.6,"diabetes_pedigree":0.627,"age":50}"#;
        let shuffled = r#"{"age":50,"bmi":33.6,"insulin":0,"glucose":148,
            "diabetes_pedigree":0.627,"skin_thickness":35,"pregnancies":6,"blood_pressure":72}"#;

        let a = vectorize(&validate(&serde_json::from_str(forward).unwrap()).unwrap());
        let b = vectorize(&validate(&serde_json::from_str(shuffled).unwrap()).unwrap());

        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_eq!(a.as_slice(), &[6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0]);
    }

    #[test]
    fn test_index_by_position() {
        let v = FeatureVector::from([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(v[1], 2.0);
        assert_eq!(v[7], 8.0);
    }
}
