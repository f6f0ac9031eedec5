//! Zero-value imputation
//!
//! Several clinical measurements use 0 to mean "not recorded". Training
//! replaces those zeros with the column median; serving must do the same
//! before scaling or the classifier sees a different distribution.

use crate::error::{InferenceErrorKind, Result, RiskError};
use serde::{Deserialize, Serialize};

/// Replaces exact zeros in selected feature positions with a fitted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroImputer {
    /// Per-feature replacement; `None` leaves zeros untouched
    fill_values: Vec<Option<f64>>,
}

impl ZeroImputer {
    pub fn from_fill_values(fill_values: Vec<Option<f64>>) -> Self {
        Self { fill_values }
    }

    pub fn n_features(&self) -> usize {
        self.fill_values.len()
    }

    pub fn fill_values(&self) -> &[Option<f64>] {
        &self.fill_values
    }

    pub fn transform(&self, sample: &mut [f64]) -> Result<()> {
        if sample.len() != self.fill_values.len() {
            return Err(RiskError::inference(
                InferenceErrorKind::ShapeMismatch,
                format!(
                    "imputer fitted on {} features, sample has {}",
                    self.fill_values.len(),
                    sample.len()
                ),
            ));
        }
        for (v, fill) in sample.iter_mut().zip(&self.fill_values) {
            if let Some(fill) = fill {
                if *v == 0.0 {
                    *v = *fill;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_replaced_only_where_fill_is_set() {
        let imputer = ZeroImputer::from_fill_values(vec![Some(20.0), None]);
        let mut sample = [0.0, 0.0];
        imputer.transform(&mut sample).unwrap();
        assert_eq!(sample, [20.0, 0.0]);
    }

    #[test]
    fn test_non_zero_values_untouched() {
        let imputer = ZeroImputer::from_fill_values(vec![Some(5.0)]);
        let mut sample = [3.0];
        imputer.transform(&mut sample).unwrap();
        assert_eq!(sample, [3.0]);
    }
}
