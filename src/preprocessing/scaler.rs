//! Feature scaling replayed at serving time from parameters fitted during training

use crate::error::{InferenceErrorKind, Result, RiskError};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
    /// Max absolute scaling: x / max(|x|)
    MaxAbs,
    /// No scaling
    None,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// mean, min, median or 0
    pub center: f64,
    /// std, range, IQR or max |x|
    pub scale: f64,
}

/// Feature scaler with one parameter set per feature, in feature order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
}

impl Scaler {
    /// Build a scaler from already-fitted parameters
    pub fn from_params(scaler_type: ScalerType, params: Vec<ScalerParams>) -> Self {
        Self { scaler_type, params }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    /// Scale a single sample in place
    pub fn transform(&self, sample: &mut [f64]) -> Result<()> {
        if sample.len() != self.params.len() {
            return Err(RiskError::inference(
                InferenceErrorKind::ShapeMismatch,
                format!(
                    "scaler fitted on {} features, sample has {}",
                    self.params.len(),
                    sample.len()
                ),
            ));
        }
        for (v, p) in sample.iter_mut().zip(&self.params) {
            *v = (*v - p.center) / p.scale;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(f64, f64)]) -> Vec<ScalerParams> {
        pairs.iter().map(|&(center, scale)| ScalerParams { center, scale }).collect()
    }

    #[test]
    fn test_standard_scaler_centers_and_scales() {
        let scaler = Scaler::from_params(ScalerType::Standard, params(&[(3.0, 2.0), (120.0, 30.0)]));
        let mut sample = [5.0, 90.0];
        scaler.transform(&mut sample).unwrap();
        assert!((sample[0] - 1.0).abs() < 1e-10);
        assert!((sample[1] + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_minmax_scaler() {
        let scaler = Scaler::from_params(ScalerType::MinMax, params(&[(0.0, 10.0), (10.0, 20.0)]));
        let mut sample = [5.0, 30.0];
        scaler.transform(&mut sample).unwrap();
        assert!((sample[0] - 0.5).abs() < 1e-10);
        assert!((sample[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_none_scaler_is_identity() {
        let scaler = Scaler::from_params(ScalerType::None, params(&[(0.0, 1.0); 3]));
        let mut sample = [1.5, -2.0, 33.6];
        scaler.transform(&mut sample).unwrap();
        assert_eq!(sample, [1.5, -2.0, 33.6]);
        assert_eq!(scaler.n_features(), 3);
        assert_eq!(scaler.scaler_type(), ScalerType::None);
    }

    #[test]
    fn test_width_mismatch_is_shape_error() {
        let scaler = Scaler::from_params(
            ScalerType::Standard,
            vec![ScalerParams { center: 0.0, scale: 1.0 }; 3],
        );
        let err = scaler.transform(&mut [1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            RiskError::Inference { kind: InferenceErrorKind::ShapeMismatch, .. }
        ));
    }
}
