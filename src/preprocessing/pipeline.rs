//! Preprocessing bundled with a model artifact

use serde::{Deserialize, Serialize};

use super::{Scaler, ZeroImputer};
use crate::error::Result;

/// Transforms fitted during training, replayed on every served sample:
/// zero imputation first, then scaling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    #[serde(default)]
    pub imputer: Option<ZeroImputer>,
    #[serde(default)]
    pub scaler: Option<Scaler>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_imputer(mut self, imputer: ZeroImputer) -> Self {
        self.imputer = Some(imputer);
        self
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn is_identity(&self) -> bool {
        self.imputer.is_none() && self.scaler.is_none()
    }

    /// Apply all steps to a copy of `sample`
    pub fn apply(&self, sample: &[f64]) -> Result<Vec<f64>> {
        let mut out = sample.to_vec();
        if let Some(ref imputer) = self.imputer {
            imputer.transform(&mut out)?;
        }
        if let Some(ref scaler) = self.scaler {
            scaler.transform(&mut out)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{ScalerParams, ScalerType};

    #[test]
    fn test_imputes_before_scaling() {
        let pre = Preprocessor::new()
            .with_imputer(ZeroImputer::from_fill_values(vec![Some(10.0)]))
            .with_scaler(Scaler::from_params(
                ScalerType::Standard,
                vec![ScalerParams { center: 10.0, scale: 2.0 }],
            ));
        assert_eq!(pre.apply(&[0.0]).unwrap(), vec![0.0]);
        assert_eq!(pre.apply(&[14.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_identity() {
        let pre = Preprocessor::default();
        assert!(pre.is_identity());
        assert_eq!(pre.apply(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
    }
}
