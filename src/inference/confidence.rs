//! Confidence estimation
//!
//! Confidence is the largest class probability. It is a decisiveness
//! proxy only: it is not calibrated, so a confidence of 0.8 does not mean
//! the prediction is right 80% of the time.

use crate::model::ClassProbabilities;

/// Largest class probability of a binary distribution.
///
/// Total: a pair that does not sum to one is not corrected.
pub fn confidence(probabilities: &ClassProbabilities) -> f64 {
    probabilities.negative.max(probabilities.positive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_max_probability() {
        for p1 in [0.0, 0.1, 0.25, 0.5, 0.73, 0.99, 1.0] {
            let probs = ClassProbabilities::from_positive(p1);
            let c = confidence(&probs);
            assert_eq!(c, p1.max(1.0 - p1));
            assert!((0.5..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_confidence_does_not_renormalize() {
        let probs = ClassProbabilities { negative: 0.2, positive: 0.3 };
        assert_eq!(confidence(&probs), 0.3);
    }
}
