//! Scoring functions, one variant per supported model family

use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{InferenceErrorKind, Result, RiskError};

/// Uniform scoring capability over model families
pub trait ScoringFunction: Send + Sync {
    /// Stable family name, as written in artifacts
    fn family(&self) -> &'static str;

    /// Width of the vector the function was trained on
    fn n_features(&self) -> usize;

    /// Probability of the positive class for one preprocessed sample
    fn positive_probability(&self, sample: &[f64]) -> Result<f64>;
}

fn check_width(expected: usize, sample: &[f64]) -> Result<()> {
    if sample.len() != expected {
        return Err(RiskError::inference(
            InferenceErrorKind::ShapeMismatch,
            format!("model expects {} features, got {}", expected, sample.len()),
        ));
    }
    Ok(())
}

/// Fitted logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self { coefficients, intercept }
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }
}

impl ScoringFunction for LogisticModel {
    fn family(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn positive_probability(&self, sample: &[f64]) -> Result<f64> {
        check_width(self.n_features(), sample)?;
        let linear = ArrayView1::from(self.coefficients.as_slice()).dot(&ArrayView1::from(sample))
            + self.intercept;
        Ok(Self::sigmoid(linear))
    }
}

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the positive-class probability (0/1 for hard votes)
    Leaf {
        value: f64,
        #[serde(default)]
        n_samples: usize,
    },
    /// Internal node: go left when `sample[feature_idx] <= threshold`
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        #[serde(default)]
        n_samples: usize,
    },
}

impl TreeNode {
    pub fn leaf(value: f64) -> Self {
        TreeNode::Leaf { value, n_samples: 0 }
    }

    pub fn split(feature_idx: usize, threshold: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples: 0,
        }
    }

    fn evaluate(&self, sample: &[f64]) -> Result<f64> {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    let v = sample.get(*feature_idx).ok_or_else(|| {
                        RiskError::inference(
                            InferenceErrorKind::ShapeMismatch,
                            format!("tree splits on feature {} of {}", feature_idx, sample.len()),
                        )
                    })?;
                    node = if *v <= *threshold { &**left } else { &**right };
                }
            }
        }
    }
}

/// Random forest: mean of tree outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub n_features: usize,
    pub trees: Vec<TreeNode>,
}

impl ForestModel {
    pub fn new(n_features: usize, trees: Vec<TreeNode>) -> Self {
        Self { n_features, trees }
    }
}

impl ScoringFunction for ForestModel {
    fn family(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn positive_probability(&self, sample: &[f64]) -> Result<f64> {
        check_width(self.n_features, sample)?;
        if self.trees.is_empty() {
            return Err(RiskError::inference(
                InferenceErrorKind::ComputationFailure,
                "forest has no trees",
            ));
        }

        let outputs: Vec<f64> = self
            .trees
            .par_iter()
            .map(|tree| tree.evaluate(sample))
            .collect::<Result<Vec<_>>>()?;

        Ok(outputs.iter().sum::<f64>() / outputs.len() as f64)
    }
}

/// Model families a served artifact may contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression(LogisticModel),
    RandomForest(ForestModel),
}

impl Classifier {
    fn inner(&self) -> &dyn ScoringFunction {
        match self {
            Classifier::LogisticRegression(m) => m as &dyn ScoringFunction,
            Classifier::RandomForest(m) => m as &dyn ScoringFunction,
        }
    }
}

impl ScoringFunction for Classifier {
    fn family(&self) -> &'static str {
        self.inner().family()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn positive_probability(&self, sample: &[f64]) -> Result<f64> {
        self.inner().positive_probability(sample)
    }
}
