// ============================================================
// Layer 4 - Datasets
// ============================================================
// In-memory implementations of Burn's Dataset trait for the
// two kinds of training data:
//
//   RegressionDataset - (x, f(x)) pairs for the static models
//   TransitionDataset - (x_t, y_t, x_{t+1}) triples for the
//                       one-step-ahead observer
//
// Reference: Burn Book §4 (Datasets)

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One input/label pair for a static model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSample {
    pub input: Vec<f32>,
    pub target: Vec<f32>,
}

/// One step of a state trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSample {
    /// x_t
    pub state: Vec<f32>,
    /// Model input at time t (the measurements y_t)
    pub input: Vec<f32>,
    /// x_{t+1}
    pub next_state: Vec<f32>,
}

pub struct RegressionDataset {
    samples: Vec<RegressionSample>,
}

impl RegressionDataset {
    pub fn new(samples: Vec<RegressionSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[RegressionSample] {
        &self.samples
    }
}

impl Dataset<RegressionSample> for RegressionDataset {
    fn get(&self, index: usize) -> Option<RegressionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub struct TransitionDataset {
    samples: Vec<TransitionSample>,
}

impl TransitionDataset {
    pub fn new(samples: Vec<TransitionSample>) -> Self {
        Self { samples }
    }
}

impl Dataset<TransitionSample> for TransitionDataset {
    fn get(&self, index: usize) -> Option<TransitionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_past_the_end_is_none() {
        let ds = RegressionDataset::new(vec![RegressionSample { input: vec![0.5], target: vec![1.0] }]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0).map(|s| s.target), Some(vec![1.0]));
        assert!(ds.get(1).is_none());
    }
}
