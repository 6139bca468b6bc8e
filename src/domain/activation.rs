// ============================================================
// Layer 3 - Activation Kinds
// ============================================================
// Every robustness certificate in this crate assumes the
// nonlinearity is slope-restricted on [0, 1]:
//
//   0 <= (σ(a) - σ(b)) / (a - b) <= 1   for all a != b
//
// ReLU, tanh and sigmoid all satisfy this. GELU does not
// (it is non-monotone), so it is deliberately not offered.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::ModelError;

/// Nonlinearity used inside sandwich, monotone and equilibrium layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
}

impl ActivationKind {
    /// Upper bound on the slope of the activation.
    pub fn max_slope(&self) -> f64 {
        match self {
            ActivationKind::Relu | ActivationKind::Tanh => 1.0,
            ActivationKind::Sigmoid => 0.25,
        }
    }

    /// Evaluate on a scalar. Used by the data layer and by tests that
    /// cross-check tensor code against a plain-float reference.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            ActivationKind::Relu => x.max(0.0),
            ActivationKind::Tanh => x.tanh(),
            ActivationKind::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationKind::Relu => "relu",
            ActivationKind::Tanh => "tanh",
            ActivationKind::Sigmoid => "sigmoid",
        };
        f.write_str(name)
    }
}

impl FromStr for ActivationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(ActivationKind::Relu),
            "tanh" => Ok(ActivationKind::Tanh),
            "sigmoid" => Ok(ActivationKind::Sigmoid),
            other => Err(ModelError::UnknownActivation(other.to_string())),
        }
    }
}
