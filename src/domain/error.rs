// ============================================================
// Layer 3 - Model Errors
// ============================================================
// Errors raised while validating a model description, before
// any tensor is allocated. The application layer wraps these
// in anyhow::Error with context about which command failed.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("unknown activation '{0}' (expected relu, tanh or sigmoid)")]
    UnknownActivation(String),

    #[error("unknown target function '{0}' (expected sine, step or rosenbrock)")]
    UnknownTarget(String),

    #[error("unknown init method '{0}' (expected random or long_memory)")]
    UnknownInitMethod(String),

    #[error("unknown model kind '{0}'")]
    UnknownModelKind(String),

    #[error("{name} must be at least 1, got {value}")]
    ZeroDimension { name: &'static str, value: usize },

    #[error("Lipschitz bound must be finite and positive, got {0}")]
    InvalidLipschitzBound(f64),

    #[error("bi-Lipschitz bounds need 0 < lower <= upper, got lower={lower}, upper={upper}")]
    InvalidBiLipschitzBounds { lower: f64, upper: f64 },

    #[error("contraction rate must lie in (0, 1], got {0}")]
    InvalidContractionRate(f64),

    #[error("depth must be at least 1")]
    ZeroDepth,

    #[error("input dimension mismatch: model expects {expected}, data has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
