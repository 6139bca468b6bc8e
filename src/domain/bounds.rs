// ============================================================
// Layer 3 - Robustness Bounds
// ============================================================
// Validated newtypes for the guarantees a model is built to
// satisfy. Constructing one of these is the only place the
// numeric preconditions are checked, so the ml layer can take
// them as given.

use serde::{Deserialize, Serialize};

use crate::domain::error::ModelError;

/// Upper bound γ on the Lipschitz constant: ‖f(x) - f(y)‖ <= γ ‖x - y‖.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LipschitzBound(f64);

impl LipschitzBound {
    pub fn new(gamma: f64) -> Result<Self, ModelError> {
        if gamma.is_finite() && gamma > 0.0 {
            Ok(Self(gamma))
        } else {
            Err(ModelError::InvalidLipschitzBound(gamma))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// The scale applied both before and after a 1-Lipschitz core
    /// so the whole network is γ-Lipschitz.
    pub fn sqrt(&self) -> f64 {
        self.0.sqrt()
    }
}

/// Lower and upper sensitivity bounds:
///   μ ‖x - y‖ <= ‖f(x) - f(y)‖ <= ν ‖x - y‖
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiLipschitzBounds {
    lower: f64,
    upper: f64,
}

impl BiLipschitzBounds {
    pub fn new(lower: f64, upper: f64) -> Result<Self, ModelError> {
        let valid = lower.is_finite() && upper.is_finite() && lower > 0.0 && lower <= upper;
        if valid {
            Ok(Self { lower, upper })
        } else {
            Err(ModelError::InvalidBiLipschitzBounds { lower, upper })
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Per-layer bounds for a composition of `depth` layers.
    ///
    /// Bounds multiply under composition, so each layer gets the
    /// depth-th root of the overall bound.
    pub fn split(&self, depth: usize) -> Result<Self, ModelError> {
        if depth == 0 {
            return Err(ModelError::ZeroDepth);
        }
        let root = 1.0 / depth as f64;
        Self::new(self.lower.powf(root), self.upper.powf(root))
    }

    /// Step size for the fixed-point inverse of a layer with these bounds.
    pub fn inverse_step(&self) -> f64 {
        2.0 / (self.lower + self.upper)
    }

    /// Contraction factor of the fixed-point inverse iteration.
    pub fn inverse_rate(&self) -> f64 {
        (self.upper - self.lower) / (self.upper + self.lower)
    }
}

/// Exponential contraction rate ᾱ in (0, 1]. A value of 1 only
/// guarantees non-expansion; smaller values force faster forgetting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractionRate(f64);

impl ContractionRate {
    pub fn new(rate: f64) -> Result<Self, ModelError> {
        if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
            Ok(Self(rate))
        } else {
            Err(ModelError::InvalidContractionRate(rate))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Reject zero-sized layers early, with the offending field named.
pub fn require_positive(name: &'static str, value: usize) -> Result<usize, ModelError> {
    if value == 0 {
        Err(ModelError::ZeroDimension { name, value })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lipschitz_bound_validation() {
        assert!(LipschitzBound::new(1.0).is_ok());
        assert!(LipschitzBound::new(0.0).is_err());
        assert!(LipschitzBound::new(-2.0).is_err());
        assert!(LipschitzBound::new(f64::INFINITY).is_err());
        assert_eq!(LipschitzBound::new(4.0).unwrap().sqrt(), 2.0);
    }

    #[test]
    fn test_bilipschitz_split_recomposes() {
        let bounds = BiLipschitzBounds::new(0.1, 10.0).unwrap();
        let per_layer = bounds.split(4).unwrap();
        assert!((per_layer.lower().powi(4) - 0.1).abs() < 1e-12);
        assert!((per_layer.upper().powi(4) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_bilipschitz_rejects_inverted_bounds() {
        assert!(BiLipschitzBounds::new(2.0, 1.0).is_err());
        assert!(BiLipschitzBounds::new(0.0, 1.0).is_err());
        assert!(BiLipschitzBounds::new(1.0, 1.0).unwrap().split(0).is_err());
    }

    #[test]
    fn test_inverse_rate_below_one() {
        let bounds = BiLipschitzBounds::new(0.5, 2.0).unwrap();
        assert!((bounds.inverse_step() - 0.8).abs() < 1e-12);
        assert!((bounds.inverse_rate() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_contraction_rate_range() {
        assert!(ContractionRate::new(1.0).is_ok());
        assert!(ContractionRate::new(0.5).is_ok());
        assert!(ContractionRate::new(0.0).is_err());
        assert!(ContractionRate::new(1.5).is_err());
    }

    #[test]
    fn test_require_positive() {
        assert_eq!(require_positive("nx", 3), Ok(3));
        assert_eq!(
            require_positive("nx", 0),
            Err(ModelError::ZeroDimension { name: "nx", value: 0 })
        );
    }
}
