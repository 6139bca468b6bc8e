// ============================================================
// Layer 3 - Tasks and Model Choices
// ============================================================
// Plain enums naming the regression targets and the model
// families the CLI can train. Each parses from the lowercase
// name used on the command line and in saved JSON configs.

use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt, str::FromStr};

use crate::domain::error::ModelError;

// ─── TargetFunction ──────────────────────────────────────────────────────────
/// Synthetic functions used to fit static models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFunction {
    /// sin(πx) on [-2, 2]; Lipschitz constant π
    Sine,
    /// A unit jump at x = 0 on [-1, 1]; not Lipschitz at all, so a
    /// γ-bounded model can only approximate it with slope γ
    Step,
    /// Scaled Rosenbrock banana ((1-x)² + 5(y-x²)²) / 10 on [-2, 2]²
    Rosenbrock,
}

impl TargetFunction {
    pub fn input_dim(&self) -> usize {
        match self {
            TargetFunction::Sine | TargetFunction::Step => 1,
            TargetFunction::Rosenbrock => 2,
        }
    }

    /// Sampling box (same bounds for every coordinate).
    pub fn domain(&self) -> (f64, f64) {
        match self {
            TargetFunction::Sine | TargetFunction::Rosenbrock => (-2.0, 2.0),
            TargetFunction::Step => (-1.0, 1.0),
        }
    }

    pub fn eval(&self, x: &[f64]) -> f64 {
        match self {
            TargetFunction::Sine => (PI * x[0]).sin(),
            TargetFunction::Step => {
                if x[0] < 0.0 { 0.0 } else { 1.0 }
            }
            TargetFunction::Rosenbrock => {
                let (a, b) = (x[0], x[1]);
                ((1.0 - a).powi(2) + 5.0 * (b - a * a).powi(2)) / 10.0
            }
        }
    }
}

impl fmt::Display for TargetFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetFunction::Sine => "sine",
            TargetFunction::Step => "step",
            TargetFunction::Rosenbrock => "rosenbrock",
        })
    }
}

impl FromStr for TargetFunction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(TargetFunction::Sine),
            "step" => Ok(TargetFunction::Step),
            "rosenbrock" => Ok(TargetFunction::Rosenbrock),
            other => Err(ModelError::UnknownTarget(other.to_string())),
        }
    }
}

// ─── InitMethod ──────────────────────────────────────────────────────────────
/// How the implicit REN parameters are initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    /// Glorot-normal entries everywhere
    #[default]
    Random,
    /// State matrix starts close to the identity so the model
    /// remembers inputs for a long time
    LongMemory,
}

impl fmt::Display for InitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitMethod::Random => "random",
            InitMethod::LongMemory => "long_memory",
        })
    }
}

impl FromStr for InitMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "random" => Ok(InitMethod::Random),
            "long_memory" => Ok(InitMethod::LongMemory),
            other => Err(ModelError::UnknownInitMethod(other.to_string())),
        }
    }
}

// ─── Model families ──────────────────────────────────────────────────────────
/// Static (memoryless) models trained by `fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticModelKind {
    Lbdn,
    Plnet,
}

impl fmt::Display for StaticModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StaticModelKind::Lbdn => "lbdn",
            StaticModelKind::Plnet => "plnet",
        })
    }
}

impl FromStr for StaticModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lbdn" => Ok(StaticModelKind::Lbdn),
            "plnet" => Ok(StaticModelKind::Plnet),
            other => Err(ModelError::UnknownModelKind(other.to_string())),
        }
    }
}

/// Recurrent models trained by `observer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrentModelKind {
    ContractingRen,
    R2dn,
}

impl fmt::Display for RecurrentModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecurrentModelKind::ContractingRen => "contracting_ren",
            RecurrentModelKind::R2dn => "r2dn",
        })
    }
}

impl FromStr for RecurrentModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "contracting_ren" | "ren" => Ok(RecurrentModelKind::ContractingRen),
            "r2dn" => Ok(RecurrentModelKind::R2dn),
            other => Err(ModelError::UnknownModelKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions_and_values() {
        assert_eq!(TargetFunction::Sine.input_dim(), 1);
        assert_eq!(TargetFunction::Rosenbrock.input_dim(), 2);
        assert!(TargetFunction::Sine.eval(&[0.5]) > 0.999);
        assert_eq!(TargetFunction::Step.eval(&[-0.1]), 0.0);
        assert_eq!(TargetFunction::Step.eval(&[0.1]), 1.0);
        // The banana has its global minimum at (1, 1)
        assert_eq!(TargetFunction::Rosenbrock.eval(&[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("long-memory".parse::<InitMethod>(), Ok(InitMethod::LongMemory));
        assert_eq!("PLNET".parse::<StaticModelKind>(), Ok(StaticModelKind::Plnet));
        assert_eq!("ren".parse::<RecurrentModelKind>(), Ok(RecurrentModelKind::ContractingRen));
        assert!("cubic".parse::<TargetFunction>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&RecurrentModelKind::ContractingRen).unwrap();
        assert_eq!(json, "\"contracting_ren\"");
        let json = serde_json::to_string(&InitMethod::LongMemory).unwrap();
        assert_eq!(json, "\"long_memory\"");
    }
}
