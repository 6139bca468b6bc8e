// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and their flags:
//   fit              - train an LBDN / PLNet on a synthetic target
//   observer         - train a REN / R2DN observer for the PDE
//   check-lipschitz  - audit a fitted LBDN against its bound
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{fit_use_case::FitConfig, observer_use_case::ObserverConfig};
use crate::domain::{
    activation::ActivationKind,
    task::{InitMethod, RecurrentModelKind, StaticModelKind, TargetFunction},
};
use crate::ml::trainer::TrainingConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit a Lipschitz-bounded or PL network to a synthetic function
    Fit(FitArgs),

    /// Learn a contracting state observer for a reaction-diffusion PDE
    Observer(ObserverArgs),

    /// Reload a fitted LBDN and compare its empirical slope with γ
    CheckLipschitz(CheckLipschitzArgs),
}

/// Optimiser flags shared by both training commands.
#[derive(Args, Debug, Clone)]
pub struct TrainingArgs {
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Floor for the plateau scheduler
    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    /// Epochs without validation improvement before lr drops tenfold
    #[arg(long, default_value_t = 10)]
    pub lr_patience: usize,
}

impl TrainingArgs {
    fn into_config(self, seed: u64) -> TrainingConfig {
        TrainingConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.lr,
            min_lr: self.min_lr,
            lr_patience: self.lr_patience,
            seed,
        }
    }
}

// ─── fit ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct FitArgs {
    /// sine | step | rosenbrock
    #[arg(long, default_value = "sine")]
    pub target: TargetFunction,

    /// lbdn | plnet
    #[arg(long, default_value = "lbdn")]
    pub model: StaticModelKind,

    #[arg(long, default_value = "checkpoints/fit")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 2000)]
    pub samples: usize,

    /// Std of Gaussian noise added to the labels
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Hidden layer widths, e.g. --hidden 64,64
    #[arg(long, value_delimiter = ',', default_value = "64,64")]
    pub hidden: Vec<usize>,

    /// Lipschitz bound γ of an LBDN
    #[arg(long, default_value_t = 5.0)]
    pub gamma: f64,

    /// Lower bi-Lipschitz bound of a PLNet
    #[arg(long, default_value_t = 0.1)]
    pub mu: f64,

    /// Upper bi-Lipschitz bound of a PLNet
    #[arg(long, default_value_t = 10.0)]
    pub nu: f64,

    /// Monotone layers in a PLNet
    #[arg(long, default_value_t = 2)]
    pub depth: usize,

    /// relu | tanh | sigmoid
    #[arg(long, default_value = "relu")]
    pub activation: ActivationKind,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[command(flatten)]
    pub training: TrainingArgs,
}

/// Convert CLI FitArgs into the application-layer FitConfig.
/// The application layer never sees clap types.
impl From<FitArgs> for FitConfig {
    fn from(a: FitArgs) -> Self {
        FitConfig {
            target: a.target,
            model: a.model,
            checkpoint_dir: a.checkpoint_dir,
            samples: a.samples,
            noise: a.noise,
            hidden: a.hidden,
            gamma: a.gamma,
            mu: a.mu,
            nu: a.nu,
            depth: a.depth,
            activation: a.activation,
            training: a.training.into_config(a.seed),
            seed: a.seed,
        }
    }
}

// ─── observer ────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ObserverArgs {
    /// contracting-ren | r2dn
    #[arg(long, default_value = "contracting-ren")]
    pub model: RecurrentModelKind,

    #[arg(long, default_value = "checkpoints/observer")]
    pub checkpoint_dir: String,

    /// PDE grid points (= observer states)
    #[arg(long, default_value_t = 51)]
    pub sites: usize,

    /// Equilibrium neurons (REN) or feedback channels (R2DN)
    #[arg(long, default_value_t = 200)]
    pub neurons: usize,

    /// Hidden widths of the R2DN feedback network
    #[arg(long, value_delimiter = ',', default_value = "64,64")]
    pub hidden: Vec<usize>,

    /// Steps each random boundary level is held for
    #[arg(long, default_value_t = 50)]
    pub hold: usize,

    #[arg(long, default_value_t = 100_000)]
    pub time_steps: usize,

    #[arg(long, default_value_t = 2000)]
    pub validation_steps: usize,

    #[arg(long, default_value = "relu")]
    pub activation: ActivationKind,

    /// random | long-memory
    #[arg(long, default_value = "long-memory")]
    pub init_method: InitMethod,

    /// Disable the learned-norm (polar) parameterisation
    #[arg(long)]
    pub no_polar: bool,

    /// Contraction rate in (0, 1]; defaults per model
    #[arg(long)]
    pub contraction_rate: Option<f64>,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 2e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    #[arg(long, default_value_t = 10)]
    pub lr_patience: usize,
}

impl From<ObserverArgs> for ObserverConfig {
    fn from(a: ObserverArgs) -> Self {
        let training = TrainingArgs {
            epochs: a.epochs,
            batch_size: a.batch_size,
            lr: a.lr,
            min_lr: a.min_lr,
            lr_patience: a.lr_patience,
        };
        ObserverConfig {
            model: a.model,
            checkpoint_dir: a.checkpoint_dir,
            sites: a.sites,
            neurons: a.neurons,
            hidden: a.hidden,
            hold: a.hold,
            time_steps: a.time_steps,
            validation_steps: a.validation_steps,
            activation: a.activation,
            init_method: a.init_method,
            polar: !a.no_polar,
            contraction_rate: a.contraction_rate,
            training: training.into_config(a.seed),
            seed: a.seed,
        }
    }
}

// ─── check-lipschitz ─────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CheckLipschitzArgs {
    /// Directory a previous `fit` wrote to
    #[arg(long, default_value = "checkpoints/fit")]
    pub checkpoint_dir: String,

    /// Base points drawn from the target's domain
    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    /// Perturbation rounds per base point
    #[arg(long, default_value_t = 50)]
    pub rounds: usize,

    /// Std of the random perturbations
    #[arg(long, default_value_t = 0.05)]
    pub radius: f64,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_fit_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "robustnn", "fit", "--target", "rosenbrock", "--model", "plnet",
            "--hidden", "8,4", "--mu", "0.5", "--epochs", "3", "--seed", "9",
        ])
        .unwrap();
        let Commands::Fit(args) = cli.command else { panic!("expected fit") };
        let cfg: FitConfig = args.into();
        assert_eq!(cfg.target, TargetFunction::Rosenbrock);
        assert_eq!(cfg.model, StaticModelKind::Plnet);
        assert_eq!(cfg.hidden, vec![8, 4]);
        assert_eq!(cfg.mu, 0.5);
        assert_eq!(cfg.training.epochs, 3);
        assert_eq!(cfg.training.seed, 9);
    }

    #[test]
    fn test_observer_defaults() {
        let cli = Cli::try_parse_from(["robustnn", "observer", "--no-polar"]).unwrap();
        let Commands::Observer(args) = cli.command else { panic!("expected observer") };
        let cfg: ObserverConfig = args.into();
        assert_eq!(cfg.model, RecurrentModelKind::ContractingRen);
        assert_eq!(cfg.init_method, InitMethod::LongMemory);
        assert!(!cfg.polar);
        assert_eq!(cfg.contraction_rate, None);
        assert_eq!(cfg.training.batch_size, 500);
    }

    #[test]
    fn test_unknown_target_rejected() {
        assert!(Cli::try_parse_from(["robustnn", "fit", "--target", "cosine"]).is_err());
    }
}
