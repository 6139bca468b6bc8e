// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application); this layer
// only routes and prints.
//
//   robustnn fit              - fit a certified static model
//   robustnn observer         - learn a contracting PDE observer
//   robustnn check-lipschitz  - audit a fitted LBDN
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{CheckLipschitzArgs, Commands, FitArgs, ObserverArgs};

use crate::application::{
    fit_use_case::{Certificate, FitUseCase},
    lipschitz_use_case::LipschitzCheckUseCase,
    observer_use_case::ObserverUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "robustnn",
    version,
    about = "Train neural networks with certified robustness: Lipschitz bounds, monotonicity, contraction."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Fit(args) => run_fit(args),
            Commands::Observer(args) => run_observer(args),
            Commands::CheckLipschitz(args) => run_check(args),
        }
    }
}

fn run_fit(args: FitArgs) -> Result<()> {
    tracing::info!("Fitting a {} model to '{}'", args.model, args.target);
    let report = FitUseCase::new(args.into()).execute()?;

    println!(
        "Fit complete. Best epoch {} (val_loss={:.6}), final train_loss={:.6}",
        report.summary.best_epoch,
        report.summary.best_val_loss,
        report.summary.final_train_loss(),
    );
    match report.certificate {
        Certificate::Lipschitz { bound, estimate } => {
            println!("Lipschitz certificate γ={bound:.4}, empirical estimate {estimate:.4}");
        }
        Certificate::PolyakLojasiewicz { constant, minimizer, converged } => {
            println!("PL constant μ²={constant:.4}, global minimiser {minimizer:?} (converged: {converged})");
        }
    }
    Ok(())
}

fn run_observer(args: ObserverArgs) -> Result<()> {
    tracing::info!("Training a {} observer", args.model);
    let results_dir = args.checkpoint_dir.clone();
    let report = ObserverUseCase::new(args.into()).execute()?;

    println!("NRMSE: {:.6}", report.nrmse);
    println!("Number of params: {}", report.num_params);
    println!("Results written to {results_dir}/results.json");
    Ok(())
}

fn run_check(args: CheckLipschitzArgs) -> Result<()> {
    let use_case = LipschitzCheckUseCase::new(
        args.checkpoint_dir,
        args.samples,
        args.rounds,
        args.radius,
        args.seed,
    );
    let report = use_case.execute()?;

    let verdict = if report.within_bound { "OK" } else { "VIOLATED" };
    println!(
        "γ={:.4}  empirical={:.4}  ratio={:.3}  [{}]",
        report.bound,
        report.estimate,
        report.estimate / report.bound,
        verdict,
    );
    Ok(())
}
