// ============================================================
// Layer 2 - FitUseCase
// ============================================================
// Fits a static certified model to a synthetic target:
//
//   Step 1: Sample the target function      (Layer 4 - data)
//   Step 2: Split train/validation 80/20    (Layer 4 - data)
//   Step 3: Save config for reloading       (Layer 6 - infra)
//   Step 4: Build the LBDN or PLNet         (Layer 5 - ml)
//   Step 5: Run the training loop           (Layer 5 - ml)
//   Step 6: Audit the certificate           (Layer 5 - ml)
//
// For an LBDN the audit compares an empirical Lipschitz
// estimate on the validation inputs against γ. For a PLNet it
// locates the unique global minimiser by inverting the
// bi-Lipschitz map.

use anyhow::{ensure, Context, Result};
use burn::{module::AutodiffModule, prelude::*};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{RegressionDataset, RegressionSample},
    splitter::split_train_val,
    synthetic::sample_regression,
};
use crate::domain::{
    activation::ActivationKind,
    task::{StaticModelKind, TargetFunction},
    traits::LipschitzCertified,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    backend::{default_device, InnerBackend, TrainBackend},
    bilipschitz::BiLipNetConfig,
    lbdn::LbdnConfig,
    lipschitz::{estimate_lipschitz, within_bound},
    plnet::PlNetConfig,
    trainer::{fit_static, TrainingConfig, TrainingSummary},
};

/// Perturbation rounds used when auditing a fitted LBDN.
pub const AUDIT_ROUNDS: usize = 50;
/// Std of the audit perturbations.
pub const AUDIT_RADIUS: f64 = 0.05;

// ─── Fit Configuration ───────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub target: TargetFunction,
    pub model: StaticModelKind,
    pub checkpoint_dir: String,
    pub samples: usize,
    /// Std of Gaussian label noise
    pub noise: f64,
    /// LBDN hidden widths; the first entry is the BiLipNet width
    pub hidden: Vec<usize>,
    pub gamma: f64,
    pub mu: f64,
    pub nu: f64,
    pub depth: usize,
    pub activation: ActivationKind,
    pub training: TrainingConfig,
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            target: TargetFunction::Sine,
            model: StaticModelKind::Lbdn,
            checkpoint_dir: "checkpoints/fit".to_string(),
            samples: 2000,
            noise: 0.0,
            hidden: vec![64, 64],
            gamma: 5.0,
            mu: 0.1,
            nu: 10.0,
            depth: 2,
            activation: ActivationKind::Relu,
            training: TrainingConfig::default(),
            seed: 0,
        }
    }
}

impl FitConfig {
    pub fn lbdn_config(&self) -> LbdnConfig {
        LbdnConfig::new(self.target.input_dim(), self.hidden.clone(), 1)
            .with_gamma(self.gamma)
            .with_activation(self.activation)
            .with_seed(self.seed)
    }

    pub fn plnet_config(&self) -> PlNetConfig {
        let width = self.hidden.first().copied().unwrap_or(16);
        PlNetConfig::new(
            BiLipNetConfig::new(self.target.input_dim())
                .with_hidden(width)
                .with_depth(self.depth)
                .with_mu(self.mu)
                .with_nu(self.nu)
                .with_activation(self.activation)
                .with_seed(self.seed),
        )
    }
}

/// Outcome of a fit, for the CLI to print.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub summary: TrainingSummary,
    pub certificate: Certificate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Certificate {
    Lipschitz { bound: f64, estimate: f64 },
    PolyakLojasiewicz { constant: f64, minimizer: Vec<f32>, converged: bool },
}

// ─── FitUseCase ──────────────────────────────────────────────────────────────
pub struct FitUseCase {
    config: FitConfig,
}

impl FitUseCase {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<FitReport> {
        let cfg = &self.config;
        ensure!(cfg.samples > 0, "samples must be positive");
        let device = default_device();

        // ── Steps 1-2: data ──────────────────────────────────────────────────
        tracing::info!("Sampling {} points of '{}'", cfg.samples, cfg.target);
        let samples = sample_regression(cfg.target, cfg.samples, cfg.noise, cfg.seed);
        let (train, val) = split_train_val(samples, 0.8, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());
        // Tiny sample counts can leave the validation set empty
        let audit_points = if val.is_empty() { &train } else { &val };
        let audit_inputs = inputs_tensor::<InnerBackend>(audit_points, cfg.target.input_dim(), &device);

        // ── Step 3: persist config ───────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        let (train, val) = (RegressionDataset::new(train), RegressionDataset::new(val));

        // ── Steps 4-6 ────────────────────────────────────────────────────────
        match cfg.model {
            StaticModelKind::Lbdn => {
                let model = cfg
                    .lbdn_config()
                    .init::<TrainBackend>(&device)
                    .context("Invalid LBDN configuration")?;
                let (model, summary) =
                    fit_static(model, train, val, &cfg.training, &checkpoints, &metrics, &device)?;

                let model = model.valid();
                let bound = model.lipschitz_bound();
                let estimate = estimate_lipschitz(&model, audit_inputs, AUDIT_ROUNDS, AUDIT_RADIUS, cfg.seed);
                if !within_bound(estimate, bound) {
                    tracing::warn!("Empirical slope {:.4} exceeds certificate {:.4}", estimate, bound);
                }
                Ok(FitReport { summary, certificate: Certificate::Lipschitz { bound, estimate } })
            }
            StaticModelKind::Plnet => {
                let model = cfg
                    .plnet_config()
                    .init::<TrainBackend>(&device)
                    .context("Invalid PLNet configuration")?;
                let (model, summary) =
                    fit_static(model, train, val, &cfg.training, &checkpoints, &metrics, &device)?;

                let model = model.valid();
                let (x_star, report) = model.global_minimizer(1000, 1e-5);
                let minimizer = x_star.into_data().iter::<f32>().collect();
                Ok(FitReport {
                    summary,
                    certificate: Certificate::PolyakLojasiewicz {
                        constant: model.pl_constant(),
                        minimizer,
                        converged: report.converged,
                    },
                })
            }
        }
    }
}

/// Stack sample inputs into a [count, width] tensor.
pub(crate) fn inputs_tensor<B: Backend>(
    samples: &[RegressionSample],
    width: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let flat: Vec<f32> = samples.iter().flat_map(|s| s.input.iter().copied()).collect();
    Tensor::from_data(TensorData::new(flat, [samples.len(), width]), device)
}
