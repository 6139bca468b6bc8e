// ============================================================
// Layer 2 - LipschitzCheckUseCase
// ============================================================
// Reloads a fitted LBDN and audits its certificate:
//
//   Step 1: Read the saved FitConfig      (Layer 6 - infra)
//   Step 2: Rebuild the architecture      (Layer 5 - ml)
//   Step 3: Load the best weights         (Layer 6 - infra)
//   Step 4: Estimate the slope on fresh
//           points of the target domain   (Layer 5 - ml)
//
// The explicit weights are recomputed from the loaded direct
// parameters, so the certificate survives the round trip.

use anyhow::{bail, ensure, Context, Result};

use crate::application::fit_use_case::{inputs_tensor, FitConfig};
use crate::data::synthetic::sample_regression;
use crate::domain::{task::StaticModelKind, traits::LipschitzCertified};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{default_device, InnerBackend},
    lipschitz::{estimate_lipschitz, within_bound},
};

#[derive(Debug, Clone, PartialEq)]
pub struct LipschitzReport {
    pub bound: f64,
    pub estimate: f64,
    pub within_bound: bool,
}

pub struct LipschitzCheckUseCase {
    checkpoint_dir: String,
    samples: usize,
    rounds: usize,
    radius: f64,
    seed: u64,
}

impl LipschitzCheckUseCase {
    pub fn new(checkpoint_dir: String, samples: usize, rounds: usize, radius: f64, seed: u64) -> Self {
        Self { checkpoint_dir, samples, rounds, radius, seed }
    }

    pub fn execute(&self) -> Result<LipschitzReport> {
        ensure!(self.samples > 0, "need at least one audit point");
        let device = default_device();
        let checkpoints = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg: FitConfig = checkpoints
            .load_config()
            .context("Cannot read the fit config. Run 'fit' first.")?;

        if cfg.model != StaticModelKind::Lbdn {
            bail!("'{}' models carry no Lipschitz certificate; only lbdn can be checked", cfg.model);
        }

        let model = cfg
            .lbdn_config()
            .init::<InnerBackend>(&device)
            .context("Saved LBDN configuration is invalid")?;
        let model = checkpoints.load_model(model, &device)?;

        let points = sample_regression(cfg.target, self.samples, 0.0, self.seed);
        let inputs = inputs_tensor::<InnerBackend>(&points, cfg.target.input_dim(), &device);
        let estimate = estimate_lipschitz(&model, inputs, self.rounds, self.radius, self.seed);
        let bound = model.lipschitz_bound();

        Ok(LipschitzReport { bound, estimate, within_bound: within_bound(estimate, bound) })
    }
}
