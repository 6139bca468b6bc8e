// ============================================================
// Layer 2 - ObserverUseCase
// ============================================================
// Learns a state observer for the reaction-diffusion PDE:
// a recurrent model that reconstructs the full grid state
// from three measured sites.
//
//   Step 1: Simulate a long training trajectory   (Layer 4)
//   Step 2: Build (x_t, y_t) → x_{t+1} pairs      (Layer 4)
//   Step 3: Split train/validation                (Layer 4)
//   Step 4: Build a contracting REN / R2DN        (Layer 5)
//           with y = x, so the state IS the estimate
//   Step 5: Train one step ahead                  (Layer 5)
//   Step 6: Run the observer from x̂₀ = 0 on a
//           fresh trajectory, report the NRMSE    (Layer 5)
//   Step 7: Write results.json with the true and
//           estimated trajectories               (Layer 6)
//
// Why contraction matters here: the observer is trained from
// TRUE states, but deployed from a wrong initial guess. A
// contracting model forgets its initial state, so x̂ converges
// to the trajectory the measurements are consistent with.

use anyhow::{ensure, Context, Result};
use burn::{module::AutodiffModule, prelude::*};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TransitionDataset,
    splitter::split_train_val,
    synthetic::{ReactionDiffusion, Trajectory, MEASUREMENTS},
};
use crate::domain::{
    activation::ActivationKind,
    task::{InitMethod, RecurrentModelKind},
    traits::ContractionCertified,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    backend::{default_device, InnerBackend, TrainBackend},
    r2dn::R2dnConfig,
    recurrent::StateSpaceModel,
    ren::RenConfig,
    trainer::{fit_observer, TrainingConfig, TrainingSummary},
};

// ─── Observer Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub model: RecurrentModelKind,
    pub checkpoint_dir: String,
    /// PDE grid points, also the observer state size
    pub sites: usize,
    pub neurons: usize,
    /// R2DN feedback network widths
    pub hidden: Vec<usize>,
    pub hold: usize,
    pub time_steps: usize,
    pub validation_steps: usize,
    pub activation: ActivationKind,
    pub init_method: InitMethod,
    pub polar: bool,
    /// None keeps each model's default rate
    pub contraction_rate: Option<f64>,
    pub training: TrainingConfig,
    pub seed: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            model: RecurrentModelKind::ContractingRen,
            checkpoint_dir: "checkpoints/observer".to_string(),
            sites: 51,
            neurons: 200,
            hidden: vec![64, 64],
            hold: 50,
            time_steps: 100_000,
            validation_steps: 2000,
            activation: ActivationKind::Relu,
            init_method: InitMethod::LongMemory,
            polar: true,
            contraction_rate: None,
            training: TrainingConfig {
                epochs: 200,
                batch_size: 500,
                learning_rate: 2e-3,
                min_lr: 1e-6,
                lr_patience: 10,
                seed: 0,
            },
            seed: 0,
        }
    }
}

impl ObserverConfig {
    pub fn ren_config(&self) -> RenConfig {
        let cfg = RenConfig::new(MEASUREMENTS, self.sites, self.neurons, self.sites)
            .with_activation(self.activation)
            .with_init_method(self.init_method)
            .with_polar(self.polar)
            .with_identity_output(true)
            .with_seed(self.seed);
        match self.contraction_rate {
            Some(rate) => cfg.with_contraction_rate(rate),
            None => cfg,
        }
    }

    pub fn r2dn_config(&self) -> R2dnConfig {
        let cfg = R2dnConfig::new(MEASUREMENTS, self.sites, self.neurons, self.sites)
            .with_hidden(self.hidden.clone())
            .with_activation(self.activation)
            .with_identity_output(true)
            .with_seed(self.seed);
        match self.contraction_rate {
            Some(rate) => cfg.with_contraction_rate(rate),
            None => cfg,
        }
    }
}

/// Everything needed to evaluate a run later without retraining.
/// Written to `<checkpoint_dir>/results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverResults {
    pub model: RecurrentModelKind,
    pub nrmse: f64,
    pub num_params: usize,
    pub mean_train_loss: f64,
    /// Wall-clock seconds per training epoch
    pub epoch_times: Vec<f64>,
    /// [step][site] states of the validation trajectory
    pub true_states: Vec<Vec<f32>>,
    /// [step][site] observer estimates from x̂₀ = 0
    pub pred_states: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct ObserverReport {
    pub summary: TrainingSummary,
    /// ‖x - x̂‖ / ‖x‖ over the whole validation trajectory
    pub nrmse: f64,
    pub num_params: usize,
}

// ─── ObserverUseCase ─────────────────────────────────────────────────────────
pub struct ObserverUseCase {
    config: ObserverConfig,
}

impl ObserverUseCase {
    pub fn new(config: ObserverConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ObserverReport> {
        let cfg = &self.config;
        ensure!(cfg.time_steps > 1, "time_steps must be at least 2");
        ensure!(cfg.validation_steps > 0, "validation_steps must be positive");
        let device = default_device();

        // ── Steps 1-3: data ──────────────────────────────────────────────────
        let pde = ReactionDiffusion::new(cfg.sites, cfg.hold).context("Invalid PDE grid")?;
        tracing::info!(
            "Simulating {} PDE steps on {} sites (dt={:.2e})",
            cfg.time_steps,
            cfg.sites,
            pde.dt()
        );
        let samples = pde.simulate(cfg.time_steps, cfg.seed).transitions(&pde);
        let (train, val) = split_train_val(samples, 0.8, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());
        let (train, val) = (TransitionDataset::new(train), TransitionDataset::new(val));

        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // Held-out trajectory with its own seed
        let fresh = pde.simulate(cfg.validation_steps, cfg.seed.wrapping_add(1));

        // ── Steps 4-6 ────────────────────────────────────────────────────────
        let (summary, num_params, estimates) = match cfg.model {
            RecurrentModelKind::ContractingRen => {
                let model = cfg
                    .ren_config()
                    .init::<TrainBackend>(&device)
                    .context("Invalid REN configuration")?;
                let num_params = model.num_params();
                tracing::info!("Certified contraction rate {}", model.contraction_rate());
                let (model, summary) =
                    fit_observer(model, train, val, &cfg.training, &checkpoints, &metrics, &device)?;
                (summary, num_params, run_observer(&model.valid(), &pde, &fresh, &device))
            }
            RecurrentModelKind::R2dn => {
                let model = cfg
                    .r2dn_config()
                    .init::<TrainBackend>(&device)
                    .context("Invalid R2DN configuration")?;
                let num_params = model.num_params();
                tracing::info!("Certified contraction rate {}", model.contraction_rate());
                let (model, summary) =
                    fit_observer(model, train, val, &cfg.training, &checkpoints, &metrics, &device)?;
                (summary, num_params, run_observer(&model.valid(), &pde, &fresh, &device))
            }
        };

        let truth = fresh.current_states();
        let nrmse = nrmse(&truth, &estimates);
        tracing::info!("Observer NRMSE over {} steps: {:.4}", fresh.steps(), nrmse);

        // ── Step 7: persist ──────────────────────────────────────────────────
        checkpoints.save_results(&ObserverResults {
            model: cfg.model,
            nrmse,
            num_params,
            mean_train_loss: summary.mean_train_loss(),
            epoch_times: summary.epoch_times(),
            true_states: rows(&truth, cfg.sites),
            pred_states: rows(&estimates, cfg.sites),
        })?;

        Ok(ObserverReport { summary, nrmse, num_params })
    }
}

fn rows(flat: &[f32], width: usize) -> Vec<Vec<f32>> {
    flat.chunks(width).map(<[f32]>::to_vec).collect()
}

/// Feed the measurements of `traj` to the observer from a zero
/// initial state and return its flattened [step, site] estimates.
fn run_observer<M: StateSpaceModel<InnerBackend>>(
    model: &M,
    pde: &ReactionDiffusion,
    traj: &Trajectory,
    device: &<InnerBackend as Backend>::Device,
) -> Vec<f32> {
    let measurements = Tensor::<InnerBackend, 3>::from_data(
        TensorData::new(traj.measurements(pde), [1, traj.steps(), MEASUREMENTS]),
        device,
    );
    let x0 = model.init_state(1, device);
    let (_, estimates) = model.simulate(x0, measurements);
    estimates.into_data().iter::<f32>().collect()
}

/// ‖truth - estimate‖ / ‖truth‖; zero truth gives the raw error norm.
pub fn nrmse(truth: &[f32], estimate: &[f32]) -> f64 {
    let (mut err, mut norm) = (0.0f64, 0.0f64);
    for (t, e) in truth.iter().zip(estimate) {
        err += ((t - e) as f64).powi(2);
        norm += (*t as f64).powi(2);
    }
    if norm > 0.0 { (err / norm).sqrt() } else { err.sqrt() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nrmse() {
        assert_eq!(nrmse(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        let v = nrmse(&[3.0, 4.0], &[0.0, 0.0]);
        assert!((v - 1.0).abs() < 1e-12);
        assert_eq!(nrmse(&[0.0], &[0.5]), 0.5);
    }

    #[test]
    fn test_small_observer_run() {
        let dir = tempfile::tempdir().unwrap();
        for model in [RecurrentModelKind::ContractingRen, RecurrentModelKind::R2dn] {
            let cfg = ObserverConfig {
                model,
                checkpoint_dir: dir.path().join(model.to_string()).to_string_lossy().into_owned(),
                sites: 9,
                neurons: 8,
                hidden: vec![8],
                hold: 10,
                time_steps: 200,
                validation_steps: 50,
                training: TrainingConfig { epochs: 2, batch_size: 40, ..TrainingConfig::default() },
                ..ObserverConfig::default()
            };
            let report = ObserverUseCase::new(cfg).execute().unwrap();
            assert_eq!(report.summary.history.len(), 2);
            assert!(report.nrmse.is_finite());
            assert!(report.num_params > 0);
        }
    }

    #[test]
    fn test_results_are_saved_for_later_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ObserverConfig {
            checkpoint_dir: dir.path().to_string_lossy().into_owned(),
            sites: 7,
            neurons: 6,
            hold: 10,
            time_steps: 120,
            validation_steps: 30,
            training: TrainingConfig { epochs: 2, batch_size: 32, ..TrainingConfig::default() },
            ..ObserverConfig::default()
        };
        let report = ObserverUseCase::new(cfg).execute().unwrap();

        let results: ObserverResults = CheckpointManager::new(dir.path()).unwrap().load_results().unwrap();
        assert_eq!(results.model, RecurrentModelKind::ContractingRen);
        assert_eq!(results.nrmse, report.nrmse);
        assert_eq!(results.num_params, report.num_params);
        assert_eq!(results.epoch_times.len(), 2);
        assert_eq!(results.true_states.len(), 30);
        assert_eq!(results.pred_states.len(), 30);
        assert!(results.pred_states.iter().all(|row| row.len() == 7));
        // x̂₀ = 0
        assert!(results.pred_states[0].iter().all(|v| *v == 0.0));
        let flat = |m: &Vec<Vec<f32>>| m.iter().flatten().copied().collect::<Vec<_>>();
        assert!((nrmse(&flat(&results.true_states), &flat(&results.pred_states)) - results.nrmse).abs() < 1e-12);
    }

    #[test]
    fn test_empty_validation_trajectory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ObserverConfig {
            checkpoint_dir: dir.path().to_string_lossy().into_owned(),
            validation_steps: 0,
            ..ObserverConfig::default()
        };
        let err = ObserverUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("validation_steps"), "{err}");
    }
}
