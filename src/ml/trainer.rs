// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Mini-batch Adam on mean-squared error, with validation,
// plateau learning-rate decay, per-epoch checkpoints and a
// CSV metrics row per epoch.
//
// Two entry points share one loop:
//   fit_static    - LBDN / PLNet on (x, f(x)) pairs
//   fit_observer  - REN / R2DN on (x_t, y_t) → x_{t+1} transitions
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - the validation loader must produce InnerBackend batches
//
// The direct parameterisation means Adam updates are
// unconstrained: every point the optimiser visits is a model
// that still satisfies its certificate. No projection step.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Instant};

use crate::data::{
    batcher::{RegressionBatch, RegressionBatcher, TransitionBatch, TransitionBatcher},
    dataset::{RegressionDataset, TransitionDataset},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    model::{Objective, Regressor},
    recurrent::StateSpaceModel,
    scheduler::PlateauScheduler,
};

/// Optimisation hyperparameters shared by both training tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub min_lr: f64,
    /// Epochs without validation improvement before the rate drops
    pub lr_patience: usize,
    /// Seeds the loader shuffle
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 64,
            learning_rate: 1e-3,
            min_lr: 1e-6,
            lr_patience: 10,
            seed: 0,
        }
    }
}

/// What a finished run reports back to the use case.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub history: Vec<EpochMetrics>,
    pub best_epoch: usize,
    pub best_val_loss: f64,
}

impl TrainingSummary {
    pub fn final_train_loss(&self) -> f64 {
        self.history.last().map_or(f64::NAN, |m| m.train_loss)
    }

    /// Wall-clock seconds of every epoch, in order.
    pub fn epoch_times(&self) -> Vec<f64> {
        self.history.iter().map(|m| m.epoch_secs).collect()
    }

    pub fn mean_train_loss(&self) -> f64 {
        let n = self.history.len();
        mean(self.history.iter().map(|m| m.train_loss).sum(), n)
    }
}

/// Fit a static model on regression data.
pub fn fit_static<B, M>(
    model: M,
    train: RegressionDataset,
    val: RegressionDataset,
    cfg: &TrainingConfig,
    checkpoints: &CheckpointManager,
    metrics: &MetricsLogger,
    device: &B::Device,
) -> Result<(M, TrainingSummary)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Regressor<B>,
    M::InnerModule: Regressor<B::InnerBackend>,
{
    let train_loader: Arc<dyn DataLoader<B, RegressionBatch<B>>> =
        DataLoaderBuilder::new(RegressionBatcher)
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(1)
            .set_device(device.clone())
            .build(train);

    let val_loader: Arc<dyn DataLoader<B::InnerBackend, RegressionBatch<B::InnerBackend>>> =
        DataLoaderBuilder::new(RegressionBatcher)
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .set_device(device.clone())
            .build(val);

    train_loop(model, train_loader, val_loader, cfg, checkpoints, metrics)
}

/// Fit a recurrent model one step ahead on state transitions.
pub fn fit_observer<B, M>(
    model: M,
    train: TransitionDataset,
    val: TransitionDataset,
    cfg: &TrainingConfig,
    checkpoints: &CheckpointManager,
    metrics: &MetricsLogger,
    device: &B::Device,
) -> Result<(M, TrainingSummary)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + StateSpaceModel<B>,
    M::InnerModule: StateSpaceModel<B::InnerBackend>,
{
    let train_loader: Arc<dyn DataLoader<B, TransitionBatch<B>>> =
        DataLoaderBuilder::new(TransitionBatcher)
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(1)
            .set_device(device.clone())
            .build(train);

    let val_loader: Arc<dyn DataLoader<B::InnerBackend, TransitionBatch<B::InnerBackend>>> =
        DataLoaderBuilder::new(TransitionBatcher)
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .set_device(device.clone())
            .build(val);

    train_loop(model, train_loader, val_loader, cfg, checkpoints, metrics)
}

fn train_loop<B, M, T, V>(
    mut model: M,
    train_loader: Arc<dyn DataLoader<B, T>>,
    val_loader: Arc<dyn DataLoader<B::InnerBackend, V>>,
    cfg: &TrainingConfig,
    checkpoints: &CheckpointManager,
    metrics: &MetricsLogger,
) -> Result<(M, TrainingSummary)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Objective<B, T>,
    M::InnerModule: Objective<B::InnerBackend, V>,
{
    ensure!(cfg.epochs > 0, "epochs must be positive");
    ensure!(cfg.batch_size > 0, "batch_size must be positive");

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
    let mut scheduler = PlateauScheduler::new(cfg.learning_rate, cfg.lr_patience, cfg.min_lr);

    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch = 0;

    for epoch in 1..=cfg.epochs {
        let lr = scheduler.lr();
        let started = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches = 0usize;

        for batch in train_loader.iter() {
            let loss = model.batch_loss(batch);
            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }
        let train_loss = mean(train_loss_sum, train_batches);

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val_loss_sum = 0.0f64;
        let mut val_batches = 0usize;

        for batch in val_loader.iter() {
            val_loss_sum += model_valid.batch_loss(batch).into_scalar().elem::<f64>();
            val_batches += 1;
        }
        // Without a validation set the training loss drives the schedule
        let val_loss = if val_batches > 0 { mean(val_loss_sum, val_batches) } else { train_loss };

        let row = EpochMetrics::new(epoch, train_loss, val_loss, lr, started.elapsed().as_secs_f64());
        metrics.log(&row)?;
        checkpoints.save_model(&model, epoch)?;
        if row.is_improvement(best_val_loss) {
            best_val_loss = val_loss;
            best_epoch = epoch;
            checkpoints.mark_best(epoch)?;
        }
        scheduler.step(val_loss);

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6} | lr={:.1e}",
            epoch,
            cfg.epochs,
            train_loss,
            val_loss,
            lr,
        );
        history.push(row);
    }

    tracing::info!("Training complete, best epoch {} (val_loss={:.6})", best_epoch, best_val_loss);
    Ok((model, TrainingSummary { history, best_epoch, best_val_loss }))
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}
