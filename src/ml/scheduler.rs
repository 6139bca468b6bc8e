// ============================================================
// Layer 5 - Plateau Learning-Rate Scheduler
// ============================================================
// Lowers the learning rate when the validation loss stops
// improving:
//
//   after `patience` epochs without a new best:
//     lr ← max(lr · factor, min_lr)
//
// The waiting counter restarts after every reduction, so the
// rate drops at most once per `patience` epochs.

/// Default multiplicative decay applied on a plateau.
pub const DEFAULT_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct PlateauScheduler {
    lr: f64,
    factor: f64,
    patience: usize,
    min_lr: f64,
    best: f64,
    wait: usize,
}

impl PlateauScheduler {
    pub fn new(initial_lr: f64, patience: usize, min_lr: f64) -> Self {
        Self {
            lr: initial_lr,
            factor: DEFAULT_FACTOR,
            patience: patience.max(1),
            min_lr: min_lr.min(initial_lr),
            best: f64::INFINITY,
            wait: 0,
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Learning rate for the next epoch.
    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Feed one validation loss; returns the updated rate.
    /// A NaN loss counts as no improvement.
    pub fn step(&mut self, val_loss: f64) -> f64 {
        if val_loss < self.best {
            self.best = val_loss;
            self.wait = 0;
            return self.lr;
        }

        self.wait += 1;
        if self.wait >= self.patience && self.lr > self.min_lr {
            let next = (self.lr * self.factor).max(self.min_lr);
            tracing::info!("Validation loss plateaued, learning rate {:.2e} → {:.2e}", self.lr, next);
            self.lr = next;
            self.wait = 0;
        }
        self.lr
    }
}
