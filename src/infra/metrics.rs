// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number (1, 2, 3, ...)
//   - train_loss:    mean-squared error averaged over training batches
//   - val_loss:      mean-squared error on the validation set
//   - learning_rate: the rate used for this epoch (the plateau
//                    scheduler may lower it between epochs)
//   - epoch_secs:    wall-clock seconds spent on the epoch
//
// Output file: <checkpoint dir>/metrics.csv
//
//   epoch,train_loss,val_loss,learning_rate,epoch_secs
//   1,4.125000e-1,3.892000e-1,1e-3,2.104
//   2,1.901000e-2,2.043000e-2,1e-4,1.987
//
// Losses on a contracting observer span several decades, so
// every float column is written in scientific notation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,val_loss,learning_rate,epoch_secs";

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub learning_rate: f64,
    pub epoch_secs: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, learning_rate: f64, epoch_secs: f64) -> Self {
        Self { epoch, train_loss, val_loss, learning_rate, epoch_secs }
    }

    /// A NaN validation loss never improves.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{},{:.6e},{:.6e},{:e},{:.3}",
            self.epoch, self.train_loss, self.val_loss, self.learning_rate, self.epoch_secs
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
#[derive(Debug)]
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger, writing the CSV header if the file is new.
    /// An existing file is appended to, so reruns extend the log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.to_csv_row())?;
        tracing::debug!(epoch = m.epoch, path = %self.csv_path.display(), "logged metrics row");
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 1e-3, 0.5);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(!EpochMetrics::new(3, 1.0, f64::NAN, 1e-3, 0.5).is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.6, 1e-3, 1.25)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.25, 0.3, 1e-4, 0.75)).unwrap();

        // A second logger on the same dir must not rewrite the header
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&EpochMetrics::new(3, 0.1, 0.2, 1e-4, 0.5)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[2], "2,2.500000e-1,3.000000e-1,1e-4,0.750");
    }
}
