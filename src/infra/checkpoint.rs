// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) - every direct parameter
//   2. latest_epoch.json            - which epoch was last saved
//   3. best_epoch.json              - epoch with the lowest val loss
//   4. config.json                  - the run configuration
//   5. results.json                 - evaluation output of a finished run
//
// Only the DIRECT parameters are stored. The explicit matrices
// (E⁻¹F, Λ⁻¹C1, ...) are recomputed from them on load, so a
// reloaded model carries the same certificate as the saved one.
//
// The config is needed to rebuild a model with the right
// architecture before the weights can be loaded into it.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json
//     best_epoch.json
//     config.json
//     results.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{prelude::*, record::CompactRecorder};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const LATEST_FILE: &str = "latest_epoch.json";
const BEST_FILE: &str = "best_epoch.json";
const CONFIG_FILE: &str = "config.json";
const RESULTS_FILE: &str = "results.json";

/// Manages saving and loading of model checkpoints.
/// All files are stored in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights for a given epoch and move the
    /// latest-epoch pointer to it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let path = self.model_path(epoch);
        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_epoch(LATEST_FILE, epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Record `epoch` as the best one seen so far.
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_epoch(BEST_FILE, epoch)
    }

    /// Load weights into `model`, preferring the best epoch and
    /// falling back to the latest one.
    ///
    /// `model` must have the architecture the checkpoint was saved
    /// with, or loading fails.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = match self.best_epoch()? {
            Some(epoch) => epoch,
            None => self.latest_epoch()?,
        };
        let path = self.model_path(epoch);
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has the model been fitted?", path.display())
            })
    }

    /// Save the run configuration as pretty JSON.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config<C: DeserializeOwned>(&self) -> Result<C> {
        self.read_json(CONFIG_FILE)
    }

    /// Save what a finished run measured, for later evaluation.
    pub fn save_results<R: Serialize>(&self, results: &R) -> Result<()> {
        self.write_json(RESULTS_FILE, results)
    }

    pub fn load_results<R: DeserializeOwned>(&self) -> Result<R> {
        self.read_json(RESULTS_FILE)
    }

    /// Epoch of the most recent checkpoint. Errors if none was saved.
    pub fn latest_epoch(&self) -> Result<usize> {
        self.read_epoch(LATEST_FILE)?
            .with_context(|| format!("No checkpoint found in '{}'", self.dir.display()))
    }

    pub fn best_epoch(&self) -> Result<Option<usize>> {
        self.read_epoch(BEST_FILE)
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        // The recorder appends its own extension
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }

    fn write_epoch(&self, file: &str, epoch: usize) -> Result<()> {
        let path = self.dir.join(file);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }

    fn read_epoch(&self, file: &str) -> Result<Option<usize>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str::<usize>(&s)?))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        lbdn::LbdnConfig,
        linalg::to_host,
        testing::{device, TestBackend},
    };

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let cfg = LbdnConfig::new(2, vec![4], 1).with_gamma(3.0);
        manager.save_config(&cfg).unwrap();
        let loaded: LbdnConfig = manager.load_config().unwrap();
        assert_eq!(loaded.gamma, 3.0);
        assert_eq!(loaded.hidden, vec![4]);
    }

    #[test]
    fn test_results_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert!(manager.load_results::<Vec<f64>>().is_err());
        manager.save_results(&vec![0.5f64, 0.25]).unwrap();
        assert_eq!(manager.load_results::<Vec<f64>>().unwrap(), vec![0.5, 0.25]);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert!(manager.latest_epoch().is_err());
        assert_eq!(manager.best_epoch().unwrap(), None);
    }

    #[test]
    fn test_weights_reload_into_fresh_model() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let saved = LbdnConfig::new(2, vec![4], 1).with_seed(1).init::<TestBackend>(&device()).unwrap();
        manager.save_model(&saved, 1).unwrap();
        manager.save_model(&saved, 2).unwrap();
        manager.mark_best(1).unwrap();
        assert_eq!(manager.latest_epoch().unwrap(), 2);

        let fresh = LbdnConfig::new(2, vec![4], 1).with_seed(99).init::<TestBackend>(&device()).unwrap();
        let loaded = manager.load_model(fresh, &device()).unwrap();

        let x = Tensor::<TestBackend, 2>::from_floats([[0.3, -1.2], [2.0, 0.5]], &device());
        assert_eq!(to_host(loaded.forward(x.clone())), to_host(saved.forward(x)));
    }
}
