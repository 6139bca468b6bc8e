// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from synthetic generation to tensor batches.
//
//   synthetic          → regression samples / PDE trajectories
//       │
//       ▼
//   split_train_val    → seeded 80/20 shuffle split
//       │
//       ▼
//   *Dataset           → implements Burn's Dataset trait
//       │
//       ▼
//   *Batcher           → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Regression targets and the reaction-diffusion simulator
pub mod synthetic;

/// Implements Burn's Dataset trait for both sample kinds
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
