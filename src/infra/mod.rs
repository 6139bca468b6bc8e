// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training loop and the
// use cases:
//
//   checkpoint.rs - Saving and loading model weights
//                   Uses Burn's CompactRecorder for the direct
//                   parameters, plus JSON for the run config so
//                   a model can be rebuilt before loading.
//
//   metrics.rs    - Per-epoch loss and learning-rate log (CSV)
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
