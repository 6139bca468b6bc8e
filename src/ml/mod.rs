// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn-specific numerical code.
//
// Every model follows the same two-stage pattern:
//
//   direct parameters  ──to_explicit()──▶  explicit model
//   (unconstrained,                        (constrained matrices,
//    what Adam updates)                     what forward() runs)
//
// The map from direct to explicit is built so that EVERY
// parameter value yields a model satisfying its guarantee.
// Training therefore needs no projections or penalties.
//
// What's in this layer:
//
//   linalg.rs      - Cayley transform, linear solves, masks
//   init.rs        - Seeded parameter initialisation
//   activation.rs  - Slope-restricted activations
//
//   sandwich.rs    - 1-Lipschitz sandwich layer
//   lbdn.rs        - γ-Lipschitz deep network
//   monotone.rs    - Monotone bi-Lipschitz layer (+ inverse)
//   bilipschitz.rs - BiLipNet: orthogonal ∘ monotone stacks
//   plnet.rs       - PLNet: ½‖g(x) - c‖² with a unique minimum
//
//   recurrent.rs   - State-space interface and time rollout
//   ren.rs         - Contracting recurrent equilibrium network
//   r2dn.rs        - LBDN in feedback with a contracting system
//
//   model.rs       - Training objectives for both families
//   lipschitz.rs   - Empirical Lipschitz lower bound
//   scheduler.rs   - Plateau learning-rate decay
//   trainer.rs     - The training loop
//   backend.rs     - NdArray / Wgpu backend selection
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Wang & Manchester (2023) Direct Parameterization of
//            Lipschitz-Bounded Deep Networks, ICML

pub mod linalg;
pub mod init;
pub mod activation;

/// 1-Lipschitz building block
pub mod sandwich;
/// Lipschitz-bounded deep network
pub mod lbdn;
pub mod monotone;
pub mod bilipschitz;
pub mod plnet;

pub mod recurrent;
/// Contracting REN
pub mod ren;
pub mod r2dn;

pub mod model;
pub mod lipschitz;
pub mod scheduler;
/// Full training loop with validation and checkpointing
pub mod trainer;
pub mod backend;

#[cfg(test)]
pub(crate) mod testing;
