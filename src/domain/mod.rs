// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Pure Rust types that describe WHAT a robust model is,
// independent of how the tensors are computed.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, traits and validation
//
// The ml layer (Layer 5) turns these descriptions into
// Burn modules; the application layer reads them from
// the CLI and from saved JSON configs.

// Slope-restricted activation functions
pub mod activation;

// Lipschitz, bi-Lipschitz and contraction bounds
pub mod bounds;

// Invalid-configuration errors raised when building models
pub mod error;

// Regression targets and recurrent model choices
pub mod task;

// Certification traits implemented by the models
pub mod traits;
