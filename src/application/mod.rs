// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// experiment each.
//
// Rules for this layer:
//   - No model math here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

/// Fit an LBDN or PLNet to a synthetic target
pub mod fit_use_case;

/// Train a contracting observer for the reaction-diffusion PDE
pub mod observer_use_case;

/// Reload a fitted LBDN and audit its Lipschitz bound
pub mod lipschitz_use_case;
