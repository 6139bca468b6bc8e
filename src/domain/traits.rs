// ============================================================
// Layer 3 - Certification Traits
// ============================================================
// The guarantee a model carries is part of its type, not
// something measured after training. These traits let the
// application layer ask a model what it promises without
// knowing which architecture it is.

/// A model whose Lipschitz constant is bounded by construction.
pub trait LipschitzCertified {
    /// Certified upper bound γ on the Lipschitz constant.
    fn lipschitz_bound(&self) -> f64;
}

/// A model whose inverse exists and is Lipschitz as well.
pub trait BiLipschitzCertified {
    /// Certified (lower, upper) sensitivity bounds.
    fn bilipschitz_bounds(&self) -> (f64, f64);
}

/// A state-space model whose trajectories forget their initial state.
pub trait ContractionCertified {
    /// Certified exponential contraction rate in (0, 1].
    fn contraction_rate(&self) -> f64;
}
