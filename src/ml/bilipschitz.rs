// ============================================================
// Layer 5 - Bi-Lipschitz Network (BiLipNet)
// ============================================================
// An invertible network with certified lower AND upper
// sensitivity bounds:
//
//   μ ‖x - y‖ <= ‖f(x) - f(y)‖ <= ν ‖x - y‖
//
// Built by alternating orthogonal layers (which preserve
// distances exactly) with monotone Lipschitz layers:
//
//   f = Q_d ∘ M_d ∘ Q_{d-1} ∘ ... ∘ M_1 ∘ Q_0
//
// Bounds multiply under composition, so each of the d monotone
// layers is given (μ^{1/d}, ν^{1/d}).
//
// The inverse runs the layers backwards: orthogonal layers
// invert in closed form, monotone layers by fixed-point
// iteration (see monotone.rs).

use burn::{module::Param, prelude::*};

use crate::domain::{
    activation::ActivationKind,
    bounds::{require_positive, BiLipschitzBounds},
    error::ModelError,
    traits::BiLipschitzCertified,
};
use crate::ml::{
    init::{zeros_param, ParamInit},
    linalg::cayley_orthogonal,
    monotone::{ExplicitMonotone, InverseReport, MonotoneConfig, MonotoneLayer},
};

// ─── OrthogonalLayer ─────────────────────────────────────────────────────────
/// y = x Qᵀ + b with Q = cayley(X) orthogonal.
#[derive(Module, Debug)]
pub struct OrthogonalLayer<B: Backend> {
    pub weight: Param<Tensor<B, 2>>,
    pub bias: Param<Tensor<B, 1>>,
    pub features: usize,
}

#[derive(Debug, Clone)]
pub struct ExplicitOrthogonal<B: Backend> {
    q: Tensor<B, 2>,
    bias: Tensor<B, 2>,
}

impl<B: Backend> OrthogonalLayer<B> {
    pub fn new(features: usize, rng: &mut ParamInit, device: &B::Device) -> Self {
        Self {
            weight: rng.glorot_param(features, features, device),
            bias: zeros_param(features, device),
            features,
        }
    }

    pub fn to_explicit(&self) -> ExplicitOrthogonal<B> {
        ExplicitOrthogonal {
            q: cayley_orthogonal(self.weight.val()),
            bias: self.bias.val().reshape([1, self.features]),
        }
    }
}

impl<B: Backend> ExplicitOrthogonal<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        x.matmul(self.q.clone().transpose()) + self.bias.clone()
    }

    pub fn inverse(&self, y: Tensor<B, 2>) -> Tensor<B, 2> {
        (y - self.bias.clone()).matmul(self.q.clone())
    }
}

// ─── BiLipNet ────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BiLipNetConfig {
    pub features: usize,
    #[config(default = 16)]
    pub hidden: usize,
    #[config(default = 2)]
    pub depth: usize,
    #[config(default = 0.1)]
    pub mu: f64,
    #[config(default = 10.0)]
    pub nu: f64,
    #[config(default = "ActivationKind::Relu")]
    pub activation: ActivationKind,
    #[config(default = 0)]
    pub seed: u64,
}

impl BiLipNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BiLipNet<B>, ModelError> {
        self.init_with(&mut ParamInit::new(self.seed), device)
    }

    pub fn init_with<B: Backend>(
        &self,
        rng: &mut ParamInit,
        device: &B::Device,
    ) -> Result<BiLipNet<B>, ModelError> {
        require_positive("bilipnet features", self.features)?;
        let bounds = BiLipschitzBounds::new(self.mu, self.nu)?;
        let per_layer = bounds.split(self.depth)?;

        let mut orthogonals = Vec::with_capacity(self.depth + 1);
        let mut monotones = Vec::with_capacity(self.depth);
        for _ in 0..self.depth {
            orthogonals.push(OrthogonalLayer::new(self.features, rng, device));
            let layer = MonotoneConfig::new(self.features, self.hidden)
                .with_mu(per_layer.lower())
                .with_nu(per_layer.upper())
                .with_activation(self.activation)
                .init_with(rng, device)?;
            monotones.push(layer);
        }
        orthogonals.push(OrthogonalLayer::new(self.features, rng, device));

        Ok(BiLipNet {
            orthogonals,
            monotones,
            mu: bounds.lower(),
            nu: bounds.upper(),
            features: self.features,
        })
    }
}

#[derive(Module, Debug)]
pub struct BiLipNet<B: Backend> {
    /// depth + 1 orthogonal layers, interleaved around the monotone ones
    pub orthogonals: Vec<OrthogonalLayer<B>>,
    pub monotones: Vec<MonotoneLayer<B>>,
    pub mu: f64,
    pub nu: f64,
    pub features: usize,
}

#[derive(Debug, Clone)]
pub struct ExplicitBiLipNet<B: Backend> {
    orthogonals: Vec<ExplicitOrthogonal<B>>,
    monotones: Vec<ExplicitMonotone<B>>,
}

impl<B: Backend> BiLipNet<B> {
    pub fn to_explicit(&self) -> ExplicitBiLipNet<B> {
        ExplicitBiLipNet {
            orthogonals: self.orthogonals.iter().map(OrthogonalLayer::to_explicit).collect(),
            monotones: self.monotones.iter().map(MonotoneLayer::to_explicit).collect(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.to_explicit().forward(x)
    }

    pub fn inverse(&self, y: Tensor<B, 2>, max_iters: usize, tol: f64) -> (Tensor<B, 2>, InverseReport) {
        self.to_explicit().inverse(y, max_iters, tol)
    }
}

impl<B: Backend> ExplicitBiLipNet<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = x;
        for (orth, mono) in self.orthogonals.iter().zip(&self.monotones) {
            x = mono.forward(orth.forward(x));
        }
        match self.orthogonals.last() {
            Some(last) => last.forward(x),
            None => x,
        }
    }

    /// Invert layer by layer. Each monotone layer is solved to `tol`;
    /// the report aggregates iterations and keeps the worst residual.
    pub fn inverse(&self, y: Tensor<B, 2>, max_iters: usize, tol: f64) -> (Tensor<B, 2>, InverseReport) {
        let mut total = InverseReport { iterations: 0, residual: 0.0, converged: true };
        let depth = self.monotones.len();

        let mut x = self.orthogonals[depth].inverse(y);
        for i in (0..depth).rev() {
            let (solved, report) = self.monotones[i].inverse(x, max_iters, tol);
            total.iterations += report.iterations;
            total.residual = total.residual.max(report.residual);
            total.converged &= report.converged;
            x = self.orthogonals[i].inverse(solved);
        }
        (x, total)
    }
}

impl<B: Backend> BiLipschitzCertified for BiLipNet<B> {
    fn bilipschitz_bounds(&self) -> (f64, f64) {
        (self.mu, self.nu)
    }
}
