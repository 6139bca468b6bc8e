// ============================================================
// Layer 5 - Monotone Lipschitz Layer
// ============================================================
// A square layer that is both strongly monotone and Lipschitz:
//
//   f(x) = μ x + s · Wᵀ σ( s · W x + b ),   s = √(ν - μ)
//
// with ‖W‖ <= 1 (W is the lower block of a Cayley transform) and
// σ slope-restricted on [0, 1]. The Jacobian
//
//   J = μ I + s² Wᵀ diag(σ') W
//
// is symmetric with every eigenvalue in [μ, ν]. So:
//   ⟨f(x) - f(y), x - y⟩ >= μ ‖x - y‖²   (strong monotonicity)
//   ‖f(x) - f(y)‖        <= ν ‖x - y‖    (Lipschitz)
//
// Strong monotonicity makes f invertible; the inverse is found
// by the damped fixed-point iteration
//
//   x ← x - α (f(x) - y),   α = 2 / (μ + ν)
//
// which contracts with rate (ν - μ) / (ν + μ) < 1.
//
// Reference: Wang & Manchester (2024) Monotone, Bi-Lipschitz, and
//            Polyak-Łojasiewicz Networks, ICML

use burn::{module::Param, nn::activation::Activation, prelude::*};

use crate::domain::{
    activation::ActivationKind,
    bounds::{require_positive, BiLipschitzBounds},
    error::ModelError,
    traits::BiLipschitzCertified,
};
use crate::ml::{
    activation::build_activation,
    init::{zeros_param, ParamInit},
    linalg::{cayley, frobenius_norm, rescale_to_norm, to_host},
};

#[derive(Config, Debug)]
pub struct MonotoneConfig {
    pub features: usize,
    pub hidden: usize,
    #[config(default = 0.5)]
    pub mu: f64,
    #[config(default = 2.0)]
    pub nu: f64,
    #[config(default = "ActivationKind::Relu")]
    pub activation: ActivationKind,
    #[config(default = 0)]
    pub seed: u64,
}

impl MonotoneConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MonotoneLayer<B>, ModelError> {
        self.init_with(&mut ParamInit::new(self.seed), device)
    }

    pub fn init_with<B: Backend>(
        &self,
        rng: &mut ParamInit,
        device: &B::Device,
    ) -> Result<MonotoneLayer<B>, ModelError> {
        let bounds = BiLipschitzBounds::new(self.mu, self.nu)?;
        require_positive("monotone features", self.features)?;
        require_positive("monotone hidden", self.hidden)?;

        let xy = rng.glorot_normal::<B>(self.features + self.hidden, self.features, device);
        let alpha = Param::from_tensor(frobenius_norm(xy.clone()));

        Ok(MonotoneLayer {
            xy: Param::from_tensor(xy),
            alpha,
            bias: zeros_param(self.hidden, device),
            activation: build_activation(self.activation, device),
            mu: bounds.lower(),
            nu: bounds.upper(),
            hidden: self.hidden,
        })
    }
}

#[derive(Module, Debug)]
pub struct MonotoneLayer<B: Backend> {
    pub xy: Param<Tensor<B, 2>>,
    pub alpha: Param<Tensor<B, 1>>,
    pub bias: Param<Tensor<B, 1>>,
    pub activation: Activation<B>,
    pub mu: f64,
    pub nu: f64,
    pub hidden: usize,
}

/// Outcome of an iterative inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseReport {
    pub iterations: usize,
    /// Largest row-wise ‖f(x) - y‖ at exit
    pub residual: f64,
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct ExplicitMonotone<B: Backend> {
    /// s · W, shape [hidden, features]
    weight: Tensor<B, 2>,
    bias: Tensor<B, 2>,
    activation: Activation<B>,
    mu: f64,
    nu: f64,
}

impl<B: Backend> MonotoneLayer<B> {
    pub fn to_explicit(&self) -> ExplicitMonotone<B> {
        let xy = rescale_to_norm(self.xy.val(), self.alpha.val());
        let (_, w) = cayley(xy);
        let scale = (self.nu - self.mu).sqrt();
        ExplicitMonotone {
            weight: w.mul_scalar(scale),
            bias: self.bias.val().reshape([1, self.hidden]),
            activation: self.activation.clone(),
            mu: self.mu,
            nu: self.nu,
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.to_explicit().forward(x)
    }

    pub fn inverse(&self, y: Tensor<B, 2>, max_iters: usize, tol: f64) -> (Tensor<B, 2>, InverseReport) {
        self.to_explicit().inverse(y, max_iters, tol)
    }
}

impl<B: Backend> ExplicitMonotone<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let pre = x.clone().matmul(self.weight.clone().transpose()) + self.bias.clone();
        let h = self.activation.forward(pre);
        x.mul_scalar(self.mu) + h.matmul(self.weight.clone())
    }

    pub fn inverse(&self, y: Tensor<B, 2>, max_iters: usize, tol: f64) -> (Tensor<B, 2>, InverseReport) {
        // Same step as BiLipschitzBounds::inverse_step
        let step = 2.0 / (self.mu + self.nu);
        let mut x = y.clone().mul_scalar(step);
        let mut report = InverseReport { iterations: 0, residual: f64::INFINITY, converged: false };

        for k in 1..=max_iters {
            let r = self.forward(x.clone()) - y.clone();
            report.iterations = k;
            report.residual = max_row_norm(r.clone());
            if report.residual <= tol {
                report.converged = true;
                break;
            }
            x = x - r.mul_scalar(step);
        }
        (x, report)
    }
}

impl<B: Backend> BiLipschitzCertified for MonotoneLayer<B> {
    fn bilipschitz_bounds(&self) -> (f64, f64) {
        (self.mu, self.nu)
    }
}

/// Largest Euclidean row norm of a [batch, n] tensor, on the host.
pub(crate) fn max_row_norm<B: Backend>(r: Tensor<B, 2>) -> f64 {
    let norms = to_host(r.powf_scalar(2.0).sum_dim(1).sqrt());
    norms.into_iter().fold(0.0f64, |acc, v| acc.max(v as f64))
}
