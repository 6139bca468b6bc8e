// ============================================================
// Layer 5 - Polyak-Łojasiewicz Network (PLNet)
// ============================================================
// A scalar-valued network that is guaranteed to have a unique
// global minimum and no spurious stationary points:
//
//   V(x) = ½ ‖g(x) - c‖²
//
// where g is a BiLipNet with bounds (μ, ν) and c is a learned
// offset. Since g is invertible, V attains its minimum 0 at
// exactly one point x* = g⁻¹(c), and
//
//   ½ ‖∇V(x)‖² >= μ² · V(x)
//
// so gradient descent on V converges linearly from anywhere.

use burn::{module::Param, prelude::*};

use crate::domain::{error::ModelError, traits::BiLipschitzCertified};
use crate::ml::{
    bilipschitz::{BiLipNet, BiLipNetConfig},
    init::{zeros_param, ParamInit},
    monotone::InverseReport,
};

#[derive(Config, Debug)]
pub struct PlNetConfig {
    pub network: BiLipNetConfig,
}

impl PlNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<PlNet<B>, ModelError> {
        let mut rng = ParamInit::new(self.network.seed);
        let network = self.network.init_with(&mut rng, device)?;
        Ok(PlNet {
            offset: zeros_param(self.network.features, device),
            features: self.network.features,
            network,
        })
    }
}

#[derive(Module, Debug)]
pub struct PlNet<B: Backend> {
    pub network: BiLipNet<B>,
    pub offset: Param<Tensor<B, 1>>,
    pub features: usize,
}

impl<B: Backend> PlNet<B> {
    /// x: [batch, features] → V(x): [batch, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let c = self.offset.val().reshape([1, self.features]);
        let diff = self.network.forward(x) - c;
        diff.powf_scalar(2.0).sum_dim(1).mul_scalar(0.5)
    }

    /// The unique minimiser x* = g⁻¹(c), shape [1, features].
    pub fn global_minimizer(&self, max_iters: usize, tol: f64) -> (Tensor<B, 2>, InverseReport) {
        let c = self.offset.val().reshape([1, self.features]);
        self.network.inverse(c, max_iters, tol)
    }

    /// PL constant: ½‖∇V‖² >= pl_constant · V.
    pub fn pl_constant(&self) -> f64 {
        let (mu, _) = self.network.bilipschitz_bounds();
        mu * mu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        linalg::to_host,
        testing::{device, TestAutodiffBackend, TestBackend},
    };

    fn config() -> PlNetConfig {
        PlNetConfig::new(BiLipNetConfig::new(2).with_mu(0.5).with_nu(2.0).with_seed(6))
    }

    #[test]
    fn test_value_is_nonnegative_and_zero_at_minimizer() {
        let net = config().init::<TestBackend>(&device()).unwrap();
        let x: Tensor<TestBackend, 2> = ParamInit::new(2).normal([32, 2], 2.0, &device());
        assert!(to_host(net.forward(x)).iter().all(|v| *v >= 0.0));

        let (x_star, report) = net.global_minimizer(1000, 1e-5);
        assert!(report.converged);
        let v_star = to_host(net.forward(x_star))[0];
        assert!(v_star < 1e-6, "V(x*) = {v_star}");
    }

    #[test]
    fn test_pl_inequality_holds() {
        let net = config().init::<TestAutodiffBackend>(&device()).unwrap();
        let x = ParamInit::new(13)
            .normal::<TestAutodiffBackend, 2>([16, 2], 1.5, &device())
            .require_grad();
        let v = net.forward(x.clone());
        let values = to_host(v.clone().inner());
        let grads = v.sum().backward();
        let g = x.grad(&grads).expect("input gradient");
        let grad_sq = to_host(g.powf_scalar(2.0).sum_dim(1));
        for (gs, val) in grad_sq.iter().zip(&values) {
            assert!(0.5 * gs >= net.pl_constant() as f32 * val * (1.0 - 1e-3));
        }
    }
}
