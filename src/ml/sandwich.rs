// ============================================================
// Layer 5 - Sandwich Layer
// ============================================================
// A fully-connected layer that is 1-Lipschitz for ANY value of
// its parameters. The weight matrices are "sandwiched" around
// the activation:
//
//   h   = σ( √2 · Ψ⁻¹ B x + b )
//   out = √2 · Aᵀ Ψ h
//
// where Ψ = diag(exp(d)) is a free positive scaling, and
// [Aᵀ; Bᵀ] = cayley(α · XY / ‖XY‖) has orthonormal columns.
// σ must be slope-restricted on [0, 1].
//
// The last layer of a network drops the activation and the
// second half of the sandwich:
//
//   out = B x + b,    ‖B‖ <= 1
//
// Shapes (batch-first, as everywhere in this crate):
//   x    [batch, inputs]
//   XY   [outputs + inputs, outputs]
//   out  [batch, outputs]
//
// Reference: Wang & Manchester (2023) Direct Parameterization of
//            Lipschitz-Bounded Deep Networks, ICML

use burn::{module::Param, nn::activation::Activation, prelude::*};
use std::f64::consts::SQRT_2;

use crate::domain::{activation::ActivationKind, bounds::require_positive, error::ModelError};
use crate::ml::{
    activation::build_activation,
    init::{zeros_param, ParamInit},
    linalg::{cayley, frobenius_norm, rescale_to_norm},
};

#[derive(Config, Debug)]
pub struct SandwichConfig {
    pub inputs: usize,
    pub outputs: usize,
    #[config(default = "ActivationKind::Relu")]
    pub activation: ActivationKind,
    /// Output layers skip the activation and the Aᵀ Ψ half
    #[config(default = false)]
    pub is_output: bool,
    #[config(default = 0)]
    pub seed: u64,
}

impl SandwichConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<SandwichLayer<B>, ModelError> {
        self.init_with(&mut ParamInit::new(self.seed), device)
    }

    /// Build the layer drawing from a shared generator, so a stack
    /// of layers gets distinct weights from a single seed.
    pub fn init_with<B: Backend>(
        &self,
        rng: &mut ParamInit,
        device: &B::Device,
    ) -> Result<SandwichLayer<B>, ModelError> {
        require_positive("sandwich inputs", self.inputs)?;
        require_positive("sandwich outputs", self.outputs)?;

        let xy = rng.glorot_normal::<B>(self.outputs + self.inputs, self.outputs, device);
        // α starts at ‖XY‖ so the first normalisation is the identity
        let alpha = Param::from_tensor(frobenius_norm(xy.clone()));

        Ok(SandwichLayer {
            xy: Param::from_tensor(xy),
            alpha,
            log_psi: zeros_param(self.outputs, device),
            bias: zeros_param(self.outputs, device),
            activation: build_activation(self.activation, device),
            outputs: self.outputs,
            is_output: self.is_output,
        })
    }
}

#[derive(Module, Debug)]
pub struct SandwichLayer<B: Backend> {
    pub xy: Param<Tensor<B, 2>>,
    pub alpha: Param<Tensor<B, 1>>,
    /// d, with Ψ = exp(d)
    pub log_psi: Param<Tensor<B, 1>>,
    pub bias: Param<Tensor<B, 1>>,
    pub activation: Activation<B>,
    pub outputs: usize,
    pub is_output: bool,
}

/// The constrained weights of a sandwich layer, computed once.
#[derive(Debug, Clone)]
pub struct ExplicitSandwich<B: Backend> {
    /// B_bot [inputs, outputs], applied as x · B_bot
    input_map: Tensor<B, 2>,
    /// A_topᵀ [outputs, outputs]; absent for output layers
    output_map: Option<Tensor<B, 2>>,
    psi: Tensor<B, 2>,
    bias: Tensor<B, 2>,
    activation: Activation<B>,
}

impl<B: Backend> SandwichLayer<B> {
    /// Direct parameters → explicit weights.
    pub fn to_explicit(&self) -> ExplicitSandwich<B> {
        let xy = rescale_to_norm(self.xy.val(), self.alpha.val());
        let (a_top, b_bot) = cayley(xy);

        let output_map = if self.is_output { None } else { Some(a_top.transpose()) };
        ExplicitSandwich {
            input_map: b_bot,
            output_map,
            psi: self.log_psi.val().exp().reshape([1, self.outputs]),
            bias: self.bias.val().reshape([1, self.outputs]),
            activation: self.activation.clone(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.to_explicit().forward(x)
    }
}

impl<B: Backend> ExplicitSandwich<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let Some(output_map) = &self.output_map else {
            return x.matmul(self.input_map.clone()) + self.bias.clone();
        };

        let pre = x
            .matmul(self.input_map.clone())
            .mul_scalar(SQRT_2)
            .div(self.psi.clone())
            + self.bias.clone();
        let h = self.activation.forward(pre);
        h.mul(self.psi.clone())
            .matmul(output_map.clone())
            .mul_scalar(SQRT_2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        linalg::to_host,
        testing::{assert_all_close, device, row_distances, TestAutodiffBackend, TestBackend},
    };

    fn random_pair(batch: usize, n: usize, seed: u64) -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
        let mut rng = ParamInit::new(seed);
        let x = rng.normal([batch, n], 2.0, &device());
        let y = x.clone() + rng.normal([batch, n], 0.3, &device());
        (x, y)
    }

    #[test]
    fn test_explicit_call_matches_forward() {
        let layer = SandwichConfig::new(3, 5).with_seed(3).init::<TestBackend>(&device()).unwrap();
        let (x, _) = random_pair(4, 3, 11);
        let direct = layer.forward(x.clone());
        let explicit = layer.to_explicit().forward(x);
        assert_eq!(direct.dims(), [4, 5]);
        assert_all_close(&to_host(direct), &to_host(explicit), 1e-6);
    }

    #[test]
    fn test_hidden_layer_is_one_lipschitz() {
        for kind in [ActivationKind::Relu, ActivationKind::Tanh] {
            let layer = SandwichConfig::new(4, 6)
                .with_activation(kind)
                .with_seed(5)
                .init::<TestBackend>(&device())
                .unwrap();
            let (x, y) = random_pair(64, 4, 17);
            let out_dist = row_distances(layer.forward(x.clone()), layer.forward(y.clone()));
            let in_dist = row_distances(x, y);
            for (o, i) in out_dist.iter().zip(&in_dist) {
                assert!(*o <= i * (1.0 + 1e-4), "{kind}: expansion {o} > {i}");
            }
        }
    }

    #[test]
    fn test_output_layer_is_one_lipschitz() {
        let layer = SandwichConfig::new(6, 2)
            .with_is_output(true)
            .with_seed(9)
            .init::<TestBackend>(&device())
            .unwrap();
        let (x, y) = random_pair(64, 6, 23);
        let out_dist = row_distances(layer.forward(x.clone()), layer.forward(y.clone()));
        let in_dist = row_distances(x, y);
        for (o, i) in out_dist.iter().zip(&in_dist) {
            assert!(*o <= i * (1.0 + 1e-4));
        }
    }

    #[test]
    fn test_zero_width_rejected() {
        let err = SandwichConfig::new(0, 3).init::<TestBackend>(&device()).unwrap_err();
        assert!(matches!(err, ModelError::ZeroDimension { .. }));
    }

    #[test]
    fn test_gradients_reach_direct_parameters() {
        let layer = SandwichConfig::new(2, 3).init::<TestAutodiffBackend>(&device()).unwrap();
        let x = Tensor::<TestAutodiffBackend, 2>::from_floats([[0.5, -1.0], [1.5, 0.2]], &device());
        let loss = layer.forward(x).powf_scalar(2.0).sum();
        let grads = loss.backward();
        assert!(layer.xy.val().grad(&grads).is_some());
        assert!(layer.log_psi.val().grad(&grads).is_some());
        assert!(layer.alpha.val().grad(&grads).is_some());
    }
}
