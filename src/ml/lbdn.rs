// ============================================================
// Layer 5 - Lipschitz-Bounded Deep Network (LBDN)
// ============================================================
// A multi-layer perceptron with a certified Lipschitz bound γ:
//
//   y = √γ · f_out( f_L( ... f_1( √γ · u ) ) )
//
// Every f_i is a 1-Lipschitz sandwich layer, so the composition
// is 1-Lipschitz and the two √γ scalings make the whole map
// γ-Lipschitz. No projection, clipping or penalty is needed
// during training: any parameter value is admissible.
//
// Evaluation is split in two steps that can be cached
// separately:
//
//   to_explicit()          direct params → constrained weights
//   ExplicitLbdn::forward  run the network on a batch
//
// Reference: Wang & Manchester (2023) Direct Parameterization of
//            Lipschitz-Bounded Deep Networks, ICML

use burn::prelude::*;

use crate::domain::{
    activation::ActivationKind,
    bounds::{require_positive, LipschitzBound},
    error::ModelError,
    traits::LipschitzCertified,
};
use crate::ml::{
    init::ParamInit,
    sandwich::{ExplicitSandwich, SandwichConfig, SandwichLayer},
};

#[derive(Config, Debug)]
pub struct LbdnConfig {
    pub inputs: usize,
    pub hidden: Vec<usize>,
    pub outputs: usize,
    #[config(default = 1.0)]
    pub gamma: f64,
    #[config(default = "ActivationKind::Relu")]
    pub activation: ActivationKind,
    #[config(default = 0)]
    pub seed: u64,
}

impl LbdnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Lbdn<B>, ModelError> {
        self.init_with(&mut ParamInit::new(self.seed), device)
    }

    pub fn init_with<B: Backend>(
        &self,
        rng: &mut ParamInit,
        device: &B::Device,
    ) -> Result<Lbdn<B>, ModelError> {
        let gamma = LipschitzBound::new(self.gamma)?;
        require_positive("lbdn inputs", self.inputs)?;
        require_positive("lbdn outputs", self.outputs)?;

        let mut layers = Vec::with_capacity(self.hidden.len());
        let mut width = self.inputs;
        for &next in &self.hidden {
            let layer = SandwichConfig::new(width, next)
                .with_activation(self.activation)
                .init_with(rng, device)?;
            layers.push(layer);
            width = next;
        }
        let output = SandwichConfig::new(width, self.outputs)
            .with_is_output(true)
            .init_with(rng, device)?;

        Ok(Lbdn {
            layers,
            output,
            gamma: gamma.value(),
            inputs: self.inputs,
        })
    }
}

#[derive(Module, Debug)]
pub struct Lbdn<B: Backend> {
    pub layers: Vec<SandwichLayer<B>>,
    pub output: SandwichLayer<B>,
    pub gamma: f64,
    pub inputs: usize,
}

/// Frozen weights of an LBDN, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub struct ExplicitLbdn<B: Backend> {
    layers: Vec<ExplicitSandwich<B>>,
    output: ExplicitSandwich<B>,
    scale: f64,
}

impl<B: Backend> Lbdn<B> {
    pub fn to_explicit(&self) -> ExplicitLbdn<B> {
        ExplicitLbdn {
            layers: self.layers.iter().map(SandwichLayer::to_explicit).collect(),
            output: self.output.to_explicit(),
            scale: self.gamma.sqrt(),
        }
    }

    /// u: [batch, inputs] → y: [batch, outputs]
    pub fn forward(&self, u: Tensor<B, 2>) -> Tensor<B, 2> {
        self.to_explicit().forward(u)
    }
}

impl<B: Backend> ExplicitLbdn<B> {
    pub fn forward(&self, u: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = u.mul_scalar(self.scale);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        self.output.forward(x).mul_scalar(self.scale)
    }
}

impl<B: Backend> LipschitzCertified for Lbdn<B> {
    fn lipschitz_bound(&self) -> f64 {
        self.gamma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        linalg::to_host,
        testing::{assert_all_close, device, row_distances, TestAutodiffBackend, TestBackend},
    };

    #[test]
    fn test_output_shape_and_explicit_split() {
        // Same sizes as the reference smoke test: 5 → (8, 16) → 2, γ = 10
        let model = LbdnConfig::new(5, vec![8, 16], 2)
            .with_gamma(10.0)
            .with_activation(ActivationKind::Tanh)
            .init::<TestBackend>(&device())
            .unwrap();
        let u = Tensor::<TestBackend, 2>::ones([4, 5], &device());
        let explicit = model.to_explicit();
        let y = explicit.forward(u.clone());
        assert_eq!(y.dims(), [4, 2]);
        assert_all_close(&to_host(y), &to_host(model.forward(u)), 1e-6);
    }

    #[test]
    fn test_respects_gamma() {
        for gamma in [0.5, 2.0, 10.0] {
            let model = LbdnConfig::new(3, vec![16, 16], 2)
                .with_gamma(gamma)
                .with_seed(4)
                .init::<TestBackend>(&device())
                .unwrap();
            let mut rng = ParamInit::new(99);
            let x: Tensor<TestBackend, 2> = rng.normal([128, 3], 1.0, &device());
            let y = x.clone() + rng.normal([128, 3], 0.1, &device());
            let out = row_distances(model.forward(x.clone()), model.forward(y.clone()));
            let inp = row_distances(x, y);
            for (o, i) in out.iter().zip(&inp) {
                assert!(*o as f64 <= gamma * (*i as f64) * (1.0 + 1e-4));
            }
            assert_eq!(model.lipschitz_bound(), gamma);
        }
    }

    #[test]
    fn test_no_hidden_layers_is_linear_and_bounded() {
        let model = LbdnConfig::new(2, vec![], 1).init::<TestBackend>(&device()).unwrap();
        assert!(model.layers.is_empty());
        let u = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device());
        assert_eq!(model.forward(u).dims(), [1, 1]);
    }

    #[test]
    fn test_invalid_gamma_rejected() {
        let err = LbdnConfig::new(2, vec![4], 1)
            .with_gamma(-1.0)
            .init::<TestBackend>(&device())
            .unwrap_err();
        assert_eq!(err, ModelError::InvalidLipschitzBound(-1.0));
    }

    #[test]
    fn test_input_gradient_is_finite() {
        let model = LbdnConfig::new(5, vec![8, 16], 2)
            .with_gamma(10.0)
            .init::<TestAutodiffBackend>(&device())
            .unwrap();
        let u = Tensor::<TestAutodiffBackend, 2>::ones([4, 5], &device()).require_grad();
        let loss = model.forward(u.clone()).powf_scalar(2.0).sum();
        let grads = loss.backward();
        let g = u.grad(&grads).expect("input gradient");
        assert!(to_host(g).iter().all(|v| v.is_finite()));
    }
}
