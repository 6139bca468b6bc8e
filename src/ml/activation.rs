// ============================================================
// Layer 5 - Activation Modules
// ============================================================
// Maps the domain-level ActivationKind onto Burn's activation
// module. Only slope-restricted variants are reachable from
// here, so every layer that takes an Activation<B> built by
// this function inherits the [0, 1] slope guarantee.

use burn::{
    nn::activation::{Activation, ActivationConfig},
    prelude::*,
};

use crate::domain::activation::ActivationKind;

pub fn build_activation<B: Backend>(kind: ActivationKind, device: &B::Device) -> Activation<B> {
    let config = match kind {
        ActivationKind::Relu => ActivationConfig::Relu,
        ActivationKind::Tanh => ActivationConfig::Tanh,
        ActivationKind::Sigmoid => ActivationConfig::Sigmoid,
    };
    config.init(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{linalg::to_host, testing::{assert_all_close, device, TestBackend}};

    #[test]
    fn test_matches_scalar_reference() {
        let inputs = [-2.0f32, -0.5, 0.0, 0.3, 1.7];
        for kind in [ActivationKind::Relu, ActivationKind::Tanh, ActivationKind::Sigmoid] {
            let act = build_activation::<TestBackend>(kind, &device());
            let x = Tensor::<TestBackend, 1>::from_floats(inputs, &device());
            let expected: Vec<f32> = inputs.iter().map(|v| kind.apply(*v as f64) as f32).collect();
            assert_all_close(&to_host(act.forward(x)), &expected, 1e-5);
        }
    }
}
