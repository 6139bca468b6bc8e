// ============================================================
// Layer 5 - Empirical Lipschitz Estimation
// ============================================================
// Sampling-based LOWER bound on a model's Lipschitz constant:
//
//   γ̂ = max over pairs ‖f(x + δ) - f(x)‖ / ‖δ‖
//
// with x drawn from the supplied inputs and δ ~ N(0, radius² I).
// For a certified model γ̂ must never exceed the certificate.
// The estimate only approaches the true constant from below,
// so a small gap is expected and says nothing is wrong.

use burn::prelude::*;

use crate::ml::{init::ParamInit, linalg::to_host, model::Regressor};

/// Largest observed slope of `model` around `inputs` ([batch, d]),
/// over `samples` rounds of random perturbations.
pub fn estimate_lipschitz<B: Backend, M: Regressor<B>>(
    model: &M,
    inputs: Tensor<B, 2>,
    samples: usize,
    radius: f64,
    seed: u64,
) -> f64 {
    let device = inputs.device();
    let shape = inputs.dims();
    if shape[0] == 0 {
        return 0.0;
    }
    let base = model.predict(inputs.clone());
    let mut rng = ParamInit::new(seed);
    let mut best = 0.0f64;

    for _ in 0..samples {
        let delta: Tensor<B, 2> = rng.normal(shape, radius, &device);
        let moved = model.predict(inputs.clone() + delta.clone());

        let num = to_host((moved - base.clone()).powf_scalar(2.0).sum_dim(1).sqrt());
        let den = to_host(delta.powf_scalar(2.0).sum_dim(1).sqrt());
        for (n, d) in num.iter().zip(&den) {
            if *d > 0.0 {
                best = best.max((*n / *d) as f64);
            }
        }
    }

    tracing::debug!("Empirical Lipschitz estimate {:.4} from {} rounds", best, samples);
    best
}

/// True when an estimate respects a certified bound, allowing
/// a relative slack for f32 rounding.
pub fn within_bound(estimate: f64, bound: f64) -> bool {
    estimate <= bound * (1.0 + 1e-3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::LipschitzCertified;
    use crate::ml::{
        lbdn::LbdnConfig,
        testing::{device, TestBackend},
    };

    struct Scale(f32);

    impl Regressor<TestBackend> for Scale {
        fn predict(&self, x: Tensor<TestBackend, 2>) -> Tensor<TestBackend, 2> {
            x.mul_scalar(self.0)
        }
    }

    #[test]
    fn test_linear_map_is_estimated_exactly() {
        let x: Tensor<TestBackend, 2> = ParamInit::new(0).normal([16, 3], 1.0, &device());
        let estimate = estimate_lipschitz(&Scale(3.0), x, 4, 0.5, 1);
        assert!((estimate - 3.0).abs() < 1e-4, "{estimate}");
    }

    #[test]
    fn test_no_points_gives_zero() {
        let x = Tensor::<TestBackend, 2>::zeros([0, 3], &device());
        assert_eq!(estimate_lipschitz(&Scale(3.0), x, 4, 0.5, 1), 0.0);
    }

    #[test]
    fn test_lbdn_never_exceeds_its_certificate() {
        let model = LbdnConfig::new(2, vec![16, 16], 1)
            .with_gamma(2.0)
            .with_seed(4)
            .init::<TestBackend>(&device())
            .unwrap();
        let x: Tensor<TestBackend, 2> = ParamInit::new(9).normal([64, 2], 1.0, &device());
        let estimate = estimate_lipschitz(&model, x, 20, 0.1, 2);
        assert!(estimate > 0.0);
        assert!(within_bound(estimate, model.lipschitz_bound()), "{estimate} > 2");
    }
}
