// ============================================================
// Layer 5 - Robust Recurrent Deep Network (R2DN)
// ============================================================
// A linear state-space system in feedback with a 1-Lipschitz
// deep network φ (an LBDN):
//
//   v  = C1 x + D12 u + bv
//   w  = φ(v)
//   x⁺ = A x + B1 w + B2 u + bx
//   y  = C2 x + D21 w + D22 u + by      (or y = x)
//
// Unlike the REN there is no equilibrium to solve: φ is an
// explicit feed-forward network, so a step is a single pass.
//
// Contraction comes from the state matrices:
//
//   [A₀; C₀] = cayley(XY)            (orthonormal columns)
//   A  = r cos θ · A₀
//   C1 = C₀
//   B1 = r sin θ · B / ‖B‖_F
//
// For two trajectories under the same input, with a = ‖A₀δx‖
// and c = ‖C₀δx‖ (a² + c² = ‖δx‖²):
//
//   ‖δx⁺‖ <= r (cos θ · a + sin θ · c) <= r ‖δx‖
//
// so every step shrinks the distance between states by r.

use burn::{module::Param, prelude::*, tensor::activation::sigmoid};

use crate::domain::{
    activation::ActivationKind,
    bounds::{require_positive, ContractionRate},
    error::ModelError,
    traits::ContractionCertified,
};
use crate::ml::{
    init::{scalar_param, zeros_param, ParamInit},
    lbdn::{ExplicitLbdn, Lbdn, LbdnConfig},
    linalg::{cayley, frobenius_norm},
    recurrent::{rollout, StateSpaceModel, StateSpaceStep},
    ren::{ExplicitOutput, RenOutput},
};

#[derive(Config, Debug)]
pub struct R2dnConfig {
    pub inputs: usize,
    pub states: usize,
    pub neurons: usize,
    pub outputs: usize,
    /// Hidden widths of the feedback network φ
    #[config(default = "vec![32, 32]")]
    pub hidden: Vec<usize>,
    #[config(default = "ActivationKind::Relu")]
    pub activation: ActivationKind,
    #[config(default = 0.99)]
    pub contraction_rate: f64,
    #[config(default = false)]
    pub identity_output: bool,
    #[config(default = true)]
    pub d22_zero: bool,
    #[config(default = 0)]
    pub seed: u64,
}

impl R2dnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<R2dn<B>, ModelError> {
        let rate = ContractionRate::new(self.contraction_rate)?;
        let nu = require_positive("r2dn inputs", self.inputs)?;
        let nx = require_positive("r2dn states", self.states)?;
        let nv = require_positive("r2dn neurons", self.neurons)?;
        let ny = require_positive("r2dn outputs", self.outputs)?;
        if self.identity_output && ny != nx {
            return Err(ModelError::DimensionMismatch { expected: nx, actual: ny });
        }

        let mut rng = ParamInit::new(self.seed);
        let phi = LbdnConfig::new(nv, self.hidden.clone(), nv)
            .with_gamma(1.0)
            .with_activation(self.activation)
            .init_with(&mut rng, device)?;

        let output = (!self.identity_output).then(|| RenOutput {
            c2: rng.glorot_param(ny, nx, device),
            d21: rng.glorot_param(ny, nv, device),
            d22: (!self.d22_zero).then(|| rng.glorot_param(ny, nu, device)),
            by: zeros_param(ny, device),
        });

        Ok(R2dn {
            xy: rng.glorot_param(nx + nv, nx, device),
            b: rng.glorot_param(nx, nv, device),
            theta: scalar_param(0.0, device),
            b2: rng.glorot_param(nx, nu, device),
            d12: rng.glorot_param(nv, nu, device),
            bx: zeros_param(nx, device),
            bv: zeros_param(nv, device),
            phi,
            output,
            inputs: nu,
            states: nx,
            neurons: nv,
            outputs: ny,
            contraction_rate: rate.value(),
        })
    }
}

#[derive(Module, Debug)]
pub struct R2dn<B: Backend> {
    pub xy: Param<Tensor<B, 2>>,
    pub b: Param<Tensor<B, 2>>,
    /// θ = (π/2) · sigmoid(theta) splits r between A and B1
    pub theta: Param<Tensor<B, 1>>,
    pub b2: Param<Tensor<B, 2>>,
    pub d12: Param<Tensor<B, 2>>,
    pub bx: Param<Tensor<B, 1>>,
    pub bv: Param<Tensor<B, 1>>,
    pub phi: Lbdn<B>,
    pub output: Option<RenOutput<B>>,
    pub inputs: usize,
    pub states: usize,
    pub neurons: usize,
    pub outputs: usize,
    pub contraction_rate: f64,
}

#[derive(Debug, Clone)]
pub struct ExplicitR2dn<B: Backend> {
    pub a: Tensor<B, 2>,
    pub b1: Tensor<B, 2>,
    pub b2: Tensor<B, 2>,
    pub bx: Tensor<B, 2>,
    pub c1: Tensor<B, 2>,
    pub d12: Tensor<B, 2>,
    pub bv: Tensor<B, 2>,
    pub output: ExplicitOutput<B>,
    phi: ExplicitLbdn<B>,
}

impl<B: Backend> R2dn<B> {
    pub fn to_explicit(&self) -> ExplicitR2dn<B> {
        let (nx, nv) = (self.states, self.neurons);
        let r = self.contraction_rate;

        let (a0, c0) = cayley(self.xy.val());
        let angle = sigmoid(self.theta.val()).mul_scalar(std::f64::consts::FRAC_PI_2);
        let cos = angle.clone().cos().mul_scalar(r).reshape([1, 1]);
        let sin = angle.sin().mul_scalar(r).reshape([1, 1]);

        let b = self.b.val();
        let b_unit = b.clone().div(frobenius_norm(b).reshape([1, 1]));

        let output = match &self.output {
            None => ExplicitOutput::Identity,
            Some(out) => ExplicitOutput::Linear {
                c2: out.c2.val(),
                d21: out.d21.val(),
                d22: out.d22.as_ref().map(|d| d.val()),
                by: out.by.val().reshape([1, self.outputs]),
            },
        };

        ExplicitR2dn {
            a: a0.mul(cos),
            b1: b_unit.mul(sin),
            b2: self.b2.val(),
            bx: self.bx.val().reshape([1, nx]),
            c1: c0,
            d12: self.d12.val(),
            bv: self.bv.val().reshape([1, nv]),
            output,
            phi: self.phi.to_explicit(),
        }
    }
}

impl<B: Backend> StateSpaceStep<B> for ExplicitR2dn<B> {
    fn step(&self, x: Tensor<B, 2>, u: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let v = x.clone().matmul(self.c1.clone().transpose())
            + u.clone().matmul(self.d12.clone().transpose())
            + self.bv.clone();
        let w = self.phi.forward(v);

        let next = x.clone().matmul(self.a.clone().transpose())
            + w.clone().matmul(self.b1.clone().transpose())
            + u.clone().matmul(self.b2.clone().transpose())
            + self.bx.clone();
        let y = self.output.apply(x, w, u);
        (next, y)
    }

    fn output_dim(&self) -> usize {
        self.output.dim(self.a.dims()[0])
    }
}

impl<B: Backend> StateSpaceModel<B> for R2dn<B> {
    fn state_dim(&self) -> usize {
        self.states
    }

    fn input_dim(&self) -> usize {
        self.inputs
    }

    fn output_dim(&self) -> usize {
        self.outputs
    }

    fn simulate(&self, x0: Tensor<B, 2>, inputs: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 3>) {
        rollout(&self.to_explicit(), x0, inputs)
    }
}

impl<B: Backend> ContractionCertified for R2dn<B> {
    fn contraction_rate(&self) -> f64 {
        self.contraction_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        linalg::to_host,
        testing::{device, row_distances, TestAutodiffBackend, TestBackend},
    };

    fn config() -> R2dnConfig {
        R2dnConfig::new(2, 4, 6, 3).with_hidden(vec![8]).with_seed(17)
    }

    #[test]
    fn test_simulate_shapes() {
        let model = config().init::<TestBackend>(&device()).unwrap();
        let x0 = model.init_state(3, &device());
        let u = Tensor::<TestBackend, 3>::zeros([3, 9, 2], &device());
        let (x, y) = model.simulate(x0, u);
        assert_eq!(x.dims(), [3, 4]);
        assert_eq!(y.dims(), [3, 9, 3]);
    }

    #[test]
    fn test_empty_input_sequence() {
        let model = config().init::<TestBackend>(&device()).unwrap();
        let x0: Tensor<TestBackend, 2> = ParamInit::new(3).normal([2, 4], 1.0, &device());
        let u = Tensor::<TestBackend, 3>::zeros([2, 0, 2], &device());
        let (x, y) = model.simulate(x0.clone(), u);
        assert_eq!(y.dims(), [2, 0, 3]);
        assert_eq!(to_host(x), to_host(x0));
    }

    #[test]
    fn test_each_step_contracts_at_rate_r() {
        let model = config()
            .with_contraction_rate(0.8)
            .init::<TestBackend>(&device())
            .unwrap();
        let explicit = model.to_explicit();
        let mut rng = ParamInit::new(5);
        let xa: Tensor<TestBackend, 2> = rng.normal([64, 4], 2.0, &device());
        let xb: Tensor<TestBackend, 2> = rng.normal([64, 4], 2.0, &device());
        let u: Tensor<TestBackend, 2> = rng.normal([64, 2], 1.0, &device());

        let before = row_distances(xa.clone(), xb.clone());
        let (na, _) = explicit.step(xa, u.clone());
        let (nb, _) = explicit.step(xb, u);
        let after = row_distances(na, nb);
        for (a, b) in after.iter().zip(&before) {
            assert!(*a <= 0.8 * b * (1.0 + 1e-4), "{a} > 0.8·{b}");
        }
    }

    #[test]
    fn test_state_matrix_norm_is_below_rate() {
        let model = config().with_contraction_rate(0.9).init::<TestBackend>(&device()).unwrap();
        let a = model.to_explicit().a;
        // ‖A‖_F² = r² cos²θ ‖A₀‖_F² <= r² · nx
        let fro_sq: f32 = to_host(a).iter().map(|v| v * v).sum();
        assert!(fro_sq <= 0.81 * 4.0 * (1.0 + 1e-4));
    }

    #[test]
    fn test_rate_above_one_rejected() {
        let err = config().with_contraction_rate(1.5).init::<TestBackend>(&device()).unwrap_err();
        assert_eq!(err, ModelError::InvalidContractionRate(1.5));
    }

    #[test]
    fn test_gradients_reach_every_block() {
        let model = config().init::<TestAutodiffBackend>(&device()).unwrap();
        let x0 = model.init_state(2, &device());
        let u = Tensor::<TestAutodiffBackend, 3>::ones([2, 4, 2], &device());
        let (_, y) = model.simulate(x0, u);
        let grads = y.powf_scalar(2.0).sum().backward();
        assert!(model.xy.val().grad(&grads).is_some());
        assert!(model.theta.val().grad(&grads).is_some());
        assert!(model.b.val().grad(&grads).is_some());
    }
}
