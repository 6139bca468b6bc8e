// ============================================================
// Layer 5 - Contracting Recurrent Equilibrium Network (REN)
// ============================================================
// A recurrent model whose internal nonlinearity is defined by
// an equilibrium (fixed-point) equation:
//
//   x⁺ = A x  + B1 w + B2 u  + bx
//   v  = C1 x + D11 w + D12 u + bv,    w = σ(v)
//   y  = C2 x + D21 w + D22 u + by
//
// The model is CONTRACTING for every parameter value: two
// trajectories driven by the same input converge to each other
// exponentially, at rate ᾱ, whatever their initial states.
//
// Direct parameterisation:
//
//   H = XᵀX + εI,   partitioned into blocks of size (nx, nv, nx)
//
//        ⎡ H11  ·   ·  ⎤      P   = H33      F  = H31
//   H =  ⎢ H21 H22  ·  ⎥      B1  = H32      C1 = -H21
//        ⎣ H31 H32 H33 ⎦      E   = ½(H11 + P/ᾱ² + Y1 - Y1ᵀ)
//                             Λ   = ½ diag(H22)
//                             D11 = -strictly_lower(H22)
//
// and then the explicit model is obtained by dividing through:
//   A = E⁻¹F, B1 = E⁻¹B1, B2 = E⁻¹B2, bx = E⁻¹bx
//   C1 = Λ⁻¹C1, D11 = Λ⁻¹D11, D12 = Λ⁻¹D12, bv = Λ⁻¹bv
//
// Because D11 is strictly lower-triangular the equilibrium is
// solved EXACTLY by forward substitution, one neuron at a time.
//
// Reference: Revay, Wang & Manchester (2023) Recurrent Equilibrium
//            Networks: Flexible Dynamic Models with Guaranteed
//            Stability and Robustness, IEEE TAC

use burn::{module::Param, nn::activation::Activation, prelude::*};

use crate::domain::{
    activation::ActivationKind,
    bounds::{require_positive, ContractionRate},
    error::ModelError,
    task::InitMethod,
    traits::ContractionCertified,
};
use crate::ml::{
    activation::build_activation,
    init::{zeros_param, ParamInit},
    linalg::{diagonal, frobenius_norm, identity, rescale_to_norm, solve, strictly_lower},
    recurrent::{rollout, StateSpaceModel, StateSpaceStep},
};

/// A ≈ ρ I under the long-memory initialisation.
const LONG_MEMORY_RHO: f64 = 0.99;
/// Perturbation added to the long-memory X so neurons are not identical.
const LONG_MEMORY_NOISE: f64 = 0.01;

#[derive(Config, Debug)]
pub struct RenConfig {
    pub inputs: usize,
    pub states: usize,
    pub neurons: usize,
    pub outputs: usize,
    #[config(default = "ActivationKind::Relu")]
    pub activation: ActivationKind,
    #[config(default = "InitMethod::Random")]
    pub init_method: InitMethod,
    /// Learn ‖X‖ as a separate scalar (polar parameterisation)
    #[config(default = true)]
    pub polar: bool,
    /// y = x; requires outputs == states
    #[config(default = false)]
    pub identity_output: bool,
    #[config(default = true)]
    pub d22_zero: bool,
    #[config(default = 1.0)]
    pub contraction_rate: f64,
    #[config(default = 1e-4)]
    pub eps: f64,
    #[config(default = 0)]
    pub seed: u64,
}

impl RenConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ContractingRen<B>, ModelError> {
        let rate = ContractionRate::new(self.contraction_rate)?;
        let nu = require_positive("ren inputs", self.inputs)?;
        let nx = require_positive("ren states", self.states)?;
        let nv = require_positive("ren neurons", self.neurons)?;
        let ny = require_positive("ren outputs", self.outputs)?;
        if self.identity_output && ny != nx {
            return Err(ModelError::DimensionMismatch { expected: nx, actual: ny });
        }

        let mut rng = ParamInit::new(self.seed);
        let n = 2 * nx + nv;

        let (x, y1) = match self.init_method {
            InitMethod::Random => (
                rng.glorot_normal::<B>(n, n, device),
                rng.glorot_normal::<B>(nx, nx, device),
            ),
            InitMethod::LongMemory => (
                long_memory_x::<B>(nx, nv, device) + rng.normal([n, n], LONG_MEMORY_NOISE, device),
                Tensor::zeros([nx, nx], device),
            ),
        };

        let polar = self.polar.then(|| Param::from_tensor(frobenius_norm(x.clone())));

        let output = (!self.identity_output).then(|| RenOutput {
            c2: rng.glorot_param(ny, nx, device),
            d21: rng.glorot_param(ny, nv, device),
            d22: (!self.d22_zero).then(|| rng.glorot_param(ny, nu, device)),
            by: zeros_param(ny, device),
        });

        Ok(ContractingRen {
            x: Param::from_tensor(x),
            polar,
            y1: Param::from_tensor(y1),
            b2: rng.glorot_param(nx, nu, device),
            d12: rng.glorot_param(nv, nu, device),
            bx: zeros_param(nx, device),
            bv: zeros_param(nv, device),
            output,
            activation: build_activation(self.activation, device),
            inputs: nu,
            states: nx,
            neurons: nv,
            outputs: ny,
            contraction_rate: rate.value(),
            eps: self.eps,
        })
    }
}

/// X such that XᵀX has H11 = H33 = I, H13 = ρI, H22 = 2I and
/// zeros elsewhere, which makes E = I, Λ = I and A = ρI.
fn long_memory_x<B: Backend>(nx: usize, nv: usize, device: &B::Device) -> Tensor<B, 2> {
    let n = 2 * nx + nv;
    let rho = LONG_MEMORY_RHO as f32;
    let tail = (1.0 - rho * rho).sqrt();
    let mut values = vec![0.0f32; n * n];
    for i in 0..nx {
        values[i * n + i] = 1.0;
        values[i * n + (nx + nv + i)] = rho;
        let r = nx + nv + i;
        values[r * n + r] = tail;
    }
    for j in 0..nv {
        let r = nx + j;
        values[r * n + r] = std::f32::consts::SQRT_2;
    }
    Tensor::from_data(TensorData::new(values, [n, n]), device)
}

#[derive(Module, Debug)]
pub struct RenOutput<B: Backend> {
    pub c2: Param<Tensor<B, 2>>,
    pub d21: Param<Tensor<B, 2>>,
    pub d22: Option<Param<Tensor<B, 2>>>,
    pub by: Param<Tensor<B, 1>>,
}

#[derive(Module, Debug)]
pub struct ContractingRen<B: Backend> {
    pub x: Param<Tensor<B, 2>>,
    pub polar: Option<Param<Tensor<B, 1>>>,
    pub y1: Param<Tensor<B, 2>>,
    pub b2: Param<Tensor<B, 2>>,
    pub d12: Param<Tensor<B, 2>>,
    pub bx: Param<Tensor<B, 1>>,
    pub bv: Param<Tensor<B, 1>>,
    /// Absent when the model outputs its state directly
    pub output: Option<RenOutput<B>>,
    pub activation: Activation<B>,
    pub inputs: usize,
    pub states: usize,
    pub neurons: usize,
    pub outputs: usize,
    pub contraction_rate: f64,
    pub eps: f64,
}

/// Output map of an explicit recurrent model.
#[derive(Debug, Clone)]
pub enum ExplicitOutput<B: Backend> {
    Identity,
    Linear {
        c2: Tensor<B, 2>,
        d21: Tensor<B, 2>,
        d22: Option<Tensor<B, 2>>,
        by: Tensor<B, 2>,
    },
}

impl<B: Backend> ExplicitOutput<B> {
    /// Output width for a model with `states` states.
    pub fn dim(&self, states: usize) -> usize {
        match self {
            ExplicitOutput::Identity => states,
            ExplicitOutput::Linear { c2, .. } => c2.dims()[0],
        }
    }

    pub fn apply(&self, x: Tensor<B, 2>, w: Tensor<B, 2>, u: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            ExplicitOutput::Identity => x,
            ExplicitOutput::Linear { c2, d21, d22, by } => {
                let y = x.matmul(c2.clone().transpose())
                    + w.matmul(d21.clone().transpose())
                    + by.clone();
                match d22 {
                    Some(d22) => y + u.matmul(d22.clone().transpose()),
                    None => y,
                }
            }
        }
    }
}

/// Explicit REN matrices. Row-vector convention: x⁺ = x Aᵀ + ...
#[derive(Debug, Clone)]
pub struct ExplicitRen<B: Backend> {
    pub a: Tensor<B, 2>,
    pub b1: Tensor<B, 2>,
    pub b2: Tensor<B, 2>,
    pub bx: Tensor<B, 2>,
    pub c1: Tensor<B, 2>,
    pub d11: Tensor<B, 2>,
    pub d12: Tensor<B, 2>,
    pub bv: Tensor<B, 2>,
    pub output: ExplicitOutput<B>,
    activation: Activation<B>,
}

impl<B: Backend> ContractingRen<B> {
    pub fn to_explicit(&self) -> ExplicitRen<B> {
        let (nu, nx, nv) = (self.inputs, self.states, self.neurons);
        let n = 2 * nx + nv;
        let device = self.x.device();

        let mut x = self.x.val();
        if let Some(p) = &self.polar {
            x = rescale_to_norm(x, p.val());
        }
        let h = x.clone().transpose().matmul(x)
            + identity::<B>(n, &device).mul_scalar(self.eps);

        let (v0, v1) = (nx, nx + nv);
        let h11 = h.clone().slice([0..v0, 0..v0]);
        let h21 = h.clone().slice([v0..v1, 0..v0]);
        let h22 = h.clone().slice([v0..v1, v0..v1]);
        let h31 = h.clone().slice([v1..n, 0..v0]);
        let h32 = h.clone().slice([v1..n, v0..v1]);
        let h33 = h.slice([v1..n, v1..n]);

        let y1 = self.y1.val();
        let alpha_sq = self.contraction_rate * self.contraction_rate;
        let e = (h11 + h33.div_scalar(alpha_sq) + y1.clone() - y1.transpose()).mul_scalar(0.5);

        // E⁻¹ [F  B1  B2  bx] in a single elimination
        let rhs = Tensor::cat(
            vec![h31, h32, self.b2.val(), self.bx.val().reshape([nx, 1])],
            1,
        );
        let sol = solve(e, rhs);
        let a = sol.clone().slice([0..nx, 0..nx]);
        let b1 = sol.clone().slice([0..nx, nx..nx + nv]);
        let b2 = sol.clone().slice([0..nx, nx + nv..nx + nv + nu]);
        let bx = sol.slice([0..nx, nx + nv + nu..nx + nv + nu + 1]).reshape([1, nx]);

        // Λ⁻¹ scales each row of the neuron equations
        let inv_lambda = diagonal(h22.clone()).mul_scalar(0.5).powf_scalar(-1.0);
        let row_scale = inv_lambda.clone().reshape([nv, 1]);
        let c1 = h21.mul_scalar(-1.0).mul(row_scale.clone());
        let d11 = strictly_lower(h22).mul_scalar(-1.0).mul(row_scale.clone());
        let d12 = self.d12.val().mul(row_scale);
        let bv = self.bv.val().mul(inv_lambda).reshape([1, nv]);

        let output = match &self.output {
            None => ExplicitOutput::Identity,
            Some(out) => ExplicitOutput::Linear {
                c2: out.c2.val(),
                d21: out.d21.val(),
                d22: out.d22.as_ref().map(|d| d.val()),
                by: out.by.val().reshape([1, self.outputs]),
            },
        };

        ExplicitRen {
            a,
            b1,
            b2,
            bx,
            c1,
            d11,
            d12,
            bv,
            output,
            activation: self.activation.clone(),
        }
    }
}

impl<B: Backend> ExplicitRen<B> {
    /// Solve w = σ(b + D11 w) by forward substitution.
    ///
    /// b: [batch, nv]. D11 is strictly lower-triangular, so neuron i
    /// depends only on neurons 0..i, which are already known.
    pub fn equilibrium(&self, b: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, nv] = b.dims();
        let mut columns: Vec<Tensor<B, 2>> = Vec::with_capacity(nv);

        for i in 0..nv {
            let mut vi = b.clone().slice([0..batch, i..i + 1]);
            if i > 0 {
                let known = Tensor::cat(columns.clone(), 1);
                let row = self.d11.clone().slice([i..i + 1, 0..i]);
                vi = vi + known.matmul(row.transpose());
            }
            columns.push(self.activation.forward(vi));
        }
        Tensor::cat(columns, 1)
    }
}

impl<B: Backend> StateSpaceStep<B> for ExplicitRen<B> {
    fn step(&self, x: Tensor<B, 2>, u: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let b = x.clone().matmul(self.c1.clone().transpose())
            + u.clone().matmul(self.d12.clone().transpose())
            + self.bv.clone();
        let w = self.equilibrium(b);

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

impl<B: Backend> StateSpaceModel<B> for ContractingRen<B> {
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

impl<B: Backend> ContractionCertified for ContractingRen<B> {
    fn contraction_rate(&self) -> f64 {
        self.contraction_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        linalg::to_host,
        testing::{assert_all_close, device, row_distances, TestAutodiffBackend, TestBackend},
    };

    fn small() -> RenConfig {
        RenConfig::new(2, 4, 6, 3).with_seed(21)
    }

    #[test]
    fn test_simulate_shapes() {
        let ren = small().init::<TestBackend>(&device()).unwrap();
        let x0 = ren.init_state(5, &device());
        let u = Tensor::<TestBackend, 3>::ones([5, 7, 2], &device());
        let (x, y) = ren.simulate(x0, u);
        assert_eq!(x.dims(), [5, 4]);
        assert_eq!(y.dims(), [5, 7, 3]);
    }

    #[test]
    fn test_empty_input_sequence() {
        let ren = small().init::<TestBackend>(&device()).unwrap();
        let x0: Tensor<TestBackend, 2> = ParamInit::new(8).normal([2, 4], 1.0, &device());
        let u = Tensor::<TestBackend, 3>::zeros([2, 0, 2], &device());
        let (x, y) = ren.simulate(x0.clone(), u);
        assert_eq!(y.dims(), [2, 0, 3]);
        assert_eq!(to_host(x), to_host(x0));
    }

    #[test]
    fn test_stepping_by_hand_matches_simulate_with_feedthrough() {
        let ren = small().with_d22_zero(false).init::<TestBackend>(&device()).unwrap();
        assert!(ren.output.as_ref().is_some_and(|out| out.d22.is_some()));

        let mut rng = ParamInit::new(12);
        let x0: Tensor<TestBackend, 2> = rng.normal([3, 4], 1.0, &device());
        let u: Tensor<TestBackend, 3> = rng.normal([3, 6, 2], 1.0, &device());
        let (x_sim, y_sim) = ren.simulate(x0.clone(), u.clone());

        let explicit = ren.to_explicit();
        let mut x = x0;
        let mut ys = Vec::new();
        for t in 0..6 {
            let ut = u.clone().slice([0..3, t..t + 1, 0..2]).reshape([3, 2]);
            let (next, y) = explicit.step(x, ut);
            ys.push(y.reshape([3, 1, 3]));
            x = next;
        }
        assert_all_close(&to_host(x_sim), &to_host(x), 1e-5);
        assert_all_close(&to_host(y_sim), &to_host(Tensor::cat(ys, 1)), 1e-5);

        // With x = 0 and w = 0 the output is by + u D22ᵀ
        let zeros_x = Tensor::<TestBackend, 2>::zeros([1, 4], &device());
        let zeros_w = Tensor::<TestBackend, 2>::zeros([1, 6], &device());
        let unit_u = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device());
        let y_u = explicit.output.apply(zeros_x.clone(), zeros_w.clone(), unit_u);
        let y_0 = explicit.output.apply(zeros_x, zeros_w, Tensor::zeros([1, 2], &device()));
        let column = to_host(y_u - y_0);
        let d22 = ren.output.as_ref().and_then(|out| out.d22.as_ref()).map(|d| d.val());
        let first_column = to_host(d22.unwrap().slice([0..3, 0..1]));
        assert_all_close(&column, &first_column, 1e-6);
    }

    #[test]
    fn test_equilibrium_is_a_fixed_point() {
        let ren = small().with_activation(ActivationKind::Tanh).init::<TestBackend>(&device()).unwrap();
        let explicit = ren.to_explicit();
        let b: Tensor<TestBackend, 2> = ParamInit::new(4).normal([8, 6], 1.0, &device());
        let w = explicit.equilibrium(b.clone());
        let v = b + w.clone().matmul(explicit.d11.clone().transpose());
        let residual = explicit.activation.forward(v) - w;
        assert!(to_host(residual.abs()).iter().all(|r| *r < 1e-5));
    }

    #[test]
    fn test_trajectories_contract() {
        let ren = small().with_contraction_rate(0.9).init::<TestBackend>(&device()).unwrap();
        let mut rng = ParamInit::new(31);
        let xa: Tensor<TestBackend, 2> = rng.normal([4, 4], 3.0, &device());
        let xb: Tensor<TestBackend, 2> = rng.normal([4, 4], 3.0, &device());
        let u: Tensor<TestBackend, 3> = rng.normal([4, 100, 2], 1.0, &device());

        let initial = row_distances(xa.clone(), xb.clone());
        let (fa, _) = ren.simulate(xa, u.clone());
        let (fb, _) = ren.simulate(xb, u);
        let last = row_distances(fa, fb);
        for (l, i) in last.iter().zip(&initial) {
            assert!(*l < 0.01 * i, "distance {i} only shrank to {l}");
        }
    }

    #[test]
    fn test_long_memory_starts_near_identity() {
        let ren = small()
            .with_init_method(InitMethod::LongMemory)
            .init::<TestBackend>(&device())
            .unwrap();
        let a = ren.to_explicit().a;
        let diag = to_host(diagonal(a.clone()));
        assert!(diag.iter().all(|d| *d > 0.9 && *d < 1.1), "{diag:?}");
        let off = to_host(a.clone() - a.mul(identity::<TestBackend>(4, &device())));
        assert!(off.iter().all(|v| v.abs() < 0.1));
    }

    #[test]
    fn test_identity_output_returns_state() {
        let ren = RenConfig::new(2, 3, 5, 3)
            .with_identity_output(true)
            .init::<TestBackend>(&device())
            .unwrap();
        assert!(ren.output.is_none());
        let x0: Tensor<TestBackend, 2> = ParamInit::new(2).normal([2, 3], 1.0, &device());
        let u = Tensor::<TestBackend, 3>::zeros([2, 1, 2], &device());
        let (_, y) = ren.simulate(x0.clone(), u);
        assert_all_close(&to_host(y), &to_host(x0), 1e-6);
    }

    #[test]
    fn test_identity_output_needs_matching_sizes() {
        let err = RenConfig::new(2, 3, 5, 2)
            .with_identity_output(true)
            .init::<TestBackend>(&device())
            .unwrap_err();
        assert_eq!(err, ModelError::DimensionMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn test_gradients_flow_through_time() {
        let ren = small().init::<TestAutodiffBackend>(&device()).unwrap();
        let x0 = ren.init_state(2, &device());
        let u = Tensor::<TestAutodiffBackend, 3>::ones([2, 5, 2], &device());
        let (_, y) = ren.simulate(x0, u);
        let grads = y.powf_scalar(2.0).sum().backward();
        assert!(ren.x.val().grad(&grads).is_some());
        assert!(ren.y1.val().grad(&grads).is_some());
        assert!(ren.d12.val().grad(&grads).is_some());
    }
}
