// ============================================================
// Layer 4 - Synthetic Data
// ============================================================
// Generates the training data for the bundled experiments.
// Everything is seeded through StdRng, so a config seed fixes
// the dataset exactly.
//
// 1. Regression samples for the static models:
//      x ~ Uniform(box)^d,   y = f(x) (+ optional Gaussian noise)
//
// 2. A 1-D bistable reaction-diffusion PDE for the observer:
//
//      ∂ξ/∂t = D ∂²ξ/∂z² + R(ξ),   R(ξ) = ξ (1 - ξ)(ξ - ½) / 2
//
//    on z ∈ [0, 1], discretised on `sites` grid points. Both
//    boundaries are driven by the input u(t), a random level in
//    [0, 1] held for `hold` steps. Explicit Euler with
//      dt = 0.2 · dz² / D
//    keeps the scheme stable (the limit is ½ · dz² / D).
//
//    Only three sites are measured: the two ends and the middle.
//    An observer must reconstruct the other sites from them.
//
// Reference: Revay, Wang & Manchester (2023), §VIII-C (PDE observer)

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;

use crate::data::dataset::{RegressionSample, TransitionSample};
use crate::domain::{bounds::require_positive, error::ModelError, task::TargetFunction};

// ─── Regression ──────────────────────────────────────────────────────────────
/// Draw `count` samples of `target`, uniformly over its domain.
/// `noise` is the std of additive Gaussian noise on the label.
pub fn sample_regression(
    target: TargetFunction,
    count: usize,
    noise: f64,
    seed: u64,
) -> Vec<RegressionSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (lo, hi) = target.domain();
    let label_noise = Normal::new(0.0, noise.max(0.0)).ok();

    (0..count)
        .map(|_| {
            let x: Vec<f64> = (0..target.input_dim()).map(|_| rng.gen_range(lo..hi)).collect();
            let mut y = target.eval(&x);
            if let Some(dist) = &label_noise {
                y += rng.sample(dist);
            }
            RegressionSample {
                input: x.iter().map(|v| *v as f32).collect(),
                target: vec![y as f32],
            }
        })
        .collect()
}

// ─── Reaction-diffusion PDE ──────────────────────────────────────────────────
/// Number of measured sites: first, middle, last.
pub const MEASUREMENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionDiffusion {
    sites: usize,
    diffusion: f64,
    /// Steps each random input level is held for
    hold: usize,
}

/// A simulated trajectory: `states[t]` is the full grid at step t,
/// `inputs[t]` the boundary level applied to get from t to t+1.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub states: Vec<Vec<f64>>,
    pub inputs: Vec<f64>,
}

impl ReactionDiffusion {
    pub fn new(sites: usize, hold: usize) -> Result<Self, ModelError> {
        if sites < MEASUREMENTS {
            return Err(ModelError::DimensionMismatch { expected: MEASUREMENTS, actual: sites });
        }
        require_positive("pde hold steps", hold)?;
        Ok(Self { sites, diffusion: 1.0, hold })
    }

    pub fn sites(&self) -> usize {
        self.sites
    }

    /// Grid spacing on z ∈ [0, 1].
    pub fn dz(&self) -> f64 {
        1.0 / (self.sites - 1) as f64
    }

    /// Euler step size, a fifth of the diffusion limit.
    pub fn dt(&self) -> f64 {
        0.2 * self.dz() * self.dz() / self.diffusion
    }

    fn reaction(xi: f64) -> f64 {
        0.5 * xi * (1.0 - xi) * (xi - 0.5)
    }

    /// One explicit Euler step with both boundaries set to `u`.
    pub fn step(&self, state: &[f64], u: f64) -> Vec<f64> {
        let n = self.sites;
        let (dt, dz2) = (self.dt(), self.dz() * self.dz());
        let mut next = vec![0.0; n];
        for i in 1..n - 1 {
            let laplacian = (state[i + 1] - 2.0 * state[i] + state[i - 1]) / dz2;
            next[i] = state[i] + dt * (self.diffusion * laplacian + Self::reaction(state[i]));
        }
        next[0] = u;
        next[n - 1] = u;
        next
    }

    /// The observed sites of a grid state.
    pub fn measure(&self, state: &[f64]) -> [f64; MEASUREMENTS] {
        [state[0], state[self.sites / 2], state[self.sites - 1]]
    }

    /// Simulate `steps` steps from a zero grid under a random
    /// piecewise-constant boundary input.
    pub fn simulate(&self, steps: usize, seed: u64) -> Trajectory {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut states = Vec::with_capacity(steps + 1);
        let mut inputs = Vec::with_capacity(steps);
        let mut x = vec![0.0; self.sites];
        let mut level = 0.0;

        states.push(x.clone());
        for t in 0..steps {
            if t % self.hold == 0 {
                level = rng.gen_range(0.0..1.0);
            }
            x = self.step(&x, level);
            inputs.push(level);
            states.push(x.clone());
        }
        Trajectory { states, inputs }
    }
}

impl Trajectory {
    /// Observer training pairs: (x_t, y_t) → x_{t+1}.
    pub fn transitions(&self, pde: &ReactionDiffusion) -> Vec<TransitionSample> {
        self.states
            .windows(2)
            .map(|pair| TransitionSample {
                state: to_f32(&pair[0]),
                input: to_f32(&pde.measure(&pair[0])),
                next_state: to_f32(&pair[1]),
            })
            .collect()
    }

    /// Measurement sequence y_0 .. y_{T-1}, flattened time-major.
    pub fn measurements(&self, pde: &ReactionDiffusion) -> Vec<f32> {
        let steps = self.states.len().saturating_sub(1);
        self.states[..steps]
            .iter()
            .flat_map(|x| pde.measure(x))
            .map(|v| v as f32)
            .collect()
    }

    /// True states x_0 .. x_{T-1}, flattened time-major. These line
    /// up with the outputs of an identity-output observer fed
    /// `measurements`.
    pub fn current_states(&self) -> Vec<f32> {
        let steps = self.states.len().saturating_sub(1);
        self.states[..steps].iter().flatten().map(|v| *v as f32).collect()
    }

    pub fn steps(&self) -> usize {
        self.inputs.len()
    }
}

fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|v| *v as f32).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_samples_stay_in_domain() {
        let samples = sample_regression(TargetFunction::Rosenbrock, 200, 0.0, 3);
        assert_eq!(samples.len(), 200);
        for s in &samples {
            assert_eq!(s.input.len(), 2);
            assert!(s.input.iter().all(|v| (-2.0..2.0).contains(v)));
            let x: Vec<f64> = s.input.iter().map(|v| *v as f64).collect();
            assert!((s.target[0] as f64 - TargetFunction::Rosenbrock.eval(&x)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_regression_is_reproducible() {
        let a = sample_regression(TargetFunction::Sine, 10, 0.1, 9);
        let b = sample_regression(TargetFunction::Sine, 10, 0.1, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pde_step_size() {
        let pde = ReactionDiffusion::new(11, 5).unwrap();
        assert!((pde.dz() - 0.1).abs() < 1e-12);
        assert!((pde.dt() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_pde_stays_bounded_and_tracks_boundary() {
        let pde = ReactionDiffusion::new(21, 50).unwrap();
        let traj = pde.simulate(2000, 1);
        assert_eq!(traj.states.len(), 2001);
        assert_eq!(traj.inputs.len(), 2000);
        for (x, u) in traj.states.iter().skip(1).zip(&traj.inputs) {
            assert_eq!(x[0], *u);
            assert!(x.iter().all(|v| (-1e-6..=1.0 + 1e-6).contains(v)));
        }
    }

    #[test]
    fn test_input_is_held_piecewise_constant() {
        let pde = ReactionDiffusion::new(5, 4).unwrap();
        let traj = pde.simulate(12, 2);
        for block in traj.inputs.chunks(4) {
            assert!(block.iter().all(|u| *u == block[0]));
        }
    }

    #[test]
    fn test_transitions_line_up() {
        let pde = ReactionDiffusion::new(7, 3).unwrap();
        let traj = pde.simulate(10, 0);
        let pairs = traj.transitions(&pde);
        assert_eq!(pairs.len(), 10);
        assert_eq!(pairs[4].next_state, pairs[5].state);
        assert_eq!(pairs[4].input.len(), MEASUREMENTS);
        assert_eq!(traj.measurements(&pde).len(), 10 * MEASUREMENTS);
        assert_eq!(traj.current_states().len(), 10 * 7);
        assert_eq!(traj.steps(), 10);
    }

    #[test]
    fn test_too_few_sites_rejected() {
        assert!(ReactionDiffusion::new(2, 1).is_err());
    }
}
