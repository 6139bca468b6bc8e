// ============================================================
// Layer 5 - State-Space Model Interface
// ============================================================
// Shared interface for the recurrent models (REN, R2DN).
//
// Every recurrent model is evaluated in two stages, mirroring
// the static networks: its direct parameters are converted once
// into explicit matrices, and the explicit model is then stepped
// through time. `rollout` does the stepping for any explicit
// model, so the time loop is written once.
//
// Shapes (batch-first):
//   state   [batch, states]
//   inputs  [batch, time, inputs]
//   outputs [batch, time, outputs]

use burn::prelude::*;

/// One step of an explicit state-space model.
pub trait StateSpaceStep<B: Backend> {
    /// (x_t, u_t) → (x_{t+1}, y_t)
    fn step(&self, x: Tensor<B, 2>, u: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>);

    /// Width of y_t.
    fn output_dim(&self) -> usize;
}

/// A trainable recurrent model.
pub trait StateSpaceModel<B: Backend> {
    fn state_dim(&self) -> usize;
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;

    /// Run the model over a whole input sequence from state x0.
    /// Returns the final state and the output sequence.
    fn simulate(&self, x0: Tensor<B, 2>, inputs: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 3>);

    /// Zero initial state for a batch.
    fn init_state(&self, batch: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([batch, self.state_dim()], device)
    }
}

/// Step an explicit model through time.
pub fn rollout<B: Backend, S: StateSpaceStep<B>>(
    model: &S,
    x0: Tensor<B, 2>,
    inputs: Tensor<B, 3>,
) -> (Tensor<B, 2>, Tensor<B, 3>) {
    let [batch, time, nu] = inputs.dims();
    if time == 0 {
        // Nothing to step through: the state is unchanged and no outputs exist
        let device = x0.device();
        return (x0, Tensor::zeros([batch, 0, model.output_dim()], &device));
    }

    let mut x = x0;
    let mut outputs = Vec::with_capacity(time);

    for t in 0..time {
        let u = inputs.clone().slice([0..batch, t..t + 1, 0..nu]).reshape([batch, nu]);
        let (next, y) = model.step(x, u);
        let [_, ny] = y.dims();
        outputs.push(y.reshape([batch, 1, ny]));
        x = next;
    }

    (x, Tensor::cat(outputs, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{linalg::to_host, testing::{device, TestBackend}};

    /// x⁺ = 0.5 x + u, y = x
    struct Halving;

    impl StateSpaceStep<TestBackend> for Halving {
        fn step(
            &self,
            x: Tensor<TestBackend, 2>,
            u: Tensor<TestBackend, 2>,
        ) -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
            (x.clone().mul_scalar(0.5) + u, x)
        }

        fn output_dim(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_rollout_orders_time_steps() {
        let x0 = Tensor::<TestBackend, 2>::from_floats([[4.0]], &device());
        let u = Tensor::<TestBackend, 3>::from_floats([[[0.0], [1.0], [0.0]]], &device());
        let (x_final, y) = rollout(&Halving, x0, u);
        assert_eq!(y.dims(), [1, 3, 1]);
        // x: 4 → 2 → 2 → 1
        assert_eq!(to_host(y), vec![4.0, 2.0, 2.0]);
        assert_eq!(to_host(x_final), vec![1.0]);
    }

    #[test]
    fn test_empty_sequence_keeps_state() {
        let x0 = Tensor::<TestBackend, 2>::from_floats([[4.0], [-1.0]], &device());
        let u = Tensor::<TestBackend, 3>::zeros([2, 0, 1], &device());
        let (x_final, y) = rollout(&Halving, x0, u);
        assert_eq!(y.dims(), [2, 0, 1]);
        assert_eq!(to_host(x_final), vec![4.0, -1.0]);
    }
}
