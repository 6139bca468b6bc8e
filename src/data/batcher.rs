// ============================================================
// Layer 4 - Batchers
// ============================================================
// Implements Burn's Batcher trait to stack samples into
// tensors for the DataLoader.
//
//   RegressionBatch:  inputs  [N, d_in]     targets [N, d_out]
//   TransitionBatch:  states  [N, nx]
//                     inputs  [N, 1, nu]    (a length-1 sequence)
//                     targets [N, nx]
//
// Every sample in a dataset has the same widths, so stacking
// is a flatten followed by a reshape:
//   [s1_a, s1_b, s2_a, s2_b, ...] → [N, 2]
//
// The batchers hold no state; the DataLoader passes the device.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::{RegressionSample, TransitionSample};

/// Flatten equal-width rows into a [rows, width] tensor.
fn stack<B: Backend>(rows: Vec<&[f32]>, device: &B::Device) -> Tensor<B, 2> {
    let count = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    let flat: Vec<f32> = rows.into_iter().flatten().copied().collect();
    Tensor::from_data(TensorData::new(flat, [count, width]), device)
}

// ─── RegressionBatcher ───────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct RegressionBatch<B: Backend> {
    pub inputs: Tensor<B, 2>,
    pub targets: Tensor<B, 2>,
}

#[derive(Debug, Clone, Default)]
pub struct RegressionBatcher;

impl<B: Backend> Batcher<B, RegressionSample, RegressionBatch<B>> for RegressionBatcher {
    fn batch(&self, items: Vec<RegressionSample>, device: &B::Device) -> RegressionBatch<B> {
        let inputs = stack(items.iter().map(|s| s.input.as_slice()).collect(), device);
        let targets = stack(items.iter().map(|s| s.target.as_slice()).collect(), device);
        RegressionBatch { inputs, targets }
    }
}

// ─── TransitionBatcher ───────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TransitionBatch<B: Backend> {
    pub states: Tensor<B, 2>,
    pub inputs: Tensor<B, 3>,
    pub targets: Tensor<B, 2>,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionBatcher;

impl<B: Backend> Batcher<B, TransitionSample, TransitionBatch<B>> for TransitionBatcher {
    fn batch(&self, items: Vec<TransitionSample>, device: &B::Device) -> TransitionBatch<B> {
        let states = stack(items.iter().map(|s| s.state.as_slice()).collect(), device);
        let inputs: Tensor<B, 2> = stack(items.iter().map(|s| s.input.as_slice()).collect(), device);
        let targets = stack(items.iter().map(|s| s.next_state.as_slice()).collect(), device);

        let [count, nu] = inputs.dims();
        TransitionBatch {
            states,
            inputs: inputs.reshape([count, 1, nu]),
            targets,
        }
    }
}
