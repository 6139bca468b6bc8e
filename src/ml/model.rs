// ============================================================
// Layer 5 - Model Interfaces for Training
// ============================================================
// The trainer is generic over what it fits. Two families:
//
//   Regressor        static maps x → y (LBDN, PLNet)
//   StateSpaceModel  recurrent maps (x_t, u_t) → x_{t+1} (REN, R2DN)
//
// `Objective` turns a model plus a batch into a scalar loss.
// It is implemented once per batch kind, for every model of
// the matching family, so adding a model only means
// implementing Regressor or StateSpaceModel.
//
// Both objectives are mean-squared error:
//   static:    ‖f(x) - y‖²
//   recurrent: ‖x̂_{t+1} - x_{t+1}‖²  (one step from the true x_t)

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::data::batcher::{RegressionBatch, TransitionBatch};
use crate::ml::{lbdn::Lbdn, plnet::PlNet, recurrent::StateSpaceModel};

/// A static model with a batch-first forward pass.
pub trait Regressor<B: Backend> {
    /// x: [batch, inputs] → y: [batch, outputs]
    fn predict(&self, x: Tensor<B, 2>) -> Tensor<B, 2>;
}

impl<B: Backend> Regressor<B> for Lbdn<B> {
    fn predict(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(x)
    }
}

impl<B: Backend> Regressor<B> for PlNet<B> {
    fn predict(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(x)
    }
}

/// Scalar training loss of a model on one batch.
pub trait Objective<B: Backend, T> {
    fn batch_loss(&self, batch: T) -> Tensor<B, 1>;
}

impl<B: Backend, M: Regressor<B>> Objective<B, RegressionBatch<B>> for M {
    fn batch_loss(&self, batch: RegressionBatch<B>) -> Tensor<B, 1> {
        let prediction = self.predict(batch.inputs);
        MseLoss::new().forward(prediction, batch.targets, Reduction::Mean)
    }
}

impl<B: Backend, M: StateSpaceModel<B>> Objective<B, TransitionBatch<B>> for M {
    fn batch_loss(&self, batch: TransitionBatch<B>) -> Tensor<B, 1> {
        let (next, _) = self.simulate(batch.states, batch.inputs);
        MseLoss::new().forward(next, batch.targets, Reduction::Mean)
    }
}
