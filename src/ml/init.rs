// ============================================================
// Layer 5 - Parameter Initialisation
// ============================================================
// Random parameters are drawn on the host from a seeded StdRng
// and uploaded as tensors. Runs are reproducible from the
// config seed on every backend, independent of how the backend
// seeds its own generator.

use burn::{module::Param, prelude::*};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

pub struct ParamInit {
    rng: StdRng,
}

impl ParamInit {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Entries drawn i.i.d. from N(0, std²).
    pub fn normal<B: Backend, const D: usize>(
        &mut self,
        shape: [usize; D],
        std: f64,
        device: &B::Device,
    ) -> Tensor<B, D> {
        let count: usize = shape.iter().product();
        let values: Vec<f32> = (0..count)
            .map(|_| {
                let z: f64 = self.rng.sample(StandardNormal);
                (z * std) as f32
            })
            .collect();
        Tensor::from_data(TensorData::new(values, shape), device)
    }

    /// Glorot-normal matrix: std = √(2 / (rows + cols)).
    pub fn glorot_normal<B: Backend>(
        &mut self,
        rows: usize,
        cols: usize,
        device: &B::Device,
    ) -> Tensor<B, 2> {
        let std = (2.0 / (rows + cols) as f64).sqrt();
        self.normal([rows, cols], std, device)
    }

    /// Trainable Glorot-normal matrix.
    pub fn glorot_param<B: Backend>(
        &mut self,
        rows: usize,
        cols: usize,
        device: &B::Device,
    ) -> Param<Tensor<B, 2>> {
        Param::from_tensor(self.glorot_normal(rows, cols, device))
    }

    /// Trainable vector with small normal entries.
    pub fn small_vector<B: Backend>(
        &mut self,
        len: usize,
        std: f64,
        device: &B::Device,
    ) -> Param<Tensor<B, 1>> {
        Param::from_tensor(self.normal([len], std, device))
    }
}

/// Trainable vector of zeros.
pub fn zeros_param<B: Backend>(len: usize, device: &B::Device) -> Param<Tensor<B, 1>> {
    Param::from_tensor(Tensor::zeros([len], device))
}

/// Trainable matrix of zeros.
pub fn zeros_matrix_param<B: Backend>(
    rows: usize,
    cols: usize,
    device: &B::Device,
) -> Param<Tensor<B, 2>> {
    Param::from_tensor(Tensor::zeros([rows, cols], device))
}

/// Trainable scalar stored as a one-element vector.
pub fn scalar_param<B: Backend>(value: f32, device: &B::Device) -> Param<Tensor<B, 1>> {
    Param::from_tensor(Tensor::from_floats([value], device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{linalg::to_host, testing::{device, TestBackend}};

    #[test]
    fn test_same_seed_same_values() {
        let a = ParamInit::new(7).glorot_normal::<TestBackend>(4, 3, &device());
        let b = ParamInit::new(7).glorot_normal::<TestBackend>(4, 3, &device());
        assert_eq!(to_host(a), to_host(b));
    }

    #[test]
    fn test_normal_scale_is_roughly_right() {
        let t = ParamInit::new(1).normal::<TestBackend, 1>([4000], 0.5, &device());
        let values = to_host(t);
        let var = values.iter().map(|v| (*v as f64).powi(2)).sum::<f64>() / values.len() as f64;
        assert!((var.sqrt() - 0.5).abs() < 0.05, "std was {}", var.sqrt());
    }
}
