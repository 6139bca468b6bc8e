// Shared helpers for the ml unit tests.

use burn::prelude::*;

pub type TestBackend = burn::backend::NdArray;
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

pub fn device() -> <TestBackend as Backend>::Device {
    Default::default()
}

pub fn assert_all_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "index {i}: got {a}, expected {e} (tol {tol})"
        );
    }
}

/// Row-wise Euclidean distances between two [batch, n] tensors.
pub fn row_distances<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Vec<f32> {
    let [batch, _] = a.dims();
    let d = (a - b).powf_scalar(2.0).sum_dim(1).sqrt().reshape([batch]);
    crate::ml::linalg::to_host(d)
}
