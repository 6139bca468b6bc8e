// ============================================================
// Layer 5 - Differentiable Linear Algebra
// ============================================================
// Dense matrix helpers built only from Burn tensor ops, so the
// autodiff backend can differentiate straight through them.
//
// The two workhorses are:
//
//   solve(M, R)   Gauss-Jordan elimination without pivoting.
//                 Valid whenever M + Mᵀ ≻ 0: every Schur
//                 complement keeps a positive-definite
//                 symmetric part, so no pivot can vanish.
//
//   cayley(XY)    Maps an unconstrained (n+m)×n matrix onto
//                 one with orthonormal columns:
//                   Z = X - Xᵀ + YᵀY
//                   A = (I+Z)⁻¹(I-Z),  B = -2 Y (I+Z)⁻¹
//                   [A; B]ᵀ [A; B] = I
//                 I + Z has symmetric part I + YᵀY ≻ 0, so it
//                 always satisfies the solve() precondition.
//
// Matrices here are small (tens of rows), so an O(n²) sequence
// of row operations is cheaper than leaving the autodiff graph.
//
// Reference: Trockman & Kolter (2021) Orthogonalizing Convolutional
//            Layers with the Cayley Transform

use burn::prelude::*;

/// Identity matrix of size n.
pub fn identity<B: Backend>(n: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut values = vec![0.0f32; n * n];
    for i in 0..n {
        values[i * n + i] = 1.0;
    }
    Tensor::from_data(TensorData::new(values, [n, n]), device)
}

/// 0/1 mask selecting entries strictly below the diagonal.
pub fn strictly_lower_mask<B: Backend>(n: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut values = vec![0.0f32; n * n];
    for i in 0..n {
        for j in 0..i {
            values[i * n + j] = 1.0;
        }
    }
    Tensor::from_data(TensorData::new(values, [n, n]), device)
}

/// Strictly lower-triangular part of a square matrix.
pub fn strictly_lower<B: Backend>(m: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, _] = m.dims();
    let mask = strictly_lower_mask::<B>(n, &m.device());
    m.mul(mask)
}

/// Main diagonal of a square matrix, as a vector.
pub fn diagonal<B: Backend>(m: Tensor<B, 2>) -> Tensor<B, 1> {
    let [n, _] = m.dims();
    let eye = identity::<B>(n, &m.device());
    m.mul(eye).sum_dim(1).reshape([n])
}

/// Frobenius norm, returned as a one-element tensor so it stays
/// on the autodiff tape.
pub fn frobenius_norm<B: Backend>(m: Tensor<B, 2>) -> Tensor<B, 1> {
    m.powf_scalar(2.0).sum().sqrt()
}

/// Rescale `m` so its Frobenius norm equals `target` (shape [1]).
///
/// This is the weight-normalisation step shared by the sandwich,
/// monotone and orthogonal layers: the direction comes from `m`,
/// the magnitude from a separately learned scalar.
pub fn rescale_to_norm<B: Backend>(m: Tensor<B, 2>, target: Tensor<B, 1>) -> Tensor<B, 2> {
    let norm = frobenius_norm(m.clone());
    let scale = target.div(norm).reshape([1, 1]);
    m.mul(scale)
}

/// Solve `m · X = rhs` for X.
///
/// `m` is n×n with a positive-definite symmetric part, `rhs` is n×k.
pub fn solve<B: Backend>(m: Tensor<B, 2>, rhs: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, _] = m.dims();
    let [_, k] = rhs.dims();
    let width = n + k;

    let augmented = Tensor::cat(vec![m, rhs], 1);
    let mut rows: Vec<Tensor<B, 2>> = (0..n)
        .map(|i| augmented.clone().slice([i..i + 1, 0..width]))
        .collect();

    for p in 0..n {
        // Normalise the pivot row so the pivot becomes 1
        let pivot = rows[p].clone().slice([0..1, p..p + 1]);
        let pivot_row = rows[p].clone().div(pivot);

        // Eliminate column p from every other row
        for (i, row) in rows.iter_mut().enumerate() {
            if i == p {
                continue;
            }
            let factor = row.clone().slice([0..1, p..p + 1]);
            *row = row.clone().sub(pivot_row.clone().mul(factor));
        }
        rows[p] = pivot_row;
    }

    Tensor::cat(rows, 0).slice([0..n, n..width])
}

/// Cayley transform of a tall matrix.
///
/// `xy` is (n+m)×n. Returns (A, B) with A n×n and B m×n such that
/// the stacked matrix [A; B] has orthonormal columns. For m = 0, A is
/// orthogonal and B is empty.
pub fn cayley<B: Backend>(xy: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [rows, n] = xy.dims();
    if rows == n {
        let device = xy.device();
        return (cayley_orthogonal(xy), Tensor::zeros([0, n], &device));
    }

    let x = xy.clone().slice([0..n, 0..n]);
    let y = xy.slice([n..rows, 0..n]);
    let eye = identity::<B>(n, &x.device());

    let z = x.clone() - x.transpose() + y.clone().transpose().matmul(y.clone());
    let i_plus_z = eye.clone() + z.clone();

    let a = solve(i_plus_z.clone(), eye - z);
    // Y (I+Z)⁻¹ = ((I+Z)⁻ᵀ Yᵀ)ᵀ
    let b = solve(i_plus_z.transpose(), y.transpose())
        .transpose()
        .mul_scalar(-2.0);
    (a, b)
}

/// Cayley transform of a square matrix: an orthogonal matrix.
pub fn cayley_orthogonal<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, _] = x.dims();
    let eye = identity::<B>(n, &x.device());
    let z = x.clone() - x.transpose();
    solve(eye.clone() + z.clone(), eye - z)
}

/// Copy a tensor's values back to the host as f32.
pub fn to_host<B: Backend, const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
    t.into_data().iter::<f32>().collect()
}
