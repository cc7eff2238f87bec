//! Dense latent factor storage and the Cholesky solver.

use crate::error::{FactorusError, Result};
use ndarray::{s, Array1, Array2, ArrayView1};

/// A dense matrix of latent factors. One row per user or item.
#[derive(Debug, Clone, PartialEq)]
pub struct Factors {
    data: Array2<f64>,
}

impl Factors {
    /// Creates `rows` zero vectors of length `dim`.
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            data: Array2::zeros((rows, dim)),
        }
    }

    /// Creates small deterministic pseudo-random factors.
    ///
    /// Uses a linear congruential generator so that the same seed always
    /// produces the same starting point.
    pub fn seeded(rows: usize, dim: usize, seed: u64) -> Self {
        let mut state = seed.wrapping_mul(31).wrapping_add(17);
        let data = Array2::from_shape_fn((rows, dim), |_| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let unit = ((state / 65536) % 32768) as f64 / 32768.0;
            (unit - 0.5) * 0.1
        });

        Self { data }
    }

    /// Stacks solved rows back into a factor matrix.
    pub(crate) fn from_rows(dim: usize, rows: Vec<Array1<f64>>) -> Self {
        let mut data = Array2::zeros((rows.len(), dim));
        for (mut target, row) in data.rows_mut().into_iter().zip(rows.iter()) {
            target.assign(row);
        }
        Self { data }
    }

    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    /// Keeps only the first `rows` rows.
    pub fn truncate(&mut self, rows: usize) {
        self.data = self.data.slice(s![..rows, ..]).to_owned();
    }

    /// Computes the `dim x dim` Gram matrix `FᵀF`.
    pub fn gram(&self) -> Array2<f64> {
        self.data.t().dot(&self.data)
    }
}

/// Solves `A x = b` for a symmetric positive definite `A` via Cholesky
/// decomposition.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum = l.slice(s![i, ..j]).dot(&l.slice(s![j, ..j]));
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(FactorusError::solver("matrix is not positive definite"));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum = l.slice(s![i, ..i]).dot(&y.slice(s![..i]));
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum = l.slice(s![i + 1.., i]).dot(&x.slice(s![i + 1..]));
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

/// Cosine similarity of two vectors. Zero vectors have similarity 0.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    a.dot(&b) / (norm_a * norm_b)
}
