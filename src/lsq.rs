//! Weighted least squares: normal equations `AᵀWA·d = AᵀWh`.
use log::error;
use nalgebra::{DMatrix, DVector};

use crate::error::Error;

/// Normal equations of a weighted least squares problem
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalEquations {
    /// Normal matrix AᵀWA
    pub n: DMatrix<f64>,
    /// Right hand side AᵀWh
    pub b: DVector<f64>,
}

impl NormalEquations {
    /// Creates empty (null) [NormalEquations] of given dimension
    pub fn new(dim: usize) -> Self {
        Self {
            n: DMatrix::zeros(dim, dim),
            b: DVector::zeros(dim),
        }
    }

    pub fn dim(&self) -> usize {
        self.b.nrows()
    }

    /// Accumulates one observation: design row `a`, residual `h`, weight `w`.
    pub fn accumulate(&mut self, a: &DVector<f64>, h: f64, w: f64) {
        self.n.ger(w, a, a, 1.0);
        self.b.axpy(w * h, a, 1.0);
    }

    /// Solves for the least squares increment.
    pub fn solve(&self, singularity_threshold: f64) -> Result<DVector<f64>, Error> {
        solve(&self.n, &self.b, singularity_threshold)
    }
}

/// Reciprocal condition number of the Jacobi scaled (unit diagonal)
/// symmetric matrix `n`, along with the scaling factors.
/// Returns 0 when one diagonal term is not strictly positive.
pub(crate) fn scaled_reciprocal_condition(n: &DMatrix<f64>) -> (f64, DVector<f64>) {
    let dim = n.nrows();
    let diag = n.diagonal();

    if diag.iter().any(|d| !(*d > 0.0) || !d.is_finite()) {
        return (0.0, DVector::zeros(dim));
    }

    let scale = diag.map(|d| 1.0 / d.sqrt());
    let scaled = DMatrix::from_fn(dim, dim, |i, j| n[(i, j)] * scale[i] * scale[j]);

    let singular_values = scaled.singular_values();
    let max = singular_values.max();
    let min = singular_values.min();

    if max > 0.0 && min.is_finite() {
        (min / max, scale)
    } else {
        (0.0, scale)
    }
}

/// Solves the symmetric system `n·x = b`. The system is Jacobi scaled
/// first; it is declared singular when the reciprocal condition number
/// of the scaled matrix falls below `singularity_threshold`.
pub(crate) fn solve(
    n: &DMatrix<f64>,
    b: &DVector<f64>,
    singularity_threshold: f64,
) -> Result<DVector<f64>, Error> {
    let (rcond, scale) = scaled_reciprocal_condition(n);

    if !(rcond >= singularity_threshold) {
        error!(
            "singular {}x{} normal equations: rcond={:.3E}",
            n.nrows(),
            n.ncols(),
            rcond
        );
        return Err(Error::SingularNormalEquations(rcond));
    }

    let dim = n.nrows();
    let scaled = DMatrix::from_fn(dim, dim, |i, j| n[(i, j)] * scale[i] * scale[j]);
    let rhs = b.component_mul(&scale);

    let y = scaled
        .lu()
        .solve(&rhs)
        .ok_or(Error::SingularNormalEquations(rcond))?;

    let x = y.component_mul(&scale);

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(Error::NonFiniteUpdate)
    }
}
