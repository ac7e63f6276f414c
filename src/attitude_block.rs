//! Attitude block: banded normal equations over the spline coefficients.
//!
//! Basis functions `n` and `m` only overlap when `|n - m| <= k`, so the
//! 4N x 4N normal matrix is made of 4x4 blocks, all null outside that band.
use std::collections::BTreeMap;

use log::debug;
use nalgebra::{DVector, Matrix4, Quaternion, Vector3, Vector4};

use crate::{
    attitude::{AttitudeSpline, BasisSupport, ObservationIndex},
    constants::QUATERNION_NORM_EPSILON,
    error::Error,
    frame::{mnu, quaternion_to_wxyz, scan_angles, vector_to_quaternion},
    lsq::NormalEquations,
    residual::ResidualEngine,
};

/// Gradient of the residual with respect to the raw (not normalized)
/// interpolated quaternion `q`, given the calculated SRS direction.
pub(crate) fn residual_gradient(
    q: &Quaternion<f64>,
    v_srs: &Vector3<f64>,
) -> Result<Vector4<f64>, Error> {
    let norm = q.norm();
    if norm < QUATERNION_NORM_EPSILON {
        return Err(Error::DegenerateQuaternion);
    }

    let q_hat = *q / norm;
    let (phi, zeta) = scan_angles(v_srs);
    let (m, n, _) = mnu(phi, zeta);
    let sec_zeta = 1.0 / zeta.cos();

    let qn = quaternion_to_wxyz(&(q_hat * vector_to_quaternion(&n)));
    let qm = quaternion_to_wxyz(&(q_hat * vector_to_quaternion(&m)));

    Ok((qn * (2.0 * sec_zeta) - qm * 2.0) / norm)
}

/// Contribution of one observation, shared by all the blocks it touches
#[derive(Debug, Clone)]
struct ObservationTerm {
    /// `∂R/∂q ∂R/∂qᵀ + 4λ² q qᵀ`
    normal: Matrix4<f64>,
    /// `∂R/∂q R − 2λ² q D`
    rhs: Vector4<f64>,
}

/// Arena of the non null 4x4 blocks, keyed by (n, m) with n <= m
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockArena {
    num_coeffs: usize,
    blocks: BTreeMap<(usize, usize), Matrix4<f64>>,
    rhs: Vec<Vector4<f64>>,
}

impl BlockArena {
    /// Number of stored (upper triangle) blocks
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[cfg(test)]
    pub fn block(&self, n: usize, m: usize) -> Option<&Matrix4<f64>> {
        self.blocks.get(&(n, m))
    }

    /// Reduces the arena into dense [NormalEquations]. The lower
    /// triangle mirrors the upper one.
    pub fn into_normal_equations(self) -> NormalEquations {
        let mut normal = NormalEquations::new(4 * self.num_coeffs);

        for ((n, m), block) in self.blocks.iter() {
            normal
                .n
                .fixed_view_mut::<4, 4>(4 * n, 4 * m)
                .copy_from(block);
            if n != m {
                normal
                    .n
                    .fixed_view_mut::<4, 4>(4 * m, 4 * n)
                    .copy_from(&block.transpose());
            }
        }

        for (n, b) in self.rhs.iter().enumerate() {
            normal.b.fixed_rows_mut::<4>(4 * n).copy_from(b);
        }

        normal
    }
}

/// Builds the [BlockArena] of the attitude normal equations.
pub(crate) fn blocks(
    engine: &ResidualEngine,
    spline: &AttitudeSpline,
    index: &ObservationIndex,
    support: &BasisSupport,
) -> Result<BlockArena, Error> {
    let lambda_2 = engine.cfg().regularisation_factor.powi(2);
    let num_coeffs = spline.num_coefficients();
    let degree = spline.degree();

    let mut terms = Vec::with_capacity(index.len());

    for (j, t) in index.times().iter().enumerate() {
        let star = index.star_of(*t)?;

        let q = spline.quaternion_from_basis(support.left_index(j), support.values(j));
        let v_srs = engine.calculated_direction(star, *t)?;
        let gradient = residual_gradient(&q, &v_srs)?;
        let residual = engine.residual(star, *t)?;

        let q = quaternion_to_wxyz(&q);
        let deviation = 1.0 - q.norm_squared();

        terms.push(ObservationTerm {
            normal: gradient * gradient.transpose() + q * q.transpose() * (4.0 * lambda_2),
            rhs: gradient * residual - q * (2.0 * lambda_2 * deviation),
        });
    }

    let mut arena = BlockArena {
        num_coeffs,
        blocks: BTreeMap::new(),
        rhs: vec![Vector4::zeros(); num_coeffs],
    };

    for n in 0..num_coeffs {
        for m in n..(n + degree + 1).min(num_coeffs) {
            let block = support
                .common_support(n, m)
                .fold(Matrix4::<f64>::zeros(), |acc, j| {
                    acc + terms[j].normal * (support.basis(n, j) * support.basis(m, j))
                });
            arena.blocks.insert((n, m), block);
        }

        arena.rhs[n] = -support
            .times_in_support(n)
            .iter()
            .fold(Vector4::<f64>::zeros(), |acc, j| {
                acc + terms[*j].rhs * support.basis(n, *j)
            });
    }

    debug!(
        "attitude normal equations: {} observations, {} blocks",
        terms.len(),
        arena.num_blocks(),
    );

    Ok(arena)
}

/// Solves for the 4N attitude increment. Nothing is applied.
pub(crate) fn solve(
    engine: &ResidualEngine,
    spline: &AttitudeSpline,
    index: &ObservationIndex,
    support: &BasisSupport,
) -> Result<DVector<f64>, Error> {
    let normal = blocks(engine, spline, index, support)?.into_normal_equations();
    debug!("solving {}x{} attitude system", normal.dim(), normal.dim());
    normal.solve(engine.cfg().singularity_threshold)
}
