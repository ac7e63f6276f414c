use log::debug;
use nalgebra::{DMatrix, DVector, Matrix4xX, Quaternion, UnitQuaternion, Vector4};

use crate::{
    attitude::{Knots, Satellite},
    constants::QUATERNION_NORM_EPSILON,
    error::Error,
    frame::{normalize, quaternion_to_wxyz, wxyz_to_quaternion},
    lsq,
};

/// [AttitudeSpline] models the attitude with four B-splines (one per
/// quaternion component, in w, x, y, z order) sharing the same [Knots].
/// The coefficient matrix is 4 x N: column `i` holds the four
/// coefficients attached to basis function `i`.
///
/// Coefficients are not constrained to unit norm, the interpolated
/// quaternion is normalized prior to describing a rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeSpline {
    knots: Knots,
    coeffs: Matrix4xX<f64>,
}

impl AttitudeSpline {
    /// Builds a new [AttitudeSpline]
    pub fn new(knots: Knots, coeffs: Matrix4xX<f64>) -> Result<Self, Error> {
        let expected = knots.num_coefficients();
        if coeffs.ncols() != expected {
            return Err(Error::CoefficientCount(coeffs.ncols(), expected));
        }
        Ok(Self { knots, coeffs })
    }

    /// Least squares fit of an [AttitudeSpline] to the attitude of given
    /// [Satellite], sampled at `sample_times`. Samples are sign aligned
    /// so the four components are continuous.
    pub fn fit(sat: &dyn Satellite, knots: Knots, sample_times: &[f64]) -> Result<Self, Error> {
        let num_coeffs = knots.num_coefficients();
        let mut normal = DMatrix::<f64>::zeros(num_coeffs, num_coeffs);
        let mut rhs = DMatrix::<f64>::zeros(num_coeffs, 4);

        let mut previous: Option<Vector4<f64>> = None;

        for t in sample_times.iter() {
            let (left, basis) = knots.basis_functions(*t)?;
            let first = left - knots.degree();

            let mut q = quaternion_to_wxyz(sat.attitude_at(*t).quaternion());
            if let Some(prev) = previous {
                if prev.dot(&q) < 0.0 {
                    q = -q;
                }
            }
            previous = Some(q);

            for (r, b_r) in basis.iter().enumerate() {
                for (s, b_s) in basis.iter().enumerate() {
                    normal[(first + r, first + s)] += b_r * b_s;
                }
                for c in 0..4 {
                    rhs[(first + r, c)] += b_r * q[c];
                }
            }
        }

        let mut coeffs = Matrix4xX::<f64>::zeros(num_coeffs);

        for c in 0..4 {
            let column = DVector::from_column_slice(rhs.column(c).as_slice());
            let solution = lsq::solve(&normal, &column, f64::EPSILON)?;
            coeffs.row_mut(c).copy_from(&solution.transpose());
        }

        debug!(
            "attitude spline fitted: {} coefficients over {} samples",
            num_coeffs,
            sample_times.len()
        );

        Self::new(knots, coeffs)
    }

    pub fn knots(&self) -> &Knots {
        &self.knots
    }

    pub fn degree(&self) -> usize {
        self.knots.degree()
    }

    /// Number of coefficient columns (N)
    pub fn num_coefficients(&self) -> usize {
        self.coeffs.ncols()
    }

    /// Coefficient matrix (4 x N, rows w, x, y, z)
    pub fn coefficients(&self) -> &Matrix4xX<f64> {
        &self.coeffs
    }

    /// Interpolated quaternion, from precomputed basis values
    /// `B_{L-k}(t) .. B_L(t)`.
    pub(crate) fn quaternion_from_basis(&self, left: usize, basis: &[f64]) -> Quaternion<f64> {
        let first = left - self.degree();
        let q = basis
            .iter()
            .enumerate()
            .fold(Vector4::<f64>::zeros(), |acc, (r, b)| {
                acc + self.coeffs.column(first + r) * *b
            });
        wxyz_to_quaternion(&q)
    }

    /// Raw (not normalized) interpolated quaternion at `t`
    pub fn quaternion(&self, t: f64) -> Result<Quaternion<f64>, Error> {
        let (left, basis) = self.knots.basis_functions(t)?;
        Ok(self.quaternion_from_basis(left, &basis))
    }

    /// Attitude at `t`: normalized interpolated quaternion
    pub fn attitude(&self, t: f64) -> Result<UnitQuaternion<f64>, Error> {
        normalize(&self.quaternion(t)?)
    }

    /// Adds increment `d`, laid out as N consecutive (w, x, y, z) blocks
    pub(crate) fn apply_increment(&mut self, d: &DVector<f64>) -> Result<(), Error> {
        let num_coeffs = self.num_coefficients();
        if d.nrows() != 4 * num_coeffs {
            return Err(Error::CoefficientCount(d.nrows() / 4, num_coeffs));
        }
        if !d.iter().all(|v| v.is_finite()) {
            return Err(Error::NonFiniteUpdate);
        }
        let update = Matrix4xX::from_column_slice(d.as_slice());
        self.coeffs += update;
        Ok(())
    }

    /// Normalizes each coefficient column to unit norm.
    /// This is numerical hygiene: it is not part of the least squares objective.
    pub fn normalize_coefficients(&mut self) -> Result<(), Error> {
        for mut column in self.coeffs.column_iter_mut() {
            let norm = column.norm();
            if norm < QUATERNION_NORM_EPSILON {
                return Err(Error::DegenerateQuaternion);
            }
            column /= norm;
        }
        Ok(())
    }
}
