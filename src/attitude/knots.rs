use std::ops::Range;

use itertools::Itertools;

use crate::error::Error;

/// B-spline [Knots] vector, shared by the four attitude components.
///
/// With `k` the degree and `N` the number of coefficients, the vector holds
/// `N + k + 1` values. Basis function `i` is non zero over
/// `[t_i, t_{i+k+1}[` and the spline is defined over `[t_k, t_N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Knots {
    values: Vec<f64>,
    degree: usize,
}

impl Knots {
    /// Builds [Knots] from non decreasing values.
    pub fn new(values: Vec<f64>, degree: usize) -> Result<Self, Error> {
        if degree == 0 {
            return Err(Error::InvalidSplineDegree(degree));
        }

        if values.len() < 2 * (degree + 1) {
            return Err(Error::InvalidKnots);
        }

        let sorted = values.iter().all(|t| t.is_finite())
            && values.iter().tuple_windows().all(|(t0, t1)| t1 >= t0);

        if !sorted {
            return Err(Error::InvalidKnots);
        }

        let s = Self { values, degree };
        let (start, end) = s.domain();

        if end <= start {
            return Err(Error::InvalidKnots);
        }

        Ok(s)
    }

    /// Builds clamped [Knots] over `[t_start, t_end]`, the boundary knots
    /// being repeated `degree + 1` times and `intervals` uniform intervals
    /// in between.
    pub fn clamped_uniform(
        t_start: f64,
        t_end: f64,
        intervals: usize,
        degree: usize,
    ) -> Result<Self, Error> {
        if intervals == 0 || t_end <= t_start {
            return Err(Error::InvalidKnots);
        }

        let step = (t_end - t_start) / intervals as f64;

        let mut values = Vec::with_capacity(intervals + 2 * degree + 1);
        values.extend(std::iter::repeat(t_start).take(degree));
        values.extend((0..intervals).map(|i| t_start + i as f64 * step));
        values.extend(std::iter::repeat(t_end).take(degree + 1));

        Self::new(values, degree)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Spline order (M = k + 1): number of basis functions
    /// that do not vanish at any given time.
    pub fn order(&self) -> usize {
        self.degree + 1
    }

    /// Number of coefficients (and basis functions)
    pub fn num_coefficients(&self) -> usize {
        self.values.len() - self.degree - 1
    }

    /// Definition domain
    pub fn domain(&self) -> (f64, f64) {
        (
            self.values[self.degree],
            self.values[self.num_coefficients()],
        )
    }

    /// Knot interval supporting basis function `i`, if it exists
    pub fn support(&self, i: usize) -> Option<(f64, f64)> {
        if i < self.num_coefficients() {
            Some((self.values[i], self.values[i + self.order()]))
        } else {
            None
        }
    }

    /// Left knot index of `t`: largest `L` such as `t_L <= t < t_{L+1}`.
    /// The domain end is attributed to the last non empty interval.
    pub fn left_index(&self, t: f64) -> Result<usize, Error> {
        let (start, end) = self.domain();

        if !(t >= start && t <= end) {
            return Err(Error::OutOfSplineDomain(t));
        }

        let index = if t < end {
            self.values.partition_point(|x| *x <= t) - 1
        } else {
            self.values.partition_point(|x| *x < end) - 1
        };

        Ok(index.clamp(self.degree, self.num_coefficients() - 1))
    }

    /// Indices of the basis functions whose support contains `t`.
    /// Always [Self::order] contiguous indices.
    pub fn spans_at(&self, t: f64) -> Result<Range<usize>, Error> {
        let left = self.left_index(t)?;
        Ok(left - self.degree..left + 1)
    }

    /// Evaluates the non vanishing basis functions at `t`
    /// (Cox - de Boor recursion).
    /// Returns left index `L` and values of `B_{L-k}(t) .. B_L(t)`.
    pub fn basis_functions(&self, t: f64) -> Result<(usize, Vec<f64>), Error> {
        let left = self.left_index(t)?;
        let k = self.degree;
        let knots = &self.values;

        let mut basis = vec![0.0; k + 1];
        let mut lhs = vec![0.0; k + 1];
        let mut rhs = vec![0.0; k + 1];

        basis[0] = 1.0;

        for j in 1..=k {
            lhs[j] = t - knots[left + 1 - j];
            rhs[j] = knots[left + j] - t;

            let mut saved = 0.0;

            for r in 0..j {
                let temp = basis[r] / (rhs[r + 1] + lhs[j - r]);
                basis[r] = saved + rhs[r + 1] * temp;
                saved = lhs[j - r] * temp;
            }

            basis[j] = saved;
        }

        Ok((left, basis))
    }
}
