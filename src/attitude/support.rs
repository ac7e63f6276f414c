use std::collections::HashMap;

use itertools::Itertools;

use crate::{attitude::Knots, error::Error, source::CalcSource};

/// Hashable key of an observation time. `+ 0.0` folds -0.0 onto 0.0.
fn time_key(t: f64) -> u64 {
    (t + 0.0).to_bits()
}

/// [ObservationIndex] merges the observation times of all sources into a
/// single, strictly increasing, time line and remembers which source
/// was observed at each time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationIndex {
    times: Vec<f64>,
    stars: Vec<usize>,
    lookup: HashMap<u64, usize>,
}

impl ObservationIndex {
    /// Builds the [ObservationIndex]. One time may only be attributed to one source.
    pub fn new(sources: &[CalcSource]) -> Result<Self, Error> {
        let merged = sources
            .iter()
            .enumerate()
            .map(|(star, source)| source.obs_times().iter().map(move |t| (*t, star)))
            .kmerge_by(|(t0, _), (t1, _)| t0 < t1);

        let mut s = Self::default();

        for (t, star) in merged {
            if s.lookup.insert(time_key(t), s.times.len()).is_some() {
                return Err(Error::DuplicateObservationTime(t));
            }
            s.times.push(t);
            s.stars.push(star);
        }

        Ok(s)
    }

    /// All observation times, strictly increasing
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Source observed at `j`-th time
    pub fn star_at(&self, j: usize) -> Option<usize> {
        self.stars.get(j).copied()
    }

    /// Position of `t` on the time line
    pub fn position(&self, t: f64) -> Result<usize, Error> {
        self.lookup
            .get(&time_key(t))
            .copied()
            .ok_or(Error::UnknownObservationTime(t))
    }

    /// Source observed at `t`
    pub fn star_of(&self, t: f64) -> Result<usize, Error> {
        Ok(self.stars[self.position(t)?])
    }
}

/// [BasisSupport] caches, for each observation time, the non vanishing
/// basis functions, and for each basis function, the observations that
/// fall in its support.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BasisSupport {
    degree: usize,
    left_indices: Vec<usize>,
    values: Vec<Vec<f64>>,
    observations: Vec<Vec<usize>>,
}

impl BasisSupport {
    /// Builds the [BasisSupport] of `times` (sorted) on given [Knots].
    pub(crate) fn new(knots: &Knots, times: &[f64]) -> Result<Self, Error> {
        let mut left_indices = Vec::with_capacity(times.len());
        let mut values = Vec::with_capacity(times.len());
        let mut observations = vec![Vec::new(); knots.num_coefficients()];

        for (j, t) in times.iter().enumerate() {
            let (left, basis) = knots.basis_functions(*t)?;
            for span in left - knots.degree()..=left {
                observations[span].push(j);
            }
            left_indices.push(left);
            values.push(basis);
        }

        Ok(Self {
            degree: knots.degree(),
            left_indices,
            values,
            observations,
        })
    }

    /// Left knot index of `j`-th observation
    pub(crate) fn left_index(&self, j: usize) -> usize {
        self.left_indices[j]
    }

    /// Basis functions that do not vanish at `j`-th observation
    pub(crate) fn spans_at(&self, j: usize) -> std::ops::Range<usize> {
        let left = self.left_indices[j];
        left - self.degree..left + 1
    }

    /// Non vanishing basis values at `j`-th observation
    pub(crate) fn values(&self, j: usize) -> &[f64] {
        &self.values[j]
    }

    /// Value of basis function `i` at `j`-th observation (0 outside its support)
    pub(crate) fn basis(&self, i: usize, j: usize) -> f64 {
        let spans = self.spans_at(j);
        if spans.contains(&i) {
            self.values[j][i - spans.start]
        } else {
            0.0
        }
    }

    /// Observations falling in the support of basis function `i`
    pub(crate) fn times_in_support(&self, i: usize) -> &[usize] {
        &self.observations[i]
    }

    /// Observations in the support of both `n` and `m` basis functions
    pub(crate) fn common_support(&self, n: usize, m: usize) -> impl Iterator<Item = usize> + '_ {
        let (first, other) = if n <= m { (n, m) } else { (m, n) };
        self.observations[first]
            .iter()
            .copied()
            .filter(move |j| self.spans_at(*j).contains(&other))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::AstrometricParameters;

    fn calc(name: &str, times: Vec<f64>) -> CalcSource {
        CalcSource::new(name, times, AstrometricParameters::default(), 0.0, 0.0).unwrap()
    }

    #[test]
    fn merged_time_line() {
        let sources = vec![
            calc("a", vec![0.0, 2.0, 4.0]),
            calc("b", vec![1.0, 3.0]),
            calc("c", vec![]),
        ];
        let index = ObservationIndex::new(&sources).unwrap();
        assert_eq!(index.times(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(index.len(), 5);
        assert_eq!(index.star_at(1), Some(1));
        assert_eq!(index.star_at(5), None);
        assert_eq!(index.star_of(4.0), Ok(0));
        assert_eq!(index.star_of(-0.0), Ok(0));
        assert_eq!(index.position(3.0), Ok(3));
        assert_eq!(index.star_of(2.5), Err(Error::UnknownObservationTime(2.5)));
    }

    #[test]
    fn duplicate_time() {
        let sources = vec![calc("a", vec![0.0, 2.0]), calc("b", vec![2.0])];
        assert_eq!(
            ObservationIndex::new(&sources),
            Err(Error::DuplicateObservationTime(2.0))
        );
    }

    #[test]
    fn support_bookkeeping() {
        let knots = Knots::clamped_uniform(0.0, 10.0, 10, 3).unwrap();
        let times = (0..=40).map(|i| i as f64 * 0.25).collect::<Vec<_>>();
        let support = BasisSupport::new(&knots, &times).unwrap();

        for (j, t) in times.iter().enumerate() {
            let spans = support.spans_at(j);
            assert_eq!(spans.len(), knots.order());
            assert_eq!(spans, knots.spans_at(*t).unwrap());
            let sum: f64 = (0..knots.num_coefficients())
                .map(|i| support.basis(i, j))
                .sum();
            assert!((sum - 1.0).abs() < 1.0E-12);
        }

        for i in 0..knots.num_coefficients() {
            for j in support.times_in_support(i) {
                assert!(support.spans_at(*j).contains(&i));
            }
        }

        // far apart basis functions do not overlap
        assert_eq!(support.common_support(0, 4).count(), 0);

        let common = support.common_support(5, 3).collect::<Vec<_>>();
        assert!(!common.is_empty());
        for j in common {
            assert!(support.spans_at(j).contains(&3) && support.spans_at(j).contains(&5));
        }
    }

    #[test]
    fn out_of_domain_observation() {
        let knots = Knots::clamped_uniform(0.0, 10.0, 10, 3).unwrap();
        assert_eq!(
            BasisSupport::new(&knots, &[1.0, 11.0]),
            Err(Error::OutOfSplineDomain(11.0))
        );
    }
}
