use itertools::Itertools;
use nalgebra::Vector5;

use crate::{
    error::Error,
    source::{AstrometricParameters, Source},
};

/// [CalcSource] holds the current estimate of one source,
/// the epochs it was observed at and the history of the solving process.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcSource {
    /// Readable name
    pub name: String,
    /// Radial proper motion (day⁻¹), not solved for
    pub mu_radial: f64,
    /// Mean color index
    pub mean_color: f64,
    /// Observation times (days since J2000), strictly increasing
    obs_times: Vec<f64>,
    /// Current estimate
    params: AstrometricParameters,
    /// Estimates prior to each iteration
    history: Vec<AstrometricParameters>,
    /// Sum of squared residuals prior to each iteration
    errors: Vec<f64>,
}

impl CalcSource {
    /// Creates a new [CalcSource] from initial guess.
    /// Observation times must be finite and strictly increasing.
    pub fn new(
        name: &str,
        obs_times: Vec<f64>,
        params: AstrometricParameters,
        mu_radial: f64,
        mean_color: f64,
    ) -> Result<Self, Error> {
        let sorted = obs_times.iter().all(|t| t.is_finite())
            && obs_times.iter().tuple_windows().all(|(t0, t1)| t1 > t0);

        if !sorted {
            return Err(Error::UnsortedObservationTimes(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            mu_radial,
            mean_color,
            obs_times,
            params,
            history: Vec::new(),
            errors: Vec::new(),
        })
    }

    /// Creates a [CalcSource] initialized with the parameters of a reference [Source].
    pub fn from_source(source: &Source, obs_times: Vec<f64>) -> Result<Self, Error> {
        Self::new(
            &format!("calc-{}", source.name),
            obs_times,
            source.params,
            source.mu_radial,
            source.mean_color,
        )
    }

    /// Copies and returns [CalcSource] with new initial guess.
    /// History is cleared.
    pub fn with_params(&self, params: AstrometricParameters) -> Self {
        let mut s = self.clone();
        s.params = params;
        s.reset_history();
        s
    }

    /// Copies and returns [CalcSource] with initial guess shifted by `offset`
    pub fn with_offset(&self, offset: &Vector5<f64>) -> Self {
        self.with_params(self.params.offset(offset))
    }

    /// Current estimate
    pub fn params(&self) -> &AstrometricParameters {
        &self.params
    }

    pub fn obs_times(&self) -> &[f64] {
        &self.obs_times
    }

    pub fn num_observations(&self) -> usize {
        self.obs_times.len()
    }

    /// Estimates prior to each iteration
    pub fn history(&self) -> &[AstrometricParameters] {
        &self.history
    }

    /// Sum of squared residuals of this source only, prior to each
    /// iteration. This is not the global error function, which sums
    /// over all sources: see `SolverState::errors_before` for that one.
    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Stores current state prior to an update
    pub(crate) fn record(&mut self, error: f64) {
        self.history.push(self.params);
        self.errors.push(error);
    }

    pub(crate) fn reset_history(&mut self) {
        self.history.clear();
        self.errors.clear();
    }

    /// Applies increment `d` to current estimate
    pub(crate) fn apply_increment(&mut self, d: &Vector5<f64>) -> Result<(), Error> {
        let updated = self.params.offset(d);
        if !updated.is_finite() {
            return Err(Error::NonFiniteUpdate);
        }
        self.params = updated;
        Ok(())
    }
}
