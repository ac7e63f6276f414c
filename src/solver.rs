//! AGIS solver
use log::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    attitude::{attitude_error, AttitudeSpline, BasisSupport, ObservationIndex, Satellite},
    attitude_block,
    cfg::{Config, UpdateMode},
    error::Error,
    residual::ResidualEngine,
    source::{CalcSource, Source},
    source_block,
};

/// [SolverState] gathers the diagnostics of the iterations run so far.
/// It is handed over to each pass, which returns it updated.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverState {
    /// Number of passes run so far
    pub iterations: usize,
    /// Error function prior to each pass
    pub errors_before: Vec<f64>,
    /// Error function after each pass
    pub errors_after: Vec<f64>,
    /// Attitude fit diagnostic after each attitude pass
    pub attitude_errors: Vec<f64>,
}

impl SolverState {
    /// Last error function value, if any pass was run
    pub fn last_error(&self) -> Option<f64> {
        self.errors_after.last().copied()
    }
}

/// [Solver] refines either the source parameters or the attitude
/// spline, depending on the [UpdateMode] selected in [Config].
pub struct Solver {
    /// Solver parametrization
    cfg: Config,
    /// Ground truth [Satellite]
    satellite: Box<dyn Satellite>,
    /// Reference sources, synthesizing the observations
    real_sources: Vec<Source>,
    /// Estimated sources, index matching `real_sources`
    calc_sources: Vec<CalcSource>,
    /// Attitude model
    attitude: Option<AttitudeSpline>,
    /// All observation times
    index: ObservationIndex,
    /// Basis functions per observation (attitude mode only)
    support: Option<BasisSupport>,
    /// Diagnostics
    state: SolverState,
}

impl Solver {
    /// Creates a new [Solver].
    /// ## Input
    /// - cfg: [Config] preset
    /// - satellite: ground truth [Satellite] (attitude and ephemeris)
    /// - real_sources: reference [Source]s
    /// - calc_sources: initial [CalcSource] estimates, one per reference
    /// - attitude: [AttitudeSpline] model, required in attitude mode
    pub fn new(
        cfg: Config,
        satellite: Box<dyn Satellite>,
        real_sources: Vec<Source>,
        calc_sources: Vec<CalcSource>,
        attitude: Option<AttitudeSpline>,
    ) -> Result<Self, Error> {
        cfg.validate()?;

        if real_sources.len() != calc_sources.len() {
            return Err(Error::SourceCountMismatch(
                real_sources.len(),
                calc_sources.len(),
            ));
        }

        let index = ObservationIndex::new(&calc_sources)?;

        let support = match cfg.mode {
            UpdateMode::Attitude => {
                let spline = attitude.as_ref().ok_or(Error::MissingAttitudeModel)?;
                if spline.degree() != cfg.spline_degree {
                    return Err(Error::InvalidSplineDegree(spline.degree()));
                }
                if cfg.regularisation_factor == 0.0 {
                    warn!("attitude update without regularisation: normal equations are singular");
                }
                Some(BasisSupport::new(spline.knots(), index.times())?)
            },
            UpdateMode::Source | UpdateMode::ScannedSource => None,
        };

        info!(
            "deployed {} solver: {} sources, {} observations",
            cfg.mode,
            calc_sources.len(),
            index.len()
        );

        Ok(Self {
            cfg,
            satellite,
            real_sources,
            calc_sources,
            attitude,
            index,
            support,
            state: SolverState::default(),
        })
    }

    fn engine(&self) -> ResidualEngine<'_> {
        ResidualEngine::new(
            &self.cfg,
            self.satellite.as_ref(),
            &self.real_sources,
            &self.calc_sources,
            self.attitude.as_ref(),
        )
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Current source estimates
    pub fn calc_sources(&self) -> &[CalcSource] {
        &self.calc_sources
    }

    /// Current attitude model
    pub fn attitude(&self) -> Option<&AttitudeSpline> {
        self.attitude.as_ref()
    }

    /// All observation times
    pub fn observation_times(&self) -> &[f64] {
        self.index.times()
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    /// Sum of squared residuals, over all sources and observations
    pub fn error_function(&self) -> Result<f64, Error> {
        self.engine().error_function()
    }

    /// Residual of source `star` at `t`
    pub fn residual(&self, star: usize, t: f64) -> Result<f64, Error> {
        self.engine().residual(star, t)
    }

    /// Residual of the observation made at `t`
    pub fn residual_at(&self, t: f64) -> Result<f64, Error> {
        let star = self.index.star_of(t)?;
        self.residual(star, t)
    }

    /// Clears the diagnostics and the source histories.
    /// Estimates are preserved.
    pub fn reset_iterations(&mut self) {
        self.state = SolverState::default();
        for calc in self.calc_sources.iter_mut() {
            calc.reset_history();
        }
    }

    /// Runs exactly `n` passes, refining the block selected by [UpdateMode].
    pub fn iterate(&mut self, n: usize) -> Result<&SolverState, Error> {
        for _ in 0..n {
            self.state = self.run_pass(self.state.clone())?;
        }
        Ok(&self.state)
    }

    fn run_pass(&mut self, mut state: SolverState) -> Result<SolverState, Error> {
        let before = self.error_function()?;

        info!("iteration #{}", state.iterations + 1);
        info!("error before: {:.6E}", before);

        if self.cfg.mode.updates_sources() {
            self.update_sources()?;
        } else {
            let attitude_error = self.update_attitude()?;
            info!("attitude error: {:.6E}", attitude_error);
            state.attitude_errors.push(attitude_error);
        }

        let after = self.error_function()?;
        info!("error after: {:.6E}", after);

        state.iterations += 1;
        state.errors_before.push(before);
        state.errors_after.push(after);

        Ok(state)
    }

    fn update_sources(&mut self) -> Result<(), Error> {
        let updates = {
            let engine = self.engine();
            (0..self.calc_sources.len())
                .map(|star| {
                    let error = engine.source_error(star)?;
                    let d = source_block::solve(&engine, star)?;
                    Ok((error, d))
                })
                .collect::<Result<Vec<_>, Error>>()?
        };

        for (calc, (error, d)) in self.calc_sources.iter_mut().zip(updates.iter()) {
            calc.record(*error);
            calc.apply_increment(d)?;

            debug!("{}: {}", calc.name, calc.params());

            if calc.params().parallax < 0.0 {
                warn!("{}: negative parallax {:.6E}", calc.name, calc.params().parallax);
            }
        }

        Ok(())
    }

    /// Updates the attitude spline, returns the attitude fit diagnostic
    fn update_attitude(&mut self) -> Result<f64, Error> {
        let d = {
            let spline = self.attitude.as_ref().ok_or(Error::MissingAttitudeModel)?;
            let support = self.support.as_ref().ok_or(Error::MissingAttitudeModel)?;
            attitude_block::solve(&self.engine(), spline, &self.index, support)?
        };

        let spline = self.attitude.as_mut().ok_or(Error::MissingAttitudeModel)?;

        spline.apply_increment(&d)?;

        if self.cfg.normalize_coefficients {
            spline.normalize_coefficients()?;
        }

        attitude_error(self.index.times(), self.satellite.as_ref(), spline)
    }
}
