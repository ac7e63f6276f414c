//! Observed vs calculated field angles.
use nalgebra::{UnitQuaternion, Vector3};

use crate::{
    attitude::{AttitudeSpline, Satellite},
    cfg::{Config, UpdateMode},
    error::Error,
    frame::{field_angles, lmn_to_xyz, rotation_to_x_axis, FieldAngles},
    source::{CalcSource, Source},
};

/// [ResidualEngine] evaluates residuals and the error functional
/// from a read only view of the solver state.
pub(crate) struct ResidualEngine<'a> {
    cfg: &'a Config,
    sat: &'a dyn Satellite,
    real_sources: &'a [Source],
    calc_sources: &'a [CalcSource],
    attitude: Option<&'a AttitudeSpline>,
}

impl<'a> ResidualEngine<'a> {
    pub fn new(
        cfg: &'a Config,
        sat: &'a dyn Satellite,
        real_sources: &'a [Source],
        calc_sources: &'a [CalcSource],
        attitude: Option<&'a AttitudeSpline>,
    ) -> Self {
        Self {
            cfg,
            sat,
            real_sources,
            calc_sources,
            attitude,
        }
    }

    pub fn cfg(&self) -> &Config {
        self.cfg
    }

    pub fn satellite(&self) -> &dyn Satellite {
        self.sat
    }

    pub fn real_source(&self, star: usize) -> Result<&Source, Error> {
        self.real_sources
            .get(star)
            .ok_or(Error::UnknownSource(star))
    }

    pub fn calc_source(&self, star: usize) -> Result<&CalcSource, Error> {
        self.calc_sources
            .get(star)
            .ok_or(Error::UnknownSource(star))
    }

    /// Attitude isolating the reference source: its topocentric
    /// direction lies on the SRS x axis.
    fn source_attitude(&self, star: usize, t: f64) -> Result<UnitQuaternion<f64>, Error> {
        let source = self.real_source(star)?;
        let u = source.topocentric_direction(self.sat, t, self.cfg.romer_delay);
        rotation_to_x_axis(&u)
    }

    /// Attitude used to form the observed angles
    pub fn observed_attitude(&self, star: usize, t: f64) -> Result<UnitQuaternion<f64>, Error> {
        match self.cfg.mode {
            UpdateMode::Source => self.source_attitude(star, t),
            UpdateMode::ScannedSource | UpdateMode::Attitude => Ok(self.sat.attitude_at(t)),
        }
    }

    /// Attitude used to form the calculated angles
    pub fn calculated_attitude(&self, star: usize, t: f64) -> Result<UnitQuaternion<f64>, Error> {
        match self.cfg.mode {
            UpdateMode::Source => self.source_attitude(star, t),
            UpdateMode::ScannedSource => Ok(self.sat.attitude_at(t)),
            UpdateMode::Attitude => match self.attitude {
                Some(spline) => spline.attitude(t),
                None => Err(Error::MissingAttitudeModel),
            },
        }
    }

    /// Calculated source direction, expressed in the calculated SRS
    pub fn calculated_direction(&self, star: usize, t: f64) -> Result<Vector3<f64>, Error> {
        let calc = self.calc_source(star)?;
        let b_g = self.sat.barycentric_position_at(t);
        let u = calc
            .params()
            .topocentric_direction(calc.mu_radial, &b_g, t, self.cfg.romer_delay);
        let attitude = self.calculated_attitude(star, t)?;
        Ok(lmn_to_xyz(&attitude, &u))
    }

    /// Along scan chromatic shift
    fn chromatic_shift(&self, color: f64) -> f64 {
        self.cfg.chromatic_coefficient * color
    }

    /// Observed [FieldAngles] of reference source `star` at `t`
    pub fn observed_angles(&self, star: usize, t: f64) -> Result<FieldAngles, Error> {
        let source = self.real_source(star)?;
        let u = source.topocentric_direction(self.sat, t, self.cfg.romer_delay);
        let attitude = self.observed_attitude(star, t)?;
        let mut angles = field_angles(&lmn_to_xyz(&attitude, &u), self.cfg.double_telescope);
        angles.eta += self.chromatic_shift(source.color_at(t));
        Ok(angles)
    }

    /// Calculated [FieldAngles] of source `star` at `t`
    pub fn calculated_angles(&self, star: usize, t: f64) -> Result<FieldAngles, Error> {
        let calc = self.calc_source(star)?;
        let v = self.calculated_direction(star, t)?;
        let mut angles = field_angles(&v, self.cfg.double_telescope);
        angles.eta += self.chromatic_shift(calc.mean_color);
        Ok(angles)
    }

    /// Scalar residual `(η_obs − η_calc) + (ζ_obs − ζ_calc)`
    pub fn residual(&self, star: usize, t: f64) -> Result<f64, Error> {
        let observed = self.observed_angles(star, t)?;
        let calculated = self.calculated_angles(star, t)?;
        Ok((observed - calculated).sum())
    }

    /// Sum of squared residuals of a single source
    pub fn source_error(&self, star: usize) -> Result<f64, Error> {
        let calc = self.calc_source(star)?;
        calc.obs_times().iter().try_fold(0.0, |acc, t| {
            let r = self.residual(star, *t)?;
            Ok(acc + r * r)
        })
    }

    /// Sum of squared residuals over all sources and observations
    pub fn error_function(&self) -> Result<f64, Error> {
        (0..self.calc_sources.len()).try_fold(0.0, |acc, star| Ok(acc + self.source_error(star)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        attitude::{AnalyticSatellite, Knots, ScanningLaw},
        source::AstrometricParameters,
    };
    use nalgebra::{Matrix4xX, Vector5};

    fn star() -> Source {
        Source::new("s", AstrometricParameters::new(1.0, 0.3, 0.001, 1.0E-7, 2.0E-7))
    }

    fn times() -> Vec<f64> {
        (0..20).map(|j| 0.5 + j as f64 * 3.7).collect()
    }

    fn engine_test<F: Fn(&ResidualEngine)>(
        cfg: &Config,
        sat: &dyn Satellite,
        calc: CalcSource,
        attitude: Option<&AttitudeSpline>,
        f: F,
    ) {
        let real = vec![star()];
        let calc = vec![calc];
        let engine = ResidualEngine::new(cfg, sat, &real, &calc, attitude);
        f(&engine)
    }

    #[test]
    fn null_residuals_when_matching() {
        let inertial = AnalyticSatellite::default()
            .with_scanning_law(ScanningLaw::Inertial(UnitQuaternion::identity()));
        let scanning = AnalyticSatellite::default();

        for mode in [UpdateMode::Source, UpdateMode::ScannedSource] {
            for sat in [&inertial, &scanning] {
                let cfg = Config::default().with_mode(mode);
                let calc = CalcSource::from_source(&star(), times()).unwrap();
                engine_test(&cfg, sat, calc, None, |engine| {
                    for t in times() {
                        assert_eq!(engine.residual(0, t), Ok(0.0), "mode={} t={}", mode, t);
                    }
                    assert_eq!(engine.error_function(), Ok(0.0));
                });
            }
        }
    }

    #[test]
    fn residual_is_field_angle_difference() {
        let sat = AnalyticSatellite::default()
            .with_scanning_law(ScanningLaw::Inertial(UnitQuaternion::identity()));
        let cfg = Config::default();
        let calc = CalcSource::from_source(&star(), times())
            .unwrap()
            .with_offset(&Vector5::new(1.0E-6, -2.0E-6, 0.0, 0.0, 0.0));

        engine_test(&cfg, &sat, calc, None, |engine| {
            for t in times() {
                let obs = engine.observed_angles(0, t).unwrap();
                let calc = engine.calculated_angles(0, t).unwrap();
                let r = engine.residual(0, t).unwrap();
                assert_eq!(r, (obs.eta - calc.eta) + (obs.zeta - calc.zeta));
                assert!(r.abs() > 0.0);
            }
        });
    }

    #[test]
    fn error_function_idempotence() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::default();
        let calc = CalcSource::from_source(&star(), times())
            .unwrap()
            .with_offset(&Vector5::repeat(1.0E-7));

        engine_test(&cfg, &sat, calc, None, |engine| {
            let e0 = engine.error_function().unwrap();
            let e1 = engine.error_function().unwrap();
            assert!(e0 > 0.0);
            assert_eq!(e0, e1);
            assert_eq!(engine.source_error(0), Ok(e0));
        });
    }

    #[test]
    fn source_attitude_isolates_the_source() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::default().with_mode(UpdateMode::Source);
        let calc = CalcSource::from_source(&star(), times()).unwrap();

        engine_test(&cfg, &sat, calc, None, |engine| {
            for t in times() {
                let angles = engine.observed_angles(0, t).unwrap();
                assert!(angles.eta.abs() < 1.0E-12);
                assert!(angles.zeta.abs() < 1.0E-12);
            }
        });
    }

    #[test]
    fn chromatic_shift() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::default().with_chromatic_coefficient(1.0E-9);
        let real = vec![star().with_mean_color(0.5).with_color_variation(0.2, 10.0)];
        let calc = vec![CalcSource::from_source(&real[0], times()).unwrap()];
        let engine = ResidualEngine::new(&cfg, &sat, &real, &calc, None);

        for t in times() {
            let expected = 1.0E-9 * (real[0].color_at(t) - 0.5);
            let r = engine.residual(0, t).unwrap();
            assert!((r - expected).abs() < 1.0E-14, "t={}", t);
        }
    }

    #[test]
    fn attitude_mode_requires_spline() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::attitude_preset(1.0);
        let calc = CalcSource::from_source(&star(), times()).unwrap();
        engine_test(&cfg, &sat, calc, None, |engine| {
            assert_eq!(engine.residual(0, 0.5), Err(Error::MissingAttitudeModel));
        });
    }

    #[test]
    fn attitude_mode_uses_spline() {
        let sat = AnalyticSatellite::default()
            .with_scanning_law(ScanningLaw::Inertial(UnitQuaternion::identity()));
        let cfg = Config::attitude_preset(1.0);
        let knots = Knots::clamped_uniform(0.0, 80.0, 8, 3).unwrap();
        let n = knots.num_coefficients();
        let coeffs = Matrix4xX::from_fn(n, |r, _| if r == 0 { 1.0 } else { 0.0 });
        let spline = AttitudeSpline::new(knots, coeffs).unwrap();
        let calc = CalcSource::from_source(&star(), times()).unwrap();

        engine_test(&cfg, &sat, calc, Some(&spline), |engine| {
            for t in times() {
                assert!(engine.residual(0, t).unwrap().abs() < 1.0E-15);
                let v = engine.calculated_direction(0, t).unwrap();
                let u = star().topocentric_direction(&sat, t, false);
                assert!((v - u).norm() < 1.0E-15);
            }
        });
    }

    #[test]
    fn unknown_source() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::default();
        let calc = CalcSource::from_source(&star(), times()).unwrap();
        engine_test(&cfg, &sat, calc, None, |engine| {
            assert_eq!(engine.residual(1, 0.5), Err(Error::UnknownSource(1)));
        });
    }
}
