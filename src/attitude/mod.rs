//! Satellite attitude: ground truth [Satellite] collaborator
//! and adjustable [AttitudeSpline] model.
use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::error::Error;

mod knots;
mod spline;
mod support;

pub use knots::Knots;
pub use spline::AttitudeSpline;
pub(crate) use support::BasisSupport;
pub use support::ObservationIndex;

/// Any ground truth provider should implement the [Satellite] trait.
/// It is consumed read only, by both the residual evaluation and
/// the source partials.
pub trait Satellite {
    /// Attitude at `t` (days since J2000), rotating SRS vectors into the CRS.
    fn attitude_at(&self, t: f64) -> UnitQuaternion<f64>;

    /// Barycentric position at `t` (days since J2000), in AU.
    fn barycentric_position_at(&self, t: f64) -> Vector3<f64>;
}

/// [ScanningLaw] of an [AnalyticSatellite]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanningLaw {
    /// Attitude is frozen
    Inertial(UnitQuaternion<f64>),
    /// The satellite spins about its z axis. The spin axis is inclined
    /// with respect to the CRS pole and precesses around it.
    Spinning {
        /// Spin period (days)
        spin_period: f64,
        /// Precession period of the spin axis (days).
        /// Null or negative values disable the precession.
        precession_period: f64,
        /// Angle between spin axis and CRS pole (rad)
        inclination: f64,
    },
}

impl Default for ScanningLaw {
    /// Gaia like scanning law: 6h spin, 63 day precession, 45° inclination
    fn default() -> Self {
        Self::Spinning {
            spin_period: 0.25,
            precession_period: 63.12,
            inclination: std::f64::consts::FRAC_PI_4,
        }
    }
}

impl ScanningLaw {
    fn attitude_at(&self, t: f64) -> UnitQuaternion<f64> {
        match self {
            Self::Inertial(q) => *q,
            Self::Spinning {
                spin_period,
                precession_period,
                inclination,
            } => {
                let z = Unit::new_normalize(Vector3::z());
                let x = Unit::new_normalize(Vector3::x());

                let precession = if *precession_period > 0.0 {
                    2.0 * std::f64::consts::PI * t / precession_period
                } else {
                    0.0
                };

                let spin = 2.0 * std::f64::consts::PI * t / spin_period;

                UnitQuaternion::from_axis_angle(&z, precession)
                    * UnitQuaternion::from_axis_angle(&x, *inclination)
                    * UnitQuaternion::from_axis_angle(&z, spin)
            },
        }
    }
}

/// [AnalyticSatellite] follows a circular barycentric orbit in the CRS
/// (x, y) plane while scanning the sky with its [ScanningLaw].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticSatellite {
    /// Orbital radius (AU)
    pub orbit_radius: f64,
    /// Orbital period (days)
    pub orbit_period: f64,
    /// [ScanningLaw]
    pub scanning_law: ScanningLaw,
}

impl Default for AnalyticSatellite {
    /// L2 like orbit: 1.01 AU, one year period
    fn default() -> Self {
        Self {
            orbit_radius: 1.01,
            orbit_period: crate::constants::DAYS_PER_YEAR,
            scanning_law: ScanningLaw::default(),
        }
    }
}

impl AnalyticSatellite {
    /// Copies and returns [AnalyticSatellite] with updated [ScanningLaw]
    pub fn with_scanning_law(&self, scanning_law: ScanningLaw) -> Self {
        let mut s = *self;
        s.scanning_law = scanning_law;
        s
    }
}

impl Satellite for AnalyticSatellite {
    fn attitude_at(&self, t: f64) -> UnitQuaternion<f64> {
        self.scanning_law.attitude_at(t)
    }

    fn barycentric_position_at(&self, t: f64) -> Vector3<f64> {
        let phase = 2.0 * std::f64::consts::PI * t / self.orbit_period;
        let (s, c) = phase.sin_cos();
        Vector3::new(c, s, 0.0) * self.orbit_radius
    }
}

/// Attitude fit diagnostic: sums, over all `times`, the absolute component
/// differences between the ground truth and the modeled unit quaternions.
/// Both quaternions describe the same rotation up to a sign, which is
/// aligned prior comparison.
pub fn attitude_error(
    times: &[f64],
    sat: &dyn Satellite,
    model: &AttitudeSpline,
) -> Result<f64, Error> {
    let mut error = 0.0;
    for t in times.iter() {
        let truth = sat.attitude_at(*t).into_inner().coords;
        let modeled = model.attitude(*t)?.into_inner().coords;
        let modeled = if truth.dot(&modeled) < 0.0 {
            -modeled
        } else {
            modeled
        };
        error += (truth - modeled).abs().sum();
    }
    Ok(error)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn circular_orbit() {
        let sat = AnalyticSatellite::default();
        let quarter = sat.orbit_period / 4.0;
        let b0 = sat.barycentric_position_at(0.0);
        let b1 = sat.barycentric_position_at(quarter);
        assert!((b0 - Vector3::new(1.01, 0.0, 0.0)).norm() < 1.0E-12);
        assert!((b1 - Vector3::new(0.0, 1.01, 0.0)).norm() < 1.0E-12);
    }

    #[test]
    fn inertial_scanning_law() {
        let sat = AnalyticSatellite::default()
            .with_scanning_law(ScanningLaw::Inertial(UnitQuaternion::identity()));
        assert_eq!(sat.attitude_at(0.0), UnitQuaternion::identity());
        assert_eq!(sat.attitude_at(100.0), UnitQuaternion::identity());
    }

    #[test]
    fn spin_axis_inclination() {
        let sat = AnalyticSatellite::default();
        for t in [0.0, 1.3, 20.0, 47.7] {
            let q = sat.attitude_at(t);
            let spin_axis = q.transform_vector(&Vector3::z());
            let inclination = spin_axis.z.clamp(-1.0, 1.0).acos();
            assert!((inclination - std::f64::consts::FRAC_PI_4).abs() < 1.0E-12);
        }
    }

    #[test]
    fn spin_period() {
        let sat = AnalyticSatellite::default().with_scanning_law(ScanningLaw::Spinning {
            spin_period: 0.25,
            precession_period: 0.0,
            inclination: 0.3,
        });
        let q0 = sat.attitude_at(1.0);
        let q1 = sat.attitude_at(1.25);
        // full turn: same rotation, opposite quaternion
        let (c0, c1) = (q0.into_inner().coords, q1.into_inner().coords);
        assert!((c0 + c1).norm() < 1.0E-9 || (c0 - c1).norm() < 1.0E-9);
        let q2 = sat.attitude_at(1.125);
        assert!((q0.angle_to(&q2) - std::f64::consts::PI).abs() < 1.0E-9);
    }
}
