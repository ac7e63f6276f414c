use nalgebra::Vector3;

use crate::attitude::Satellite;

mod calculated;
mod parameters;

pub use calculated::CalcSource;
pub use parameters::AstrometricParameters;

pub(crate) use parameters::barycentric_time;

/// Reference (real) [Source]: ground truth model of a star used to
/// synthesize the observed field angles. Never modified while solving.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Readable name
    pub name: String,
    /// True [AstrometricParameters]
    pub params: AstrometricParameters,
    /// Radial proper motion (day⁻¹), not solved for
    pub mu_radial: f64,
    /// Mean color index
    pub mean_color: f64,
    /// Amplitude of the (sinusoidal) color variation
    pub color_amplitude: f64,
    /// Period of the color variation (days)
    pub color_period: f64,
}

impl Source {
    /// Creates a new [Source] with constant null color.
    pub fn new(name: &str, params: AstrometricParameters) -> Self {
        Self {
            name: name.to_string(),
            params,
            mu_radial: 0.0,
            mean_color: 0.0,
            color_amplitude: 0.0,
            color_period: 0.0,
        }
    }

    /// Copies and returns [Source] moving at given radial velocity (km.s⁻¹)
    pub fn with_radial_velocity(&self, radial_velocity_km_s: f64) -> Self {
        let mut s = self.clone();
        s.mu_radial = self.params.radial_proper_motion(radial_velocity_km_s);
        s
    }

    /// Copies and returns [Source] with updated mean color
    pub fn with_mean_color(&self, mean_color: f64) -> Self {
        let mut s = self.clone();
        s.mean_color = mean_color;
        s
    }

    /// Copies and returns [Source] whose color oscillates around its mean
    /// color, with given amplitude and period (days).
    pub fn with_color_variation(&self, amplitude: f64, period_days: f64) -> Self {
        let mut s = self.clone();
        s.color_amplitude = amplitude;
        s.color_period = period_days;
        s
    }

    /// Instantaneous color index at `t` (days since J2000)
    pub fn color_at(&self, t: f64) -> f64 {
        if self.color_period > 0.0 {
            let phase = 2.0 * std::f64::consts::PI * t / self.color_period;
            self.mean_color + self.color_amplitude * phase.sin()
        } else {
            self.mean_color
        }
    }

    /// True unit direction of this [Source] seen from the [Satellite] at `t`
    pub fn topocentric_direction(&self, sat: &dyn Satellite, t: f64, romer: bool) -> Vector3<f64> {
        let b_g = sat.barycentric_position_at(t);
        self.params.topocentric_direction(self.mu_radial, &b_g, t, romer)
    }
}
