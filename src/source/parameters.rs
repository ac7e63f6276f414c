use nalgebra::{Vector3, Vector5};

use crate::{
    constants::{
        DAYS_PER_YEAR, KM_S_PER_AU_YR, RAD_PER_DEG, RAD_PER_MAS, REFERENCE_EPOCH_DAYS,
        SPEED_OF_LIGHT_AU_DAY,
    },
    frame::pqr,
};

/// Barycentric time of light arrival, in days since J2000.
/// The Rømer delay accounts for the light path between the satellite
/// and the barycenter, projected on the source direction `r`.
pub(crate) fn barycentric_time(t: f64, r: &Vector3<f64>, b_g: &Vector3<f64>, romer: bool) -> f64 {
    if romer {
        t + r.dot(b_g) / SPEED_OF_LIGHT_AU_DAY
    } else {
        t
    }
}

/// The five astrometric parameters of a source, at the reference epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AstrometricParameters {
    /// Right ascension (rad)
    pub alpha: f64,
    /// Declination (rad)
    pub delta: f64,
    /// Parallax (rad)
    pub parallax: f64,
    /// Proper motion in right ascension, μα* = μα cos δ (rad.day⁻¹)
    pub mu_alpha: f64,
    /// Proper motion in declination (rad.day⁻¹)
    pub mu_delta: f64,
}

impl AstrometricParameters {
    /// Number of astrometric unknowns per source
    pub const SIZE: usize = 5;

    pub fn new(alpha: f64, delta: f64, parallax: f64, mu_alpha: f64, mu_delta: f64) -> Self {
        Self {
            alpha,
            delta,
            parallax,
            mu_alpha,
            mu_delta,
        }
    }

    /// Builds [AstrometricParameters] from usual catalog units:
    /// degrees, milliarcseconds and mas.yr⁻¹.
    pub fn from_catalog_units(
        alpha_deg: f64,
        delta_deg: f64,
        parallax_mas: f64,
        mu_alpha_mas_yr: f64,
        mu_delta_mas_yr: f64,
    ) -> Self {
        Self {
            alpha: alpha_deg * RAD_PER_DEG,
            delta: delta_deg * RAD_PER_DEG,
            parallax: parallax_mas * RAD_PER_MAS,
            mu_alpha: mu_alpha_mas_yr * RAD_PER_MAS / DAYS_PER_YEAR,
            mu_delta: mu_delta_mas_yr * RAD_PER_MAS / DAYS_PER_YEAR,
        }
    }

    /// Radial proper motion (day⁻¹) of a source with these parameters
    /// moving at `radial_velocity_km_s`.
    pub fn radial_proper_motion(&self, radial_velocity_km_s: f64) -> f64 {
        radial_velocity_km_s / KM_S_PER_AU_YR * self.parallax / DAYS_PER_YEAR
    }

    pub fn to_vector(&self) -> Vector5<f64> {
        Vector5::new(
            self.alpha,
            self.delta,
            self.parallax,
            self.mu_alpha,
            self.mu_delta,
        )
    }

    pub fn from_vector(v: &Vector5<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4])
    }

    /// Returns a copy of [Self] shifted by `d`
    pub fn offset(&self, d: &Vector5<f64>) -> Self {
        Self::from_vector(&(self.to_vector() + d))
    }

    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|v| v.is_finite())
    }

    /// Unit direction of the source as seen from a satellite located at
    /// `b_g` (barycentric, AU) at time `t` (days since J2000).
    pub fn topocentric_direction(
        &self,
        mu_radial: f64,
        b_g: &Vector3<f64>,
        t: f64,
        romer: bool,
    ) -> Vector3<f64> {
        let (p, q, r) = pqr(self.alpha, self.delta);
        let tau = barycentric_time(t, &r, b_g, romer) - REFERENCE_EPOCH_DAYS;
        let motion = p * self.mu_alpha + q * self.mu_delta + r * mu_radial;
        let topocentric = r + motion * tau - b_g * self.parallax;
        topocentric.normalize()
    }
}

impl std::fmt::Display for AstrometricParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "α={:.12} δ={:.12} ϖ={:.6E} μα*={:.6E} μδ={:.6E}",
            self.alpha, self.delta, self.parallax, self.mu_alpha, self.mu_delta
        )
    }
}
