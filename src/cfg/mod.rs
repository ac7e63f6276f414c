#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::Error;

mod mode;
pub use mode::UpdateMode;

fn default_spline_degree() -> usize {
    3
}

fn default_regularisation() -> f64 {
    0.0
}

fn default_chromatic_coefficient() -> f64 {
    0.0
}

fn default_singularity_threshold() -> f64 {
    1.0E-12
}

fn default_double_telescope() -> bool {
    false
}

fn default_stellar_aberration() -> bool {
    false
}

fn default_romer_delay() -> bool {
    false
}

fn default_normalize_coefficients() -> bool {
    false
}

/// Observation weighting, used to form the diagonal weight matrix
/// of the source normal equations.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WeightMatrix {
    /// All observations weigh 1
    #[default]
    Identity,
    /// All observations share the same uncertainty (rad): w = 1/σ²
    Uniform {
        /// Observation uncertainty (rad)
        sigma: f64,
    },
}

impl WeightMatrix {
    /// Weight of a single observation
    pub(crate) fn weight(&self) -> Result<f64, Error> {
        match self {
            Self::Identity => Ok(1.0),
            Self::Uniform { sigma } => {
                if sigma.is_finite() && *sigma > 0.0 {
                    Ok(1.0 / sigma.powi(2))
                } else {
                    Err(Error::InvalidWeight)
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Block of unknowns refined by the solver
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: UpdateMode,
    /// Degree of the attitude B-splines (cubic by default)
    #[cfg_attr(feature = "serde", serde(default = "default_spline_degree"))]
    pub spline_degree: usize,
    /// Weight of the attitude unit norm penalty (λ).
    /// 0 disables the regularisation.
    #[cfg_attr(feature = "serde", serde(default = "default_regularisation"))]
    pub regularisation_factor: f64,
    /// Observation [WeightMatrix]
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight_matrix: WeightMatrix,
    /// Count along scan angles from the axis of either telescope,
    /// separated by the basic angle.
    #[cfg_attr(feature = "serde", serde(default = "default_double_telescope"))]
    pub double_telescope: bool,
    /// Model stellar aberration in the source partials.
    /// Not supported yet: the solver refuses to deploy when set.
    #[cfg_attr(feature = "serde", serde(default = "default_stellar_aberration"))]
    pub stellar_aberration: bool,
    /// Account for the Rømer delay when forming the barycentric time of
    /// light arrival, which drives the proper motion terms.
    #[cfg_attr(feature = "serde", serde(default = "default_romer_delay"))]
    pub romer_delay: bool,
    /// Chromatic shift of the field angles (rad per color unit).
    /// Observed angles use the instantaneous color, calculated angles
    /// use the mean color. 0 means no chromatic effect.
    #[cfg_attr(feature = "serde", serde(default = "default_chromatic_coefficient"))]
    pub chromatic_coefficient: f64,
    /// Normal equations whose (Jacobi scaled) reciprocal condition number
    /// falls below this value are considered singular.
    #[cfg_attr(feature = "serde", serde(default = "default_singularity_threshold"))]
    pub singularity_threshold: f64,
    /// Renormalize each attitude coefficient column to unit norm
    /// after every attitude update.
    #[cfg_attr(feature = "serde", serde(default = "default_normalize_coefficients"))]
    pub normalize_coefficients: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: UpdateMode::default(),
            spline_degree: default_spline_degree(),
            regularisation_factor: default_regularisation(),
            weight_matrix: WeightMatrix::default(),
            double_telescope: default_double_telescope(),
            stellar_aberration: default_stellar_aberration(),
            romer_delay: default_romer_delay(),
            chromatic_coefficient: default_chromatic_coefficient(),
            singularity_threshold: default_singularity_threshold(),
            normalize_coefficients: default_normalize_coefficients(),
        }
    }
}

impl Config {
    /// Returns [Config] to refine source parameters, using the
    /// ground truth attitude on both sides.
    pub fn source_preset() -> Self {
        Self::default().with_mode(UpdateMode::ScannedSource)
    }

    /// Returns [Config] to refine the attitude spline, with desired
    /// regularisation factor. You can then customize [Self] as you will.
    pub fn attitude_preset(regularisation_factor: f64) -> Self {
        let mut s = Self::default().with_mode(UpdateMode::Attitude);
        s.regularisation_factor = regularisation_factor;
        s
    }

    /// Copies and returns [Config] with updated [UpdateMode]
    pub fn with_mode(&self, mode: UpdateMode) -> Self {
        let mut s = self.clone();
        s.mode = mode;
        s
    }

    /// Copies and returns [Config] with updated spline degree
    pub fn with_spline_degree(&self, degree: usize) -> Self {
        let mut s = self.clone();
        s.spline_degree = degree;
        s
    }

    /// Copies and returns [Config] with updated regularisation factor
    pub fn with_regularisation_factor(&self, factor: f64) -> Self {
        let mut s = self.clone();
        s.regularisation_factor = factor;
        s
    }

    /// Copies and returns [Config] with updated [WeightMatrix]
    pub fn with_weight_matrix(&self, weight_matrix: WeightMatrix) -> Self {
        let mut s = self.clone();
        s.weight_matrix = weight_matrix;
        s
    }

    /// Copies and returns [Config] with double telescope setup
    pub fn with_double_telescope(&self, double_telescope: bool) -> Self {
        let mut s = self.clone();
        s.double_telescope = double_telescope;
        s
    }

    /// Copies and returns [Config] with Rømer delay compensation
    pub fn with_romer_delay(&self, romer_delay: bool) -> Self {
        let mut s = self.clone();
        s.romer_delay = romer_delay;
        s
    }

    /// Copies and returns [Config] with updated chromatic coefficient
    pub fn with_chromatic_coefficient(&self, coefficient: f64) -> Self {
        let mut s = self.clone();
        s.chromatic_coefficient = coefficient;
        s
    }

    /// Verifies this [Config] may be deployed
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.stellar_aberration {
            return Err(Error::StellarAberrationUnsupported);
        }
        if self.spline_degree == 0 {
            return Err(Error::InvalidSplineDegree(self.spline_degree));
        }
        self.weight_matrix.weight()?;
        Ok(())
    }
}
