use crate::prelude::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which block of unknowns is refined by the [Solver](crate::prelude::Solver).
/// Selected once, a run never switches from one block to the other.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UpdateMode {
    /// Refine the source parameters. Both observed and calculated angles
    /// use an attitude pointing the SRS x axis at the reference source,
    /// isolating the source parameters from any attitude model.
    Source,

    /// Refine the source parameters. Both observed and calculated angles
    /// use the ground truth scanning attitude.
    #[default]
    ScannedSource,

    /// Refine the attitude spline coefficients, with sources held fixed.
    /// Calculated angles use the spline attitude, observed angles use
    /// the ground truth.
    Attitude,
}

impl UpdateMode {
    /// True when this mode refines source parameters
    pub fn updates_sources(&self) -> bool {
        matches!(self, Self::Source | Self::ScannedSource)
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Source => write!(fmt, "source"),
            Self::ScannedSource => write!(fmt, "scanned source"),
            Self::Attitude => write!(fmt, "attitude"),
        }
    }
}

impl std::str::FromStr for UpdateMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "scanned source" | "scanned_source" => Ok(Self::ScannedSource),
            "attitude" => Ok(Self::Attitude),
            _ => Err(Error::UnknownUpdateMode(s.to_string())),
        }
    }
}
