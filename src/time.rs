//! Conversion between [Epoch]s and the solver time variable.
//!
//! The solver expresses every instant as a number of TDB days
//! elapsed since J2000, which is also the reference epoch
//! of the astrometric parameters.
use hifitime::Epoch;

use crate::constants::J2000_JDE;

/// Converts [Epoch] to TDB days since J2000.
pub fn days_since_j2000(epoch: Epoch) -> f64 {
    epoch.to_jde_tdb_days() - J2000_JDE
}

/// Converts TDB days since J2000 to [Epoch].
pub fn epoch_from_days(t: f64) -> Epoch {
    Epoch::from_jde_tdb(t + J2000_JDE)
}
