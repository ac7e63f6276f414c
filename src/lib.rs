#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod attitude;
mod attitude_block;
mod cfg;
mod constants;
mod error;
mod frame;
mod lsq;
mod residual;
mod solver;
mod source;
mod source_block;

pub mod time;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::attitude::{
        attitude_error, AnalyticSatellite, AttitudeSpline, Knots, ObservationIndex, Satellite,
        ScanningLaw,
    };
    pub use crate::cfg::{Config, UpdateMode, WeightMatrix};
    pub use crate::constants::*;
    pub use crate::error::Error;
    pub use crate::frame::{
        field_angles, lmn_to_xyz, mnu, pqr, radec_to_unit, rotation_to_x_axis, unit_to_radec,
        xyz_to_lmn, FieldAngles,
    };
    pub use crate::solver::{Solver, SolverState};
    pub use crate::source::{AstrometricParameters, CalcSource, Source};
    // re-export
    pub use hifitime::Epoch;
    pub use nalgebra::{Quaternion, UnitQuaternion, Vector3};
}

// pub export
pub use error::Error;
