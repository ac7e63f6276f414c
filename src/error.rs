use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Update mode could not be parsed. Only "source", "scanned source"
    /// and "attitude" are supported.
    #[error("unknown update mode \"{0}\"")]
    UnknownUpdateMode(String),

    /// [UpdateMode::Attitude](crate::prelude::UpdateMode::Attitude) requires
    /// an initial [AttitudeSpline](crate::prelude::AttitudeSpline).
    #[error("attitude update mode requires an attitude spline")]
    MissingAttitudeModel,

    /// Stellar aberration is not modeled in the source partials yet.
    #[error("stellar aberration is not supported")]
    StellarAberrationUnsupported,

    /// Reference and calculated sources are paired by index
    /// and must therefore come in equal numbers.
    #[error("source count mismatch: {0} reference for {1} calculated")]
    SourceCountMismatch(usize, usize),

    /// Knot vector is not non-decreasing, or is too short for the spline degree.
    #[error("invalid knot vector")]
    InvalidKnots,

    /// Spline degree must be at least 1.
    #[error("invalid spline degree {0}")]
    InvalidSplineDegree(usize),

    /// Coefficient matrix does not match the knot vector.
    #[error("coefficient count {0} does not match knot vector (expected {1})")]
    CoefficientCount(usize, usize),

    /// Observation times of a source must be strictly increasing.
    #[error("observation times of \"{0}\" are not strictly increasing")]
    UnsortedObservationTimes(String),

    /// Two sources share one observation time, so the time to source
    /// index would be ambiguous.
    #[error("observation time {0} is shared by several sources")]
    DuplicateObservationTime(f64),

    /// Weights must be finite and strictly positive.
    #[error("invalid weight: sigma must be finite and > 0")]
    InvalidWeight,

    /// Normal equations are singular or too ill-conditioned to be solved:
    /// not enough (or degenerate) observations.
    #[error("singular normal equations (rcond={0:.3E})")]
    SingularNormalEquations(f64),

    /// Solving the normal equations produced a non finite increment.
    #[error("normal equations produced a non finite update")]
    NonFiniteUpdate,

    /// Quaternion with (close to) zero norm cannot describe a rotation.
    #[error("degenerate (zero norm) quaternion")]
    DegenerateQuaternion,

    /// Time lies outside of the spline definition domain.
    #[error("t={0} lies outside of the spline domain")]
    OutOfSplineDomain(f64),

    /// Observation time is not registered in the [ObservationIndex](crate::prelude::ObservationIndex).
    /// This is an internal consistency violation.
    #[error("observation time {0} is unknown")]
    UnknownObservationTime(f64),

    /// Source index out of range.
    #[error("unknown source #{0}")]
    UnknownSource(usize),
}
