/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Astronomical unit in meters
pub const AU_M: f64 = 149_597_870_700.0;

/// Speed of light in AU.day⁻¹
pub const SPEED_OF_LIGHT_AU_DAY: f64 = SPEED_OF_LIGHT_M_S * 86_400.0 / AU_M;

/// Radians per degree
pub const RAD_PER_DEG: f64 = std::f64::consts::PI / 180.0;

/// Radians per milliarcsecond
pub const RAD_PER_MAS: f64 = RAD_PER_DEG / 3_600_000.0;

/// Days per julian year
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Reference epoch of the astrometric parameters, in days since J2000.
/// Time is counted from J2000 so this is null.
pub const REFERENCE_EPOCH_DAYS: f64 = 0.0;

/// Julian date (TDB) of J2000
pub const J2000_JDE: f64 = 2_451_545.0;

/// Basic angle between both telescopes (106.5°)
pub const BASIC_ANGLE_RAD: f64 = 106.5 * RAD_PER_DEG;

/// Quaternions with norm below this are not considered as rotations
pub(crate) const QUATERNION_NORM_EPSILON: f64 = 1.0E-12;

/// 1 AU.yr⁻¹ expressed in km.s⁻¹
pub const KM_S_PER_AU_YR: f64 = 4.740_470_446;
