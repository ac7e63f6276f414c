//! Frame transformations between the barycentric celestial reference
//! system (CRS, lmn axes) and the satellite scanning reference system
//! (SRS, xyz axes).
//!
//! Attitude quaternions rotate SRS vectors into the CRS: `v_lmn = q v_xyz q*`.
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3, Vector4};

use crate::{
    constants::{BASIC_ANGLE_RAD, QUATERNION_NORM_EPSILON},
    error::Error,
};

/// Field angles of a direction expressed in the SRS
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldAngles {
    /// Along scan angle (rad)
    pub eta: f64,
    /// Across scan angle (rad)
    pub zeta: f64,
}

impl FieldAngles {
    /// Sum of the along and across scan components
    pub fn sum(&self) -> f64 {
        self.eta + self.zeta
    }
}

impl std::ops::Sub for FieldAngles {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            eta: self.eta - rhs.eta,
            zeta: self.zeta - rhs.zeta,
        }
    }
}

/// Local triad at (alpha, delta): `p` points toward increasing right ascension,
/// `q` toward increasing declination, `r` is the direction itself.
pub fn pqr(alpha: f64, delta: f64) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let (sa, ca) = alpha.sin_cos();
    let (sd, cd) = delta.sin_cos();
    let p = Vector3::new(-sa, ca, 0.0);
    let q = Vector3::new(-sd * ca, -sd * sa, cd);
    let r = Vector3::new(cd * ca, cd * sa, sd);
    (p, q, r)
}

/// Unit vector pointing at (alpha, delta)
pub fn radec_to_unit(alpha: f64, delta: f64) -> Vector3<f64> {
    let (_, _, r) = pqr(alpha, delta);
    r
}

/// Returns (alpha, delta) of given vector, alpha wrapped into [0, 2π[.
/// A null vector returns (0, 0).
pub fn unit_to_radec(v: &Vector3<f64>) -> (f64, f64) {
    let norm = v.norm();
    if norm == 0.0 {
        return (0.0, 0.0);
    }
    let delta = (v.z / norm).clamp(-1.0, 1.0).asin();
    let alpha = v.y.atan2(v.x).rem_euclid(2.0 * std::f64::consts::PI);
    (alpha, delta)
}

/// Expresses a CRS vector in the SRS described by `attitude`
pub fn lmn_to_xyz(attitude: &UnitQuaternion<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    attitude.inverse_transform_vector(v)
}

/// Expresses an SRS vector in the CRS
pub fn xyz_to_lmn(attitude: &UnitQuaternion<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    attitude.transform_vector(v)
}

/// Along scan (phi) and across scan (zeta) angles of an SRS direction.
pub(crate) fn scan_angles(v_srs: &Vector3<f64>) -> (f64, f64) {
    let phi = v_srs.y.atan2(v_srs.x);
    let zeta = v_srs.z.atan2((v_srs.x.powi(2) + v_srs.y.powi(2)).sqrt());
    (phi, zeta)
}

/// Computes [FieldAngles] of an SRS direction. When `double_telescope`
/// is set, the along scan angle is counted from the axis of the telescope
/// the direction falls in (preceding for phi > 0, following otherwise),
/// half the basic angle away from the x axis.
pub fn field_angles(v_srs: &Vector3<f64>, double_telescope: bool) -> FieldAngles {
    let (phi, zeta) = scan_angles(v_srs);
    let eta = if double_telescope {
        let field_index = if phi >= 0.0 { 1.0 } else { -1.0 };
        phi - field_index * BASIC_ANGLE_RAD / 2.0
    } else {
        phi
    };
    FieldAngles { eta, zeta }
}

/// Along scan (m), across scan (n) and direction (u) unit vectors
/// of the SRS direction (phi, zeta). (u, m, n) is right handed.
pub fn mnu(phi: f64, zeta: f64) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let (sp, cp) = phi.sin_cos();
    let (sz, cz) = zeta.sin_cos();
    let m = Vector3::new(-sp, cp, 0.0);
    let n = Vector3::new(-sz * cp, -sz * sp, cz);
    let u = Vector3::new(cz * cp, cz * sp, sz);
    (m, n, u)
}

/// Attitude that brings the CRS direction `v` onto the SRS x axis,
/// using the shortest rotation.
pub fn rotation_to_x_axis(v: &Vector3<f64>) -> Result<UnitQuaternion<f64>, Error> {
    let norm = v.norm();
    if norm < QUATERNION_NORM_EPSILON {
        return Err(Error::DegenerateQuaternion);
    }
    let x = Vector3::x();
    match UnitQuaternion::rotation_between(&x, &(v / norm)) {
        Some(q) => Ok(q),
        None => {
            // antiparallel: half turn about any axis normal to x
            let axis = Unit::new_normalize(Vector3::z());
            Ok(UnitQuaternion::from_axis_angle(&axis, std::f64::consts::PI))
        },
    }
}

/// Quaternion as (w, x, y, z) 4-vector
pub(crate) fn quaternion_to_wxyz(q: &Quaternion<f64>) -> Vector4<f64> {
    Vector4::new(q.w, q.i, q.j, q.k)
}

/// Quaternion from (w, x, y, z) 4-vector
pub(crate) fn wxyz_to_quaternion(v: &Vector4<f64>) -> Quaternion<f64> {
    Quaternion::new(v[0], v[1], v[2], v[3])
}

/// Pure quaternion holding `v`
pub(crate) fn vector_to_quaternion(v: &Vector3<f64>) -> Quaternion<f64> {
    Quaternion::from_imag(*v)
}

/// Normalizes a raw quaternion, failing on null norms.
pub(crate) fn normalize(q: &Quaternion<f64>) -> Result<UnitQuaternion<f64>, Error> {
    if q.norm() < QUATERNION_NORM_EPSILON {
        return Err(Error::DegenerateQuaternion);
    }
    Ok(UnitQuaternion::from_quaternion(*q))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(1.0, 0.3)]
    #[case(4.5, -1.2)]
    #[case(6.0, 1.5)]
    fn radec_unit_vector(#[case] alpha: f64, #[case] delta: f64) {
        let v = radec_to_unit(alpha, delta);
        assert!((v.norm() - 1.0).abs() < 1.0E-15);
        let (a, d) = unit_to_radec(&v);
        assert!((a - alpha).abs() < 1.0E-12);
        assert!((d - delta).abs() < 1.0E-12);
    }

    #[test]
    fn pqr_is_orthonormal_and_right_handed() {
        let (p, q, r) = pqr(2.1, -0.4);
        assert!(p.dot(&q).abs() < 1.0E-15);
        assert!(p.dot(&r).abs() < 1.0E-15);
        assert!(q.dot(&r).abs() < 1.0E-15);
        assert!((p.cross(&q) - r).norm() < 1.0E-15);
    }

    #[test]
    fn mnu_is_orthonormal() {
        let (m, n, u) = mnu(0.7, -0.2);
        assert!((u.cross(&m) - n).norm() < 1.0E-15);
        assert!((m.cross(&n) - u).norm() < 1.0E-15);
        let (phi, zeta) = scan_angles(&u);
        assert!((phi - 0.7).abs() < 1.0E-15);
        assert!((zeta + 0.2).abs() < 1.0E-15);
    }

    #[test]
    fn identity_attitude() {
        let q = UnitQuaternion::identity();
        let v = radec_to_unit(1.0, 0.3);
        assert!((lmn_to_xyz(&q, &v) - v).norm() < 1.0E-15);
        let angles = field_angles(&v, false);
        assert!((angles.eta - 1.0).abs() < 1.0E-15);
        assert!((angles.zeta - 0.3).abs() < 1.0E-15);
    }

    #[test]
    fn frame_rotations_are_inverse() {
        let axis = Unit::new_normalize(Vector3::new(0.3, -0.5, 0.8));
        let q = UnitQuaternion::from_axis_angle(&axis, 1.234);
        let v = Vector3::new(0.1, 0.2, -0.9);
        let back = xyz_to_lmn(&q, &lmn_to_xyz(&q, &v));
        assert!((back - v).norm() < 1.0E-14);
    }

    #[rstest]
    #[case(Vector3::new(0.0, 1.0, 0.0))]
    #[case(Vector3::new(0.3, -0.2, 0.9))]
    #[case(Vector3::new(-1.0, 0.0, 0.0))]
    fn x_axis_rotation(#[case] v: Vector3<f64>) {
        let q = rotation_to_x_axis(&v).unwrap();
        let srs = lmn_to_xyz(&q, &v.normalize());
        assert!((srs - Vector3::x()).norm() < 1.0E-12, "{}", srs);
        let angles = field_angles(&srs, false);
        assert!(angles.eta.abs() < 1.0E-12);
        assert!(angles.zeta.abs() < 1.0E-12);
    }

    #[test]
    fn double_telescope_offsets() {
        let half = BASIC_ANGLE_RAD / 2.0;
        let preceding = radec_to_unit(half, 0.0);
        let following = radec_to_unit(-half, 0.0);
        assert!(field_angles(&preceding, true).eta.abs() < 1.0E-12);
        assert!(field_angles(&following, true).eta.abs() < 1.0E-12);
        let back = radec_to_unit(PI - 0.1, 0.0);
        assert!((field_angles(&back, true).eta - (PI - 0.1 - half)).abs() < 1.0E-12);
    }

    #[test]
    fn pole_across_scan() {
        let v = Vector3::new(0.0, 0.0, 1.0);
        let (_, zeta) = scan_angles(&v);
        assert!((zeta - FRAC_PI_2).abs() < 1.0E-15);
    }

    #[test]
    fn degenerate_quaternion() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(normalize(&q), Err(Error::DegenerateQuaternion));
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        assert_eq!(normalize(&q).unwrap(), UnitQuaternion::identity());
    }
}
