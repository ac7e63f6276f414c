//! Source block: per source, 5 parameter weighted least squares.
use log::debug;
use nalgebra::{DVector, Matrix3, Matrix3x5, UnitQuaternion, Vector3, Vector5};

use crate::{
    constants::{REFERENCE_EPOCH_DAYS, SPEED_OF_LIGHT_AU_DAY},
    error::Error,
    frame::{lmn_to_xyz, mnu, pqr, scan_angles},
    lsq::NormalEquations,
    residual::ResidualEngine,
    source::{barycentric_time, AstrometricParameters},
};

/// Partial derivatives of the unit source direction, in the CRS, with respect
/// to (α, δ, ϖ, μα*, μδ). Columns are ordered like [AstrometricParameters].
///
/// The topocentric vector `ũ = r + τ (p μα* + q μδ + r μr) − ϖ b_G` is
/// differentiated, then projected onto the plane normal to `u = ũ / |ũ|`.
pub(crate) fn direction_partials(
    params: &AstrometricParameters,
    mu_radial: f64,
    b_g: &Vector3<f64>,
    t: f64,
    romer: bool,
) -> Matrix3x5<f64> {
    let (p, q, r) = pqr(params.alpha, params.delta);
    let (sin_delta, cos_delta) = params.delta.sin_cos();
    let tau = barycentric_time(t, &r, b_g, romer) - REFERENCE_EPOCH_DAYS;

    let motion = p * params.mu_alpha + q * params.mu_delta + r * mu_radial;
    let topocentric = r + motion * tau - b_g * params.parallax;
    let norm = topocentric.norm();
    let u = topocentric / norm;

    // Rømer delay depends on the source direction
    let (dtau_dalpha, dtau_ddelta) = if romer {
        (
            cos_delta * p.dot(b_g) / SPEED_OF_LIGHT_AU_DAY,
            q.dot(b_g) / SPEED_OF_LIGHT_AU_DAY,
        )
    } else {
        (0.0, 0.0)
    };

    // ∂p/∂α = sinδ q − cosδ r, ∂q/∂α = −sinδ p, ∂r/∂α = cosδ p
    let dmotion_dalpha = (q * sin_delta - r * cos_delta) * params.mu_alpha
        - p * (sin_delta * params.mu_delta)
        + p * (cos_delta * mu_radial);

    // ∂p/∂δ = 0, ∂q/∂δ = −r, ∂r/∂δ = q
    let dmotion_ddelta = -r * params.mu_delta + q * mu_radial;

    let dtilde = Matrix3x5::from_columns(&[
        p * cos_delta + dmotion_dalpha * tau + motion * dtau_dalpha,
        q + dmotion_ddelta * tau + motion * dtau_ddelta,
        -b_g,
        p * tau,
        q * tau,
    ]);

    (Matrix3::identity() - u * u.transpose()) * dtilde / norm
}

/// Jacobian row of the calculated field angle sum, with respect to the
/// five astrometric parameters, given the calculated SRS direction and
/// attitude in effect.
pub(crate) fn jacobian_row(
    du_ds: &Matrix3x5<f64>,
    attitude: &UnitQuaternion<f64>,
    v_srs: &Vector3<f64>,
) -> Vector5<f64> {
    let (phi, zeta) = scan_angles(v_srs);
    let (m, n, _) = mnu(phi, zeta);
    let sec_zeta = 1.0 / zeta.cos();

    Vector5::from_fn(|c, _| {
        let du = lmn_to_xyz(attitude, &du_ds.column(c).into_owned());
        m.dot(&du) * sec_zeta + n.dot(&du)
    })
}

/// Forms the normal equations of source `star`.
pub(crate) fn normal_equations(
    engine: &ResidualEngine,
    star: usize,
) -> Result<NormalEquations, Error> {
    let cfg = engine.cfg();
    let sat = engine.satellite();
    let calc = engine.calc_source(star)?;
    let weight = cfg.weight_matrix.weight()?;

    let mut normal = NormalEquations::new(AstrometricParameters::SIZE);

    for t in calc.obs_times().iter() {
        let b_g = sat.barycentric_position_at(*t);
        let du_ds = direction_partials(calc.params(), calc.mu_radial, &b_g, *t, cfg.romer_delay);
        let attitude = engine.calculated_attitude(star, *t)?;
        let v_srs = engine.calculated_direction(star, *t)?;

        let row = jacobian_row(&du_ds, &attitude, &v_srs);
        let a = DVector::from_column_slice(row.as_slice());
        let h = engine.residual(star, *t)?;

        normal.accumulate(&a, h, weight);
    }

    Ok(normal)
}

/// Solves for the increment of source `star`. Nothing is applied:
/// the increment is returned to the caller.
pub(crate) fn solve(engine: &ResidualEngine, star: usize) -> Result<Vector5<f64>, Error> {
    let normal = normal_equations(engine, star)?;
    let d = normal.solve(engine.cfg().singularity_threshold)?;
    let d = Vector5::from_column_slice(d.as_slice());

    debug!(
        "{}: {} observations, increment {:?}",
        engine.calc_source(star)?.name,
        engine.calc_source(star)?.num_observations(),
        d.as_slice()
    );

    Ok(d)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        attitude::{AnalyticSatellite, Satellite},
        cfg::Config,
        frame::field_angles,
        source::{CalcSource, Source},
    };

    fn params() -> AstrometricParameters {
        AstrometricParameters::new(1.0, 0.3, 1.0E-6, 1.0E-7, 2.0E-7)
    }

    #[test]
    fn direction_partials_match_finite_differences() {
        let b_g = Vector3::new(0.6, -0.8, 0.01);
        let t = 250.0;
        let mu_radial = 1.0E-8;
        let steps = [1.0E-7, 1.0E-7, 1.0E-7, 1.0E-10, 1.0E-10];

        for romer in [false, true] {
            let du_ds = direction_partials(&params(), mu_radial, &b_g, t, romer);

            for (c, step) in steps.iter().enumerate() {
                let mut d = Vector5::zeros();
                d[c] = *step;
                let plus = params()
                    .offset(&d)
                    .topocentric_direction(mu_radial, &b_g, t, romer);
                let minus = params()
                    .offset(&-d)
                    .topocentric_direction(mu_radial, &b_g, t, romer);
                let numerical = (plus - minus) / (2.0 * step);
                let analytical = du_ds.column(c).into_owned();
                assert!(
                    (numerical - analytical).norm() < 1.0E-6 * analytical.norm(),
                    "romer={} column {}: {} vs {}",
                    romer,
                    c,
                    numerical,
                    analytical
                );
            }
        }
    }

    #[test]
    fn direction_partials_are_tangent() {
        let b_g = Vector3::new(0.6, -0.8, 0.01);
        let t = -120.0;
        let u = params().topocentric_direction(0.0, &b_g, t, true);
        let du_ds = direction_partials(&params(), 0.0, &b_g, t, true);
        // unit direction: every partial lies in the plane normal to u
        assert!((u.transpose() * du_ds).amax() < 1.0E-14 * du_ds.amax());
    }

    #[test]
    fn jacobian_matches_field_angles() {
        let sat = AnalyticSatellite::default();
        let t = 12.3;
        let attitude = sat.attitude_at(t);
        let b_g = sat.barycentric_position_at(t);

        let direction = |p: &AstrometricParameters| {
            lmn_to_xyz(&attitude, &p.topocentric_direction(0.0, &b_g, t, false))
        };

        let v_srs = direction(&params());
        let du_ds = direction_partials(&params(), 0.0, &b_g, t, false);
        let row = jacobian_row(&du_ds, &attitude, &v_srs);

        let mut d = Vector5::zeros();
        d[1] = 1.0E-7;
        let plus = field_angles(&direction(&params().offset(&d)), false).sum();
        let minus = field_angles(&direction(&params().offset(&-d)), false).sum();
        let numerical = (plus - minus) / 2.0E-7;
        assert!((numerical - row[1]).abs() < 1.0E-3 * row[1].abs().max(1.0));
    }

    #[test]
    fn degenerate_observations() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::default();
        let real = vec![Source::new("s", params())];
        let calc = vec![CalcSource::from_source(&real[0], vec![1.0, 2.0]).unwrap()];
        let engine = ResidualEngine::new(&cfg, &sat, &real, &calc, None);

        match solve(&engine, 0) {
            Err(Error::SingularNormalEquations(rcond)) => assert!(rcond < 1.0E-12),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn symmetric_normal_matrix() {
        let sat = AnalyticSatellite::default();
        let cfg = Config::default();
        let real = vec![Source::new("s", params())];
        let times = (0..20).map(|j| 20.0 * j as f64).collect();
        let calc = vec![CalcSource::from_source(&real[0], times).unwrap()];
        let engine = ResidualEngine::new(&cfg, &sat, &real, &calc, None);

        let normal = normal_equations(&engine, 0).unwrap();
        assert_eq!(normal.dim(), 5);
        assert!((&normal.n - normal.n.transpose()).amax() <= 1.0E-12 * normal.n.amax());
        // noiseless, exact parameters
        assert!(normal.b.norm() < 1.0E-20);
    }
}
