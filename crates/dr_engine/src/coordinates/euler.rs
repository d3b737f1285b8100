//! DIS Euler angle matrices and frame helpers
//!
//! DIS orientations are (psi, theta, phi) in radians: yaw about Z, pitch
//! about Y, roll about X of the entity's geocentric frame.

use crate::foundation::math::{constants::PI, utils, Mat3d, Mat4d};

/// Stand-in for `cos(theta)` when the pitch is exactly +/-90 degrees
const SINGULARITY_EPSILON: f64 = 0.000_001;

/// Rotation matrix for DIS Euler angles
pub fn eulers_to_matrix(psi: f64, theta: f64, phi: f64) -> Mat3d {
    let (sin_psi, cos_psi) = psi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();

    Mat3d::new(
        cos_psi * cos_theta,
        -sin_psi * cos_phi + cos_psi * sin_theta * sin_phi,
        sin_psi * sin_phi + cos_psi * sin_theta * cos_phi,
        sin_psi * cos_theta,
        cos_psi * cos_phi + sin_psi * sin_theta * sin_phi,
        -cos_psi * sin_phi + sin_psi * sin_theta * cos_phi,
        -sin_theta,
        cos_theta * sin_phi,
        cos_theta * cos_phi,
    )
}

/// DIS Euler angles `(psi, theta, phi)` of a rotation matrix.
///
/// At the pitch singularity `cos(theta)` is replaced by a small epsilon, so
/// the result stays finite.
pub fn matrix_to_eulers(mat: &Mat3d) -> (f64, f64, f64) {
    let sq_cos_theta = 1.0 - mat[(2, 0)] * mat[(2, 0)];
    let mut cos_theta = if sq_cos_theta < 0.0 {
        0.0
    } else {
        sq_cos_theta.sqrt()
    };
    if cos_theta == 0.0 {
        cos_theta = SINGULARITY_EPSILON;
    }

    let mut psi = utils::safe_asin(mat[(1, 0)] / cos_theta);
    if mat[(0, 0)] < 0.0 {
        psi = if psi < 0.0 { -PI - psi } else { PI - psi };
    }

    let theta = -utils::safe_asin(mat[(2, 0)]);

    let mut phi = utils::safe_asin(mat[(2, 1)] / cos_theta);
    if mat[(2, 2)] < 0.0 {
        phi = if phi < 0.0 { -PI - phi } else { PI - phi };
    }

    (psi, theta, phi)
}

/// Swap the X and Y rows and negate the Z row.
///
/// Converts between the geocentric (X east at the reference, Z up) row layout
/// and the engine's local axes.
pub fn z_flop(mat: &Mat3d) -> Mat3d {
    Mat3d::new(
        mat[(1, 0)],
        mat[(1, 1)],
        mat[(1, 2)],
        mat[(0, 0)],
        mat[(0, 1)],
        mat[(0, 2)],
        -mat[(2, 0)],
        -mat[(2, 1)],
        -mat[(2, 2)],
    )
}

/// Local tangent frame rotation at a geodetic position (radians)
pub fn local_rotation_matrix_ll(phi: f64, lambda: f64) -> Mat4d {
    let (sin_lat, cos_lat) = phi.sin_cos();
    let (sin_lon, cos_lon) = lambda.sin_cos();

    Mat4d::new(
        -sin_lon,
        -sin_lat * cos_lon,
        cos_lat * cos_lon,
        0.0,
        cos_lon,
        -sin_lat * sin_lon,
        cos_lat * sin_lon,
        0.0,
        0.0,
        cos_lat,
        sin_lat,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn round_trip(psi: f64, theta: f64, phi: f64) {
        let (p, t, r) = matrix_to_eulers(&eulers_to_matrix(psi, theta, phi));
        assert_abs_diff_eq!(p, psi, epsilon = 1e-4);
        assert_abs_diff_eq!(t, theta, epsilon = 1e-4);
        assert_abs_diff_eq!(r, phi, epsilon = 1e-4);
    }

    #[test]
    fn test_round_trip_all_quadrants() {
        round_trip(0.5, 0.3, -0.7);
        round_trip(2.5, -0.4, 2.9);
        round_trip(-2.5, 1.2, -2.0);
        round_trip(0.0, 0.0, 0.0);
    }

    #[test]
    fn test_identity() {
        assert_relative_eq!(eulers_to_matrix(0.0, 0.0, 0.0), Mat3d::identity());
    }

    #[test]
    fn test_singularity_stays_finite() {
        let (psi, theta, phi) = matrix_to_eulers(&eulers_to_matrix(0.3, HALF_PI, 0.2));
        assert!(psi.is_finite());
        assert!(phi.is_finite());
        assert_abs_diff_eq!(theta, HALF_PI, epsilon = 1e-6);
    }

    #[test]
    fn test_z_flop_is_an_involution_up_to_sign() {
        let m = eulers_to_matrix(0.1, 0.2, 0.3);
        let flopped = z_flop(&m);
        assert_eq!(flopped[(0, 0)], m[(1, 0)]);
        assert_eq!(flopped[(1, 2)], m[(0, 2)]);
        assert_eq!(flopped[(2, 1)], -m[(2, 1)]);
        assert_relative_eq!(z_flop(&flopped), m);
    }

    #[test]
    fn test_local_rotation_is_orthonormal() {
        let m = local_rotation_matrix_ll(0.6, -2.1);
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(r * r.transpose(), Mat3d::identity(), epsilon = 1e-12);
        assert_eq!(m[(3, 3)], 1.0);
    }
}
