//! WGS84 ellipsoid and geocentric/geodetic conversions
//!
//! Geocentric coordinates are meters from the earth's center with +Z through
//! the north pole. Geodetic latitude/longitude are radians unless a function
//! says otherwise.

use crate::foundation::math::{constants::HALF_PI, utils, Vec3d};

/// WGS84 semi-major axis in meters
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 reciprocal flattening
pub const FLATTENING_RECIPROCAL: f64 = 298.257_223_563;

/// WGS84 flattening
pub const FLATTENING: f64 = 1.0 / FLATTENING_RECIPROCAL;

/// WGS84 semi-minor axis in meters
pub const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);

/// First eccentricity squared
pub const ECCENTRICITY_SQUARED: f64 = (2.0 - FLATTENING) * FLATTENING;

/// Second eccentricity squared
pub const SECOND_ECCENTRICITY_SQUARED: f64 = ECCENTRICITY_SQUARED / (1.0 - ECCENTRICITY_SQUARED);

/// Toms' adjustment for the initial vertical estimate
const AD_C: f64 = 1.0026;

/// cos(67.5 degrees)
const COS_67P5: f64 = 0.382_683_432_365_089_77;

/// Geodetic position in radians and meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geodetic {
    /// Latitude (phi) in radians
    pub latitude: f64,
    /// Longitude (lambda) in radians
    pub longitude: f64,
    /// Height above the ellipsoid in meters
    pub elevation: f64,
}

impl Geodetic {
    /// Build from degrees
    pub fn from_degrees(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude: utils::deg_to_rad(latitude),
            longitude: utils::deg_to_rad(longitude),
            elevation,
        }
    }

    /// (lat deg, lon deg, elevation)
    pub fn to_degrees(&self) -> Vec3d {
        Vec3d::new(
            utils::rad_to_deg(self.latitude),
            utils::rad_to_deg(self.longitude),
            self.elevation,
        )
    }
}

/// Geocentric to geodetic using Toms' method. Output in radians.
///
/// Points on the polar axis get longitude 0 and latitude of +/-90 degrees. The
/// exact center of the earth reports +90 degrees and an elevation of minus the
/// semi-minor axis.
pub fn convert_geocentric_to_geodetic(x: f64, y: f64, z: f64) -> Geodetic {
    let mut result = Geodetic::default();
    let mut at_pole = false;

    if x != 0.0 {
        result.longitude = y.atan2(x);
    } else if y > 0.0 {
        result.longitude = HALF_PI;
    } else if y < 0.0 {
        result.longitude = -HALF_PI;
    } else {
        at_pole = true;
        result.longitude = 0.0;
        if z > 0.0 {
            result.latitude = HALF_PI;
        } else if z < 0.0 {
            result.latitude = -HALF_PI;
        } else {
            result.latitude = HALF_PI;
            result.elevation = -SEMI_MINOR_AXIS;
            return result;
        }
    }

    let w2 = x * x + y * y;
    let w = w2.sqrt();
    let t0 = z * AD_C;
    let s0 = (t0 * t0 + w2).sqrt();
    let sin_b0 = t0 / s0;
    let cos_b0 = w / s0;
    let sin3_b0 = sin_b0 * sin_b0 * sin_b0;
    let t1 = z + SEMI_MINOR_AXIS * SECOND_ECCENTRICITY_SQUARED * sin3_b0;
    let sum = w - SEMI_MAJOR_AXIS * ECCENTRICITY_SQUARED * cos_b0 * cos_b0 * cos_b0;
    let s1 = (t1 * t1 + sum * sum).sqrt();
    let sin_p1 = t1 / s1;
    let cos_p1 = sum / s1;
    let rn = SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQUARED * sin_p1 * sin_p1).sqrt();

    result.elevation = if cos_p1 >= COS_67P5 {
        w / cos_p1 - rn
    } else if cos_p1 <= -COS_67P5 {
        w / -cos_p1 - rn
    } else {
        z / sin_p1 + rn * (ECCENTRICITY_SQUARED - 1.0)
    };

    if !at_pole {
        result.latitude = (sin_p1 / cos_p1).atan();
    }
    result
}

/// Closed-form geocentric to geodetic. Returns (lat deg, lon deg, elevation).
///
/// Less accurate near the poles than [`convert_geocentric_to_geodetic`].
pub fn geocentric_to_geodetic_simple(x: f64, y: f64, z: f64) -> Vec3d {
    let a = SEMI_MAJOR_AXIS;
    let b = SEMI_MINOR_AXIS;
    let p = (x * x + y * y).sqrt();
    let theta = ((z * a) / (p * b)).atan();
    let ep2 = (a * a - b * b) / (b * b);

    let latitude = ((z + ep2 * b * theta.sin().powi(3))
        / (p - ECCENTRICITY_SQUARED * a * theta.cos().powi(3)))
    .atan();
    let longitude = y.atan2(x);
    let elevation =
        p / latitude.cos() - a / (1.0 - ECCENTRICITY_SQUARED * latitude.sin().powi(2)).sqrt();

    Vec3d::new(utils::rad_to_deg(latitude), utils::rad_to_deg(longitude), elevation)
}

/// Geodetic (radians, meters) to geocentric meters
pub fn convert_geodetic_to_geocentric(latitude: f64, longitude: f64, elevation: f64) -> Vec3d {
    let n = SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQUARED * latitude.sin().powi(2)).sqrt();
    Vec3d::new(
        (n + elevation) * latitude.cos() * longitude.cos(),
        (n + elevation) * latitude.cos() * longitude.sin(),
        (n * (1.0 - ECCENTRICITY_SQUARED) + elevation) * latitude.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_equator_prime_meridian() {
        let g = convert_geocentric_to_geodetic(SEMI_MAJOR_AXIS, 0.0, 0.0);
        assert_abs_diff_eq!(g.latitude, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.longitude, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.elevation, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_trip_mid_latitude() {
        let lat = 36.5_f64.to_radians();
        let lon = (-121.9_f64).to_radians();
        let xyz = convert_geodetic_to_geocentric(lat, lon, 250.0);
        let g = convert_geocentric_to_geodetic(xyz.x, xyz.y, xyz.z);
        assert_abs_diff_eq!(g.latitude, lat, epsilon = 1e-9);
        assert_abs_diff_eq!(g.longitude, lon, epsilon = 1e-12);
        assert_abs_diff_eq!(g.elevation, 250.0, epsilon = 1e-3);
    }

    #[test]
    fn test_high_latitude_uses_vertical_branch() {
        let lat = 80.0_f64.to_radians();
        let xyz = convert_geodetic_to_geocentric(lat, 0.3, 1000.0);
        let g = convert_geocentric_to_geodetic(xyz.x, xyz.y, xyz.z);
        assert_abs_diff_eq!(g.latitude, lat, epsilon = 1e-9);
        assert_abs_diff_eq!(g.elevation, 1000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_poles_and_center() {
        let north = convert_geocentric_to_geodetic(0.0, 0.0, SEMI_MINOR_AXIS + 10.0);
        assert_relative_eq!(north.latitude, HALF_PI);
        assert_eq!(north.longitude, 0.0);
        assert_abs_diff_eq!(north.elevation, 10.0, epsilon = 1e-6);

        let south = convert_geocentric_to_geodetic(0.0, 0.0, -SEMI_MINOR_AXIS);
        assert_relative_eq!(south.latitude, -HALF_PI);

        let center = convert_geocentric_to_geodetic(0.0, 0.0, 0.0);
        assert_relative_eq!(center.latitude, HALF_PI);
        assert_eq!(center.longitude, 0.0);
        assert_relative_eq!(center.elevation, -SEMI_MINOR_AXIS);
    }

    #[test]
    fn test_on_y_axis() {
        let g = convert_geocentric_to_geodetic(0.0, -SEMI_MAJOR_AXIS, 0.0);
        assert_relative_eq!(g.longitude, -HALF_PI);
    }

    #[test]
    fn test_simple_form_matches_toms_in_degrees() {
        let xyz = convert_geodetic_to_geocentric(0.7, 0.2, 30.0);
        let simple = geocentric_to_geodetic_simple(xyz.x, xyz.y, xyz.z);
        assert_abs_diff_eq!(simple.x, 0.7_f64.to_degrees(), epsilon = 1e-6);
        assert_abs_diff_eq!(simple.y, 0.2_f64.to_degrees(), epsilon = 1e-9);
        assert_abs_diff_eq!(simple.z, 30.0, epsilon = 0.05);
    }
}
