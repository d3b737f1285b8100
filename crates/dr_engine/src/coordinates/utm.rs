//! Universal Transverse Mercator projection on the WGS84 ellipsoid
//!
//! Latitude and longitude are radians throughout, except in
//! [`calculate_utm_zone`], which takes degrees like every caller has them.

use super::ellipsoid::{FLATTENING, SEMI_MAJOR_AXIS};
use super::Hemisphere;
use crate::foundation::math::constants::{PI, TAU};
use crate::foundation::math::utils;

/// Scale factor along the central meridian of every UTM zone
pub const CENTRAL_MERIDIAN_SCALE: f64 = 0.9996;

/// Northernmost latitude covered by UTM, in degrees
pub const MAX_LATITUDE: f64 = 84.5;

/// Widest longitude difference from the central meridian, in degrees
pub const MAX_DELTA_LONGITUDE: f64 = 90.0;

const FALSE_EASTING: f64 = 500_000.0;
const SOUTHERN_FALSE_NORTHING: f64 = 10_000_000.0;

/// Precomputed Transverse Mercator constants for one projection origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmParameters {
    /// Semi-major axis
    pub a: f64,
    /// Flattening
    pub f: f64,
    /// Latitude of origin, radians
    pub origin_latitude: f64,
    /// Central meridian, radians
    pub origin_longitude: f64,
    /// Easting offset in meters
    pub false_easting: f64,
    /// Northing offset in meters
    pub false_northing: f64,
    /// Scale along the central meridian
    pub scale_factor: f64,
    /// Easting span of the projection at the widest longitude difference
    pub delta_easting: f64,
    /// Northing span of the projection at the northernmost latitude
    pub delta_northing: f64,
    es: f64,
    ebs: f64,
    ap: f64,
    bp: f64,
    cp: f64,
    dp: f64,
    ep: f64,
}

impl UtmParameters {
    /// Compute the series constants for a projection
    pub fn transverse_mercator(
        a: f64,
        f: f64,
        origin_latitude: f64,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
        scale_factor: f64,
    ) -> Self {
        let b = a * (1.0 - f);
        let es = 2.0 * f - f * f;
        let ebs = (1.0 / (1.0 - es)) - 1.0;

        let tn = (a - b) / (a + b);
        let tn2 = tn * tn;
        let tn3 = tn2 * tn;
        let tn4 = tn3 * tn;
        let tn5 = tn4 * tn;

        let ap = a * (1.0 - tn + 5.0 * (tn2 - tn3) / 4.0 + 81.0 * (tn4 - tn5) / 64.0);
        let bp = 3.0 * a * (tn - tn2 + 7.0 * (tn3 - tn4) / 8.0 + 55.0 * tn5 / 64.0) / 2.0;
        let cp = 15.0 * a * (tn2 - tn3 + 3.0 * (tn4 - tn5) / 4.0) / 16.0;
        let dp = 35.0 * a * (tn3 - tn4 + 11.0 * tn5 / 16.0) / 48.0;
        let ep = 315.0 * a * (tn4 - tn5) / 512.0;

        let origin_longitude = if central_meridian > PI {
            central_meridian - TAU
        } else {
            central_meridian
        };

        let mut params = Self {
            a,
            f,
            origin_latitude: 0.0,
            origin_longitude: 0.0,
            false_easting: 0.0,
            false_northing: 0.0,
            scale_factor: 1.0,
            delta_easting: 0.0,
            delta_northing: 0.0,
            es,
            ebs,
            ap,
            bp,
            cp,
            dp,
            ep,
        };

        // Projection extents are measured on the unscaled, unshifted grid
        let max_delta_long = utils::deg_to_rad(MAX_DELTA_LONGITUDE);
        let (_, delta_northing) = convert_geodetic_to_transverse_mercator(
            &params,
            utils::deg_to_rad(MAX_LATITUDE),
            max_delta_long,
        );
        let (delta_easting, _) = convert_geodetic_to_transverse_mercator(&params, 0.0, max_delta_long);
        params.delta_easting = delta_easting;
        params.delta_northing = delta_northing;

        params.origin_latitude = origin_latitude;
        params.origin_longitude = origin_longitude;
        params.false_easting = false_easting;
        params.false_northing = false_northing;
        params.scale_factor = scale_factor;
        params
    }

    /// WGS84 parameters for a UTM zone and hemisphere
    pub fn for_zone(zone: u32, hemisphere: Hemisphere) -> Self {
        Self::transverse_mercator(
            SEMI_MAJOR_AXIS,
            FLATTENING,
            0.0,
            central_meridian(zone),
            FALSE_EASTING,
            match hemisphere {
                Hemisphere::North => 0.0,
                Hemisphere::South => SOUTHERN_FALSE_NORTHING,
            },
            CENTRAL_MERIDIAN_SCALE,
        )
    }

    /// True meridional distance
    fn sphtmd(&self, latitude: f64) -> f64 {
        self.ap * latitude - self.bp * (2.0 * latitude).sin() + self.cp * (4.0 * latitude).sin()
            - self.dp * (6.0 * latitude).sin()
            + self.ep * (8.0 * latitude).sin()
    }

    /// Radius of curvature in the prime vertical
    fn sphsn(&self, latitude: f64) -> f64 {
        self.a / (1.0 - self.es * latitude.sin().powi(2)).sqrt()
    }

    fn denom(&self, latitude: f64) -> f64 {
        (1.0 - self.es * latitude.sin().powi(2)).sqrt()
    }

    /// Radius of curvature in the meridian
    fn sphsr(&self, latitude: f64) -> f64 {
        let denom = self.denom(latitude);
        self.a * (1.0 - self.es) / (denom * denom * denom)
    }
}

/// Central meridian of a UTM zone in radians
pub fn central_meridian(zone: u32) -> f64 {
    let degrees = if zone >= 31 {
        f64::from(6 * zone) - 183.0
    } else {
        f64::from(6 * zone) + 177.0
    };
    utils::deg_to_rad(degrees)
}

/// Project geodetic radians into the given UTM zone. Returns (easting, northing).
pub fn convert_geodetic_to_utm(
    latitude: f64,
    longitude: f64,
    zone: u32,
    hemisphere: Hemisphere,
) -> (f64, f64) {
    let longitude = if longitude < 0.0 {
        longitude + TAU + 1.0e-10
    } else {
        longitude
    };
    let params = UtmParameters::for_zone(zone, hemisphere);
    convert_geodetic_to_transverse_mercator(&params, latitude, longitude)
}

/// Inverse of [`convert_geodetic_to_utm`]. Returns (latitude, longitude) in radians.
pub fn convert_utm_to_geodetic(
    zone: u32,
    hemisphere: Hemisphere,
    easting: f64,
    northing: f64,
) -> (f64, f64) {
    let params = UtmParameters::for_zone(zone, hemisphere);
    convert_transverse_mercator_to_geodetic(&params, easting, northing)
}

/// Forward Transverse Mercator series. Returns (easting, northing).
pub fn convert_geodetic_to_transverse_mercator(
    params: &UtmParameters,
    latitude: f64,
    longitude: f64,
) -> (f64, f64) {
    let longitude = if longitude > PI { longitude - TAU } else { longitude };

    let mut dlam = longitude - params.origin_longitude;
    if dlam > PI {
        dlam -= TAU;
    }
    if dlam < -PI {
        dlam += TAU;
    }
    if dlam.abs() < 2.0e-10 {
        dlam = 0.0;
    }

    let s = latitude.sin();
    let c = latitude.cos();
    let c2 = c * c;
    let c3 = c2 * c;
    let c5 = c3 * c2;
    let c7 = c5 * c2;
    let t = latitude.tan();
    let tan2 = t * t;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;
    let eta = params.ebs * c2;
    let eta2 = eta * eta;
    let eta3 = eta2 * eta;
    let eta4 = eta3 * eta;

    let sn = params.sphsn(latitude);
    let tmd = params.sphtmd(latitude);
    let tmdo = params.sphtmd(params.origin_latitude);
    let k = params.scale_factor;

    let t1 = (tmd - tmdo) * k;
    let t2 = sn * s * c * k / 2.0;
    let t3 = sn * s * c3 * k * (5.0 - tan2 + 9.0 * eta + 4.0 * eta2) / 24.0;
    let t4 = sn * s * c5 * k
        * (61.0 - 58.0 * tan2 + tan4 + 270.0 * eta - 330.0 * tan2 * eta + 445.0 * eta2
            + 324.0 * eta3
            - 680.0 * tan2 * eta2
            + 88.0 * eta4
            - 600.0 * tan2 * eta3
            - 192.0 * tan2 * eta4)
        / 720.0;
    let t5 = sn * s * c7 * k * (1385.0 - 3111.0 * tan2 + 543.0 * tan4 - tan6) / 40320.0;

    let northing = params.false_northing
        + t1
        + dlam.powi(2) * t2
        + dlam.powi(4) * t3
        + dlam.powi(6) * t4
        + dlam.powi(8) * t5;

    let t6 = sn * c * k;
    let t7 = sn * c3 * k * (1.0 - tan2 + eta) / 6.0;
    let t8 = sn * c5 * k
        * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta - 58.0 * tan2 * eta + 13.0 * eta2 + 4.0 * eta3
            - 64.0 * tan2 * eta2
            - 24.0 * tan2 * eta3)
        / 120.0;
    let t9 = sn * c7 * k * (61.0 - 479.0 * tan2 + 179.0 * tan4 - tan6) / 5040.0;

    let easting = params.false_easting
        + dlam * t6
        + dlam.powi(3) * t7
        + dlam.powi(5) * t8
        + dlam.powi(7) * t9;

    (easting, northing)
}

/// Inverse Transverse Mercator series. Returns (latitude, longitude) in radians.
pub fn convert_transverse_mercator_to_geodetic(
    params: &UtmParameters,
    easting: f64,
    northing: f64,
) -> (f64, f64) {
    let k = params.scale_factor;
    let tmdo = params.sphtmd(params.origin_latitude);
    let tmd = tmdo + (northing - params.false_northing) / k;

    // Footpoint latitude by fixed-point refinement
    let mut ftphi = tmd / params.sphsr(0.0);
    for _ in 0..5 {
        ftphi += (tmd - params.sphtmd(ftphi)) / params.sphsr(ftphi);
    }

    let sr = params.sphsr(ftphi);
    let sn = params.sphsn(ftphi);
    let c = ftphi.cos();
    let t = ftphi.tan();
    let tan2 = t * t;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;
    let eta = params.ebs * c * c;
    let eta2 = eta * eta;
    let eta3 = eta2 * eta;
    let eta4 = eta3 * eta;

    let mut de = easting - params.false_easting;
    if de.abs() < 0.0001 {
        de = 0.0;
    }

    let t10 = t / (2.0 * sr * sn * k.powi(2));
    let t11 = t * (5.0 + 3.0 * tan2 + eta - 4.0 * eta2 - 9.0 * tan2 * eta)
        / (24.0 * sr * sn.powi(3) * k.powi(4));
    let t12 = t
        * (61.0 + 90.0 * tan2 + 46.0 * eta + 45.0 * tan4 - 252.0 * tan2 * eta - 3.0 * eta2
            + 100.0 * eta3
            - 66.0 * tan2 * eta2
            - 90.0 * tan4 * eta
            + 88.0 * eta4
            + 225.0 * tan4 * eta2
            + 84.0 * tan2 * eta3
            - 192.0 * tan2 * eta4)
        / (720.0 * sr * sn.powi(5) * k.powi(6));
    let t13 = t * (1385.0 + 3633.0 * tan2 + 4095.0 * tan4 + 1575.0 * tan6)
        / (40320.0 * sr * sn.powi(7) * k.powi(8));

    let latitude = ftphi - de.powi(2) * t10 + de.powi(4) * t11 - de.powi(6) * t12
        + de.powi(8) * t13;

    let t14 = 1.0 / (sn * c * k);
    let t15 = (1.0 + 2.0 * tan2 + eta) / (6.0 * sn.powi(3) * c * k.powi(3));
    let t16 = (5.0 + 6.0 * eta + 28.0 * tan2 - 3.0 * eta2 + 8.0 * tan2 * eta + 24.0 * tan4
        - 4.0 * eta3
        + 4.0 * tan2 * eta2
        + 24.0 * tan2 * eta3)
        / (120.0 * sn.powi(5) * c * k.powi(5));
    let t17 = (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6)
        / (5040.0 * sn.powi(7) * c * k.powi(7));

    let dlam = de * t14 - de.powi(3) * t15 + de.powi(5) * t16 - de.powi(7) * t17;

    let mut longitude = params.origin_longitude + dlam;
    if longitude > PI {
        longitude -= TAU;
    }
    if longitude < -PI {
        longitude += TAU;
    }

    (latitude, longitude)
}

/// Zone number and latitude band letter for a position in degrees.
///
/// Latitude is clamped to the UTM band range. Longitude may be given in
/// either [-180, 180) or [0, 360). The Norway and Svalbard exceptions are
/// applied on whole-degree values.
pub fn calculate_utm_zone(latitude: f64, longitude: f64) -> (u32, char) {
    let latitude = latitude.clamp(-80.0, 84.0);

    let lat_degrees = latitude.trunc() as i64;
    let lon_degrees = longitude.trunc() as i64;

    let mut zone = if longitude < 180.0 {
        (31.0 + longitude / 6.0) as i64
    } else {
        (longitude / 6.0 - 29.0) as i64
    };
    if zone > 60 || zone < 1 {
        zone = 1;
    }

    if lat_degrees > 55 && lat_degrees < 64 && lon_degrees > -1 && lon_degrees < 3 {
        zone = 31;
    } else if lat_degrees > 55 && lat_degrees < 64 && lon_degrees > 2 && lon_degrees < 12 {
        zone = 32;
    } else if lat_degrees > 71 && lon_degrees > -1 && lon_degrees < 9 {
        zone = 31;
    } else if lat_degrees > 71 && lon_degrees > 8 && lon_degrees < 21 {
        zone = 33;
    } else if lat_degrees > 71 && lon_degrees > 20 && lon_degrees < 33 {
        zone = 35;
    } else if lat_degrees > 71 && lon_degrees > 32 && lon_degrees < 42 {
        zone = 37;
    }

    (zone as u32, latitude_band_letter(latitude))
}

/// Latitude band letter, C through X without I and O
pub fn latitude_band_letter(latitude: f64) -> char {
    if latitude >= 80.0 {
        return 'X';
    }
    let mut letter = b'C' + ((latitude + 80.0) / 8.0).floor().max(0.0) as u8;
    if letter >= b'I' {
        letter += 1;
    }
    if letter >= b'O' {
        letter += 1;
    }
    char::from(letter)
}
