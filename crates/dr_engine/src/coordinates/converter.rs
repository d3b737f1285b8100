//! Stateful remote/local coordinate converter
//!
//! [`Coordinates`] holds the frame configuration shared by every conversion
//! in a simulation context, plus the cached origin rotation matrix that maps
//! orientations between the round earth and the flat local frame.
//!
//! Conversions never fail. Unsupported type combinations log an error and
//! yield zeros, and any non-finite component of a result is replaced by zero.

use log::{debug, error, log_enabled, warn, Level};

use super::ellipsoid::{
    convert_geocentric_to_geodetic, convert_geodetic_to_geocentric, SEMI_MAJOR_AXIS,
};
use super::euler::{eulers_to_matrix, local_rotation_matrix_ll, matrix_to_eulers, z_flop};
use super::mgrs::{convert_mgrs_to_utm, convert_utm_to_mgrs};
use super::utm::{
    calculate_utm_zone, convert_geodetic_to_utm, convert_utm_to_geodetic, latitude_band_letter,
};
use super::{CoordinateError, Hemisphere, IncomingCoordinateType, LocalCoordinateType};
use crate::foundation::math::{
    hpr_to_matrix, matrix_to_hpr, rotation_part, utils, Mat3d, Mat4d, Vec2d, Vec3, Vec3d,
};

/// Nautical mile per minute of arc: meters per degree at the equator
pub const METERS_PER_DEGREE: f64 = 1852.0 * 60.0;

/// North magnetic pole latitude, degrees
pub const MAGNETIC_NORTH_LATITUDE: f64 = 82.116;

/// North magnetic pole longitude, degrees
pub const MAGNETIC_NORTH_LONGITUDE: f64 = 114.0666;

/// Remote/local coordinate converter
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    incoming_type: IncomingCoordinateType,
    local_type: LocalCoordinateType,
    local_offset: Vec3d,
    flat_earth_origin: Vec2d,
    convergence: f64,
    utm_zone: u32,
    utm_hemisphere: Hemisphere,
    globe_radius: f32,
    magnetic_north_offset: f32,
    apply_rotation_conversion_matrix: bool,
    rotation_offset: Mat4d,
    rotation_offset_inverse: Mat4d,
    rotation_dirty: bool,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinates {
    /// UTM in, Cartesian UTM out, zone 1 north, no offset
    pub fn new() -> Self {
        Self {
            incoming_type: IncomingCoordinateType::Utm,
            local_type: LocalCoordinateType::CartesianUtm,
            local_offset: Vec3d::zeros(),
            flat_earth_origin: Vec2d::zeros(),
            convergence: calculate_convergence_for_flat_earth(0.0),
            utm_zone: 1,
            utm_hemisphere: Hemisphere::North,
            globe_radius: 0.0,
            magnetic_north_offset: 0.0,
            apply_rotation_conversion_matrix: true,
            rotation_offset: Mat4d::identity(),
            rotation_offset_inverse: Mat4d::identity(),
            rotation_dirty: true,
        }
    }

    /// Set the remote frame
    pub fn set_incoming_coordinate_type(&mut self, incoming: IncomingCoordinateType) {
        self.incoming_type = incoming;
        self.rotation_dirty = true;
    }

    /// Remote frame
    pub const fn incoming_coordinate_type(&self) -> IncomingCoordinateType {
        self.incoming_type
    }

    /// Set the engine frame
    pub fn set_local_coordinate_type(&mut self, local: LocalCoordinateType) {
        self.local_type = local;
        self.rotation_dirty = true;
    }

    /// Engine frame
    pub const fn local_coordinate_type(&self) -> LocalCoordinateType {
        self.local_type
    }

    /// Translation between the remote grid and the local origin
    pub fn set_local_offset(&mut self, offset: Vec3d) {
        self.local_offset = offset;
        self.rotation_dirty = true;
    }

    /// Translation between the remote grid and the local origin
    pub const fn local_offset(&self) -> Vec3d {
        self.local_offset
    }

    /// Flat earth reference point as (latitude, longitude) in degrees
    pub fn set_flat_earth_origin(&mut self, origin: Vec2d) {
        self.flat_earth_origin = origin;
        self.convergence = calculate_convergence_for_flat_earth(origin.x);
        self.rotation_dirty = true;
    }

    /// Flat earth reference point as (latitude, longitude) in degrees
    pub const fn flat_earth_origin(&self) -> Vec2d {
        self.flat_earth_origin
    }

    /// Longitude scale of the flat earth projection
    pub const fn flat_earth_convergence(&self) -> f64 {
        self.convergence
    }

    /// UTM zone, clamped to 1..=60
    pub fn set_utm_zone(&mut self, zone: u32) {
        self.utm_zone = zone.clamp(1, 60);
        self.rotation_dirty = true;
    }

    /// UTM zone
    pub const fn utm_zone(&self) -> u32 {
        self.utm_zone
    }

    /// UTM hemisphere
    pub fn set_utm_hemisphere(&mut self, hemisphere: Hemisphere) {
        self.utm_hemisphere = hemisphere;
        self.rotation_dirty = true;
    }

    /// UTM hemisphere
    pub const fn utm_hemisphere(&self) -> Hemisphere {
        self.utm_hemisphere
    }

    /// Radius of the rendered globe in local units
    pub fn set_globe_radius(&mut self, radius: f32) {
        self.globe_radius = radius;
    }

    /// Radius of the rendered globe in local units
    pub const fn globe_radius(&self) -> f32 {
        self.globe_radius
    }

    /// Stored magnetic declination, degrees
    pub fn set_magnetic_north_offset(&mut self, offset: f32) {
        self.magnetic_north_offset = offset;
    }

    /// Stored magnetic declination, degrees
    pub const fn magnetic_north_offset(&self) -> f32 {
        self.magnetic_north_offset
    }

    /// Whether local rotations are corrected by the origin rotation matrix
    pub fn set_apply_rotation_conversion_matrix(&mut self, apply: bool) {
        self.apply_rotation_conversion_matrix = apply;
    }

    /// Whether local rotations are corrected by the origin rotation matrix
    pub const fn apply_rotation_conversion_matrix(&self) -> bool {
        self.apply_rotation_conversion_matrix
    }

    /// True when a setter has run since the origin rotation was last computed
    pub const fn is_rotation_dirty(&self) -> bool {
        self.rotation_dirty
    }

    /// Rotation from the remote frame at the reference point into the local frame
    pub const fn origin_rotation_matrix(&self) -> &Mat4d {
        &self.rotation_offset
    }

    /// Inverse of [`Self::origin_rotation_matrix`]
    pub const fn origin_rotation_matrix_inverse(&self) -> &Mat4d {
        &self.rotation_offset_inverse
    }

    fn set_origin_rotation(&mut self, rotation: Mat4d) {
        self.rotation_offset_inverse = rotation
            .try_inverse()
            .unwrap_or_else(|| rotation.transpose());
        self.rotation_offset = rotation;
    }

    fn set_origin_rotation_from_lat_lon(&mut self, phi: f64, lambda: f64) {
        self.set_origin_rotation(local_rotation_matrix_ll(phi, lambda));
    }

    /// Recompute the origin rotation from the configured origin.
    ///
    /// Flat earth uses the flat earth origin, Cartesian UTM the geodetic
    /// position of the local offset. Globe and UTM input use identity.
    pub fn reconfigure_rotation_matrix(&mut self) {
        match self.incoming_type {
            IncomingCoordinateType::Geocentric | IncomingCoordinateType::Geodetic => {
                match self.local_type {
                    LocalCoordinateType::CartesianFlatEarth => {
                        let phi = utils::deg_to_rad(self.flat_earth_origin.x);
                        let lambda = utils::deg_to_rad(self.flat_earth_origin.y);
                        self.set_origin_rotation_from_lat_lon(phi, lambda);
                    }
                    LocalCoordinateType::CartesianUtm => {
                        let (phi, lambda) = convert_utm_to_geodetic(
                            self.utm_zone,
                            self.utm_hemisphere,
                            self.local_offset.x,
                            self.local_offset.y,
                        );
                        self.set_origin_rotation_from_lat_lon(phi, lambda);
                    }
                    LocalCoordinateType::Globe => self.set_origin_rotation(Mat4d::identity()),
                }
            }
            IncomingCoordinateType::Utm => self.set_origin_rotation(Mat4d::identity()),
        }
        self.rotation_dirty = false;
    }

    /// Anchor the origin rotation at a remote position.
    ///
    /// The rotation between a round earth and a flat frame is only valid
    /// locally, so callers pin it to each entity before converting that
    /// entity's orientation.
    pub fn set_remote_reference_for_origin_rotation_matrix(&mut self, translation: &Vec3d) {
        match self.incoming_type {
            IncomingCoordinateType::Geocentric | IncomingCoordinateType::Geodetic => {
                let (phi, lambda) = if self.incoming_type == IncomingCoordinateType::Geocentric {
                    let geodetic =
                        convert_geocentric_to_geodetic(translation.x, translation.y, translation.z);
                    (geodetic.latitude, geodetic.longitude)
                } else {
                    (
                        utils::deg_to_rad(translation.x),
                        utils::deg_to_rad(translation.y),
                    )
                };

                if self.local_type.is_cartesian() {
                    self.set_origin_rotation_from_lat_lon(phi, lambda);
                } else {
                    self.set_origin_rotation(Mat4d::identity());
                }
            }
            IncomingCoordinateType::Utm => self.set_origin_rotation(Mat4d::identity()),
        }
        self.rotation_dirty = false;
    }

    /// Place the local origin at a geodetic point given as (lat, lon, elevation) degrees.
    ///
    /// Picks the UTM zone and hemisphere containing the point, uses its UTM
    /// position as the local offset and anchors the origin rotation there.
    pub fn set_utm_local_offset_as_lat_lon(&mut self, lle: &Vec3d) {
        let (zone, band) = calculate_utm_zone(lle.x, lle.y);
        self.set_utm_zone(zone);
        self.set_utm_hemisphere(Hemisphere::from_band_letter(band));

        let phi = utils::deg_to_rad(lle.x);
        let lambda = utils::deg_to_rad(lle.y);
        let (easting, northing) =
            convert_geodetic_to_utm(phi, lambda, self.utm_zone, self.utm_hemisphere);
        self.local_offset = Vec3d::new(easting, northing, lle.z);

        self.set_origin_rotation_from_lat_lon(phi, lambda);
        self.rotation_dirty = false;
    }

    fn log_unsupported_globe(&self) {
        error!(
            "With local coordinates in globe mode, only {} coordinates are supported, not {}",
            IncomingCoordinateType::Geocentric,
            self.incoming_type
        );
    }

    /// Remote position to local engine position
    pub fn convert_to_local_translation(&self, remote: &Vec3d) -> Vec3 {
        if log_enabled!(Level::Debug) {
            debug!(
                "Converting coordinates. Incoming coordinates are {}, {}, {}",
                remote.x, remote.y, remote.z
            );
        }

        let mut position = match self.local_type {
            LocalCoordinateType::Globe => {
                if self.incoming_type == IncomingCoordinateType::Geocentric {
                    remote / SEMI_MAJOR_AXIS * f64::from(self.globe_radius)
                } else {
                    self.log_unsupported_globe();
                    Vec3d::zeros()
                }
            }
            LocalCoordinateType::CartesianUtm => {
                let utm = match self.incoming_type {
                    IncomingCoordinateType::Geocentric => {
                        let geodetic = convert_geocentric_to_geodetic(remote.x, remote.y, remote.z);
                        log_lat_lon("Incoming", geodetic.latitude, geodetic.longitude);
                        let (easting, northing) = convert_geodetic_to_utm(
                            geodetic.latitude,
                            geodetic.longitude,
                            self.utm_zone,
                            self.utm_hemisphere,
                        );
                        Vec3d::new(easting, northing, geodetic.elevation)
                    }
                    IncomingCoordinateType::Geodetic => {
                        let (easting, northing) = convert_geodetic_to_utm(
                            utils::deg_to_rad(remote.x),
                            utils::deg_to_rad(remote.y),
                            self.utm_zone,
                            self.utm_hemisphere,
                        );
                        Vec3d::new(easting, northing, remote.z)
                    }
                    IncomingCoordinateType::Utm => *remote,
                };
                utm - self.local_offset
            }
            LocalCoordinateType::CartesianFlatEarth => {
                let lle = match self.incoming_type {
                    IncomingCoordinateType::Geocentric => {
                        let geodetic = convert_geocentric_to_geodetic(remote.x, remote.y, remote.z);
                        log_lat_lon("Incoming", geodetic.latitude, geodetic.longitude);
                        geodetic.to_degrees()
                    }
                    IncomingCoordinateType::Geodetic => *remote,
                    IncomingCoordinateType::Utm => {
                        let (lat, lon) = convert_utm_to_geodetic(
                            self.utm_zone,
                            self.utm_hemisphere,
                            remote.x,
                            remote.y,
                        );
                        Vec3d::new(utils::rad_to_deg(lat), utils::rad_to_deg(lon), remote.z)
                    }
                };
                convert_lat_lon_to_flat_earth(&lle, &self.flat_earth_origin, self.convergence)
                    - self.local_offset
            }
        };

        if utils::zero_non_finite(position.as_mut_slice()) {
            error!("Local translation for {remote:?} was not finite, using zero components");
        }

        if log_enabled!(Level::Debug) {
            debug!(
                "Converting coordinates. Resulting coordinates are {}, {}, {}",
                position.x, position.y, position.z
            );
        }
        position.cast::<f32>()
    }

    /// Local engine position to remote position.
    ///
    /// The result also becomes the remote reference of the origin rotation
    /// matrix, so a rotation converted right after this uses the frame at
    /// this position.
    pub fn convert_to_remote_translation(&mut self, translation: &Vec3) -> Vec3d {
        if log_enabled!(Level::Debug) {
            debug!(
                "Converting to remote coordinates. Local coordinates are {}, {}, {}",
                translation.x, translation.y, translation.z
            );
        }

        let local = translation.cast::<f64>() + self.local_offset;

        let mut remote = match self.local_type {
            LocalCoordinateType::Globe => {
                if self.incoming_type == IncomingCoordinateType::Geocentric {
                    translation.cast::<f64>() / f64::from(self.globe_radius) * SEMI_MAJOR_AXIS
                } else {
                    self.log_unsupported_globe();
                    Vec3d::zeros()
                }
            }
            LocalCoordinateType::CartesianUtm => match self.incoming_type {
                IncomingCoordinateType::Geocentric => {
                    let (lat, lon) =
                        convert_utm_to_geodetic(self.utm_zone, self.utm_hemisphere, local.x, local.y);
                    log_lat_lon("Outgoing", lat, lon);
                    convert_geodetic_to_geocentric(lat, lon, local.z)
                }
                IncomingCoordinateType::Geodetic => {
                    let (lat, lon) =
                        convert_utm_to_geodetic(self.utm_zone, self.utm_hemisphere, local.x, local.y);
                    Vec3d::new(utils::rad_to_deg(lat), utils::rad_to_deg(lon), local.z)
                }
                IncomingCoordinateType::Utm => local,
            },
            LocalCoordinateType::CartesianFlatEarth => {
                let lle =
                    convert_flat_earth_to_lat_lon(&local, &self.flat_earth_origin, self.convergence);
                if log_enabled!(Level::Debug) {
                    debug!("Outgoing lat lon: {}, {}", lle.x, lle.y);
                }
                let lat = utils::deg_to_rad(lle.x);
                let lon = utils::deg_to_rad(lle.y);
                match self.incoming_type {
                    IncomingCoordinateType::Geocentric => {
                        convert_geodetic_to_geocentric(lat, lon, lle.z)
                    }
                    IncomingCoordinateType::Geodetic => lle,
                    IncomingCoordinateType::Utm => {
                        let (easting, northing) =
                            convert_geodetic_to_utm(lat, lon, self.utm_zone, self.utm_hemisphere);
                        Vec3d::new(easting, northing, lle.z)
                    }
                }
            }
        };

        if utils::zero_non_finite(remote.as_mut_slice()) {
            error!("Remote translation for {translation:?} was not finite, using zero components");
        }

        if log_enabled!(Level::Debug) {
            debug!(
                "Converting coordinates. Resulting coordinates are {}, {}, {}",
                remote.x, remote.y, remote.z
            );
        }

        self.set_remote_reference_for_origin_rotation_matrix(&remote);
        remote
    }

    /// DIS Euler angles (radians) to local heading, pitch, roll (degrees)
    pub fn convert_to_local_rotation(&mut self, psi: f64, theta: f64, phi: f64) -> Vec3 {
        if self.rotation_dirty {
            self.reconfigure_rotation_matrix();
        }

        if log_enabled!(Level::Debug) {
            debug!("Converting rotation. Incoming rotations are {psi}, {theta}, {phi}");
        }

        let mut rotation = eulers_to_matrix(psi, theta, phi);

        match self.local_type {
            LocalCoordinateType::Globe => {
                if self.incoming_type != IncomingCoordinateType::Geocentric {
                    self.log_unsupported_globe();
                }
            }
            LocalCoordinateType::CartesianUtm | LocalCoordinateType::CartesianFlatEarth => {
                if self.apply_rotation_conversion_matrix {
                    rotation = invert_rotation(&rotation) * rotation_part(&self.rotation_offset);
                }
                if self.incoming_type == IncomingCoordinateType::Geocentric {
                    rotation = z_flop(&rotation);
                }
            }
        }

        let mut hpr = matrix_to_hpr(&rotation);
        if log_enabled!(Level::Debug) {
            debug!(
                "Converting rotation. Resulting rotations are {}, {}, {}",
                hpr.x, hpr.y, hpr.z
            );
        }
        utils::zero_non_finite(hpr.as_mut_slice());
        hpr.cast::<f32>()
    }

    /// Local heading, pitch, roll (degrees) to DIS Euler angles (radians)
    pub fn convert_to_remote_rotation(&mut self, hpr: &Vec3) -> Vec3d {
        let mut rotation = hpr_to_matrix(&hpr.cast::<f64>());

        if self.rotation_dirty {
            self.reconfigure_rotation_matrix();
        }

        match self.local_type {
            LocalCoordinateType::Globe => {
                if self.incoming_type != IncomingCoordinateType::Geocentric {
                    self.log_unsupported_globe();
                }
            }
            LocalCoordinateType::CartesianUtm | LocalCoordinateType::CartesianFlatEarth => {
                if self.incoming_type == IncomingCoordinateType::Geocentric {
                    rotation = z_flop(&rotation);
                }
                rotation =
                    invert_rotation(&(rotation * rotation_part(&self.rotation_offset_inverse)));
            }
        }

        let (psi, theta, phi) = matrix_to_eulers(&rotation);
        let mut result = Vec3d::new(psi, theta, phi);
        utils::zero_non_finite(result.as_mut_slice());
        result
    }

    /// MGRS reference of a local position.
    ///
    /// The incoming type is switched temporarily and restored afterwards.
    pub fn xyz_to_mgrs(&mut self, position: &Vec3, resolution: u32) -> Result<String, CoordinateError> {
        let old_type = self.incoming_type;

        self.set_incoming_coordinate_type(IncomingCoordinateType::Geodetic);
        let lat_lon_elev = self.convert_to_remote_translation(position);
        let (zone, band) = calculate_utm_zone(lat_lon_elev.x, lat_lon_elev.y);

        self.set_incoming_coordinate_type(IncomingCoordinateType::Utm);
        let utm = self.convert_to_remote_translation(position);

        self.set_incoming_coordinate_type(old_type);

        convert_utm_to_mgrs(utm.x, utm.y, zone, band, resolution)
    }

    /// Local position of an MGRS reference at zero elevation.
    ///
    /// References without a zone prefix are read in the configured zone.
    pub fn convert_mgrs_to_xyz(&mut self, mgrs: &str) -> Result<Vec3, CoordinateError> {
        let (origin_lat, _) = convert_utm_to_geodetic(
            self.utm_zone,
            self.utm_hemisphere,
            self.local_offset.x,
            self.local_offset.y,
        );
        let default_band = latitude_band_letter(utils::rad_to_deg(origin_lat));
        let (zone, easting, northing) = convert_mgrs_to_utm(self.utm_zone, default_band, mgrs)?;
        if zone != self.utm_zone {
            warn!(
                "MGRS reference {mgrs} is in zone {zone}, but local coordinates use zone {}",
                self.utm_zone
            );
        }

        let old_type = self.incoming_type;
        self.set_incoming_coordinate_type(IncomingCoordinateType::Utm);
        let local = self.convert_to_local_translation(&Vec3d::new(easting, northing, 0.0));
        self.set_incoming_coordinate_type(old_type);
        Ok(local)
    }
}

fn log_lat_lon(direction: &str, lat: f64, lon: f64) {
    if log_enabled!(Level::Debug) {
        debug!(
            "{direction} lat lon: {}, {}",
            utils::rad_to_deg(lat),
            utils::rad_to_deg(lon)
        );
    }
}

fn invert_rotation(rotation: &Mat3d) -> Mat3d {
    rotation
        .try_inverse()
        .unwrap_or_else(|| rotation.transpose())
}

/// Longitude scale of a flat earth projection centered at `latitude` degrees
pub fn calculate_convergence_for_flat_earth(latitude: f64) -> f64 {
    utils::deg_to_rad(latitude).cos()
}

/// (lat, lon degrees, elevation) to flat earth meters around `origin`
pub fn convert_lat_lon_to_flat_earth(lle: &Vec3d, origin: &Vec2d, convergence: f64) -> Vec3d {
    Vec3d::new(
        (lle.y - origin.y) * METERS_PER_DEGREE * convergence,
        (lle.x - origin.x) * METERS_PER_DEGREE,
        lle.z,
    )
}

/// Flat earth meters around `origin` to (lat, lon degrees, elevation)
pub fn convert_flat_earth_to_lat_lon(xyz: &Vec3d, origin: &Vec2d, convergence: f64) -> Vec3d {
    Vec3d::new(
        origin.x + xyz.y / METERS_PER_DEGREE,
        origin.y + xyz.x / convergence / METERS_PER_DEGREE,
        xyz.z,
    )
}

/// Compass degrees to mils, measured counter-clockwise as 6400 per circle
pub fn degrees_to_mils(degrees: f32) -> u32 {
    let positive = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    let positive = 360.0 - positive;
    (positive * (6400.0 / 360.0)) as u32
}

/// Inverse of [`degrees_to_mils`]; values above 6400 are clamped
pub fn mils_to_degrees(mils: u32) -> f32 {
    let positive = mils.min(6400) as f32;
    360.0 - positive * (360.0 / 6400.0)
}

/// Bearing in degrees from a position (degrees) to the north magnetic pole
pub fn calculate_magnetic_north_offset(latitude: f32, longitude: f32) -> f32 {
    let phi = f64::from(latitude).to_radians();
    let lambda = f64::from(longitude).to_radians();
    let phi_mn = MAGNETIC_NORTH_LATITUDE.to_radians();
    let lambda_mn = MAGNETIC_NORTH_LONGITUDE.to_radians();

    let ldiff = lambda_mn - lambda;
    let cos_phi_mn = phi_mn.cos();

    (cos_phi_mn * ldiff.sin())
        .atan2(phi.cos() * phi_mn.sin() - phi.sin() * cos_phi_mn * ldiff.cos())
        .to_degrees() as f32
}
