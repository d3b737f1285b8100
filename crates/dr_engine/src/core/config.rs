//! # Unified Configuration System
//!
//! All configuration structures of the crate live here, so a single file can
//! describe a whole simulation context: coordinate frames, dead reckoning
//! tuning, and wire settings.
//!
//! ## Configuration Categories
//!
//! - **Coordinate Config**: remote and local frames, UTM zone, offsets
//! - **Dead Reckoning Config**: clamp interval and smoothing limits
//! - **Wire Config**: byte order of encoded records
//! - **Engine Settings**: the above plus the log filter

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::config::{Config, ConfigError};
use crate::coordinates::{Coordinates, Hemisphere, IncomingCoordinateType, LocalCoordinateType};
use crate::foundation::math::{Vec2d, Vec3d};

/// # Coordinate Configuration
///
/// Frame setup applied to a [`Coordinates`] converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConfig {
    /// Frame of incoming network data
    pub incoming_type: IncomingCoordinateType,
    /// Frame the engine uses
    pub local_type: LocalCoordinateType,
    /// Local origin in the remote grid (easting, northing, elevation for UTM)
    pub local_offset: [f64; 3],
    /// Flat earth origin as (latitude, longitude) degrees
    pub flat_earth_origin: [f64; 2],
    /// UTM zone 1 to 60
    pub utm_zone: u32,
    /// UTM hemisphere
    pub utm_hemisphere: Hemisphere,
    /// Globe radius in local units
    pub globe_radius: f32,
    /// Whether local rotations use the origin rotation matrix
    pub apply_rotation_conversion_matrix: bool,
    /// When set, overrides zone, hemisphere and offset from a
    /// (latitude, longitude, elevation) origin in degrees
    pub utm_origin_lat_lon: Option<[f64; 3]>,
}

impl CoordinateConfig {
    /// Create a new coordinate configuration
    pub fn new(incoming_type: IncomingCoordinateType, local_type: LocalCoordinateType) -> Self {
        Self {
            incoming_type,
            local_type,
            local_offset: [0.0; 3],
            flat_earth_origin: [0.0; 2],
            utm_zone: 1,
            utm_hemisphere: Hemisphere::North,
            globe_radius: 0.0,
            apply_rotation_conversion_matrix: true,
            utm_origin_lat_lon: None,
        }
    }

    /// Set the local offset
    pub fn with_local_offset(mut self, offset: [f64; 3]) -> Self {
        self.local_offset = offset;
        self
    }

    /// Set the flat earth origin
    pub fn with_flat_earth_origin(mut self, latitude: f64, longitude: f64) -> Self {
        self.flat_earth_origin = [latitude, longitude];
        self
    }

    /// Set the UTM zone and hemisphere
    pub fn with_utm_zone(mut self, zone: u32, hemisphere: Hemisphere) -> Self {
        self.utm_zone = zone;
        self.utm_hemisphere = hemisphere;
        self
    }

    /// Derive the UTM setup from a geodetic origin
    pub fn with_utm_origin_lat_lon(mut self, latitude: f64, longitude: f64, elevation: f64) -> Self {
        self.utm_origin_lat_lon = Some([latitude, longitude, elevation]);
        self
    }

    /// Set the globe radius
    pub fn with_globe_radius(mut self, radius: f32) -> Self {
        self.globe_radius = radius;
        self
    }

    /// Enable or disable the rotation conversion matrix
    pub fn with_rotation_conversion(mut self, enabled: bool) -> Self {
        self.apply_rotation_conversion_matrix = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=60).contains(&self.utm_zone) {
            return Err(format!("UTM zone must be 1 to 60, got {}", self.utm_zone));
        }
        if self.local_offset.iter().any(|v| !v.is_finite()) {
            return Err("Local offset must be finite".to_string());
        }
        let [lat, lon] = self.flat_earth_origin;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=360.0).contains(&lon) {
            return Err(format!("Flat earth origin ({lat}, {lon}) is not a valid latitude/longitude"));
        }
        if !self.globe_radius.is_finite() || self.globe_radius < 0.0 {
            return Err("Globe radius must be a non-negative number".to_string());
        }
        if self.local_type == LocalCoordinateType::Globe && self.globe_radius == 0.0 {
            return Err("Globe local coordinates need a globe radius".to_string());
        }
        if let Some([lat, lon, elevation]) = self.utm_origin_lat_lon {
            if !(-90.0..=90.0).contains(&lat) || !lon.is_finite() || !elevation.is_finite() {
                return Err(format!("UTM origin ({lat}, {lon}, {elevation}) is not valid"));
            }
        }
        Ok(())
    }

    /// Configure an existing converter
    pub fn apply_to(&self, coordinates: &mut Coordinates) {
        coordinates.set_incoming_coordinate_type(self.incoming_type);
        coordinates.set_local_coordinate_type(self.local_type);
        coordinates.set_globe_radius(self.globe_radius);
        coordinates.set_apply_rotation_conversion_matrix(self.apply_rotation_conversion_matrix);
        let [lat, lon] = self.flat_earth_origin;
        coordinates.set_flat_earth_origin(Vec2d::new(lat, lon));

        if let Some(origin) = self.utm_origin_lat_lon {
            coordinates.set_utm_local_offset_as_lat_lon(&Vec3d::from(origin));
        } else {
            coordinates.set_utm_zone(self.utm_zone);
            coordinates.set_utm_hemisphere(self.utm_hemisphere);
            coordinates.set_local_offset(Vec3d::from(self.local_offset));
        }
    }

    /// Build a converter from this configuration
    pub fn to_coordinates(&self) -> Coordinates {
        let mut coordinates = Coordinates::new();
        self.apply_to(&mut coordinates);
        coordinates
    }
}

impl Default for CoordinateConfig {
    fn default() -> Self {
        Self::new(IncomingCoordinateType::Utm, LocalCoordinateType::CartesianUtm)
    }
}

/// # Dead Reckoning Configuration
///
/// Tuning of the dead reckoning component and the defaults given to new helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadReckoningConfig {
    /// Component name
    pub component_name: String,
    /// Seconds between forced ground clamps of an unchanged actor
    pub force_clamp_interval: f32,
    /// Eye point distance within which clamping uses high resolution terrain
    pub high_res_ground_clamping_range: f32,
    /// Upper bound of translation smoothing for new helpers
    pub max_translation_smoothing_time: f32,
    /// Upper bound of rotation smoothing for new helpers
    pub max_rotation_smoothing_time: f32,
}

impl DeadReckoningConfig {
    /// Default component name
    pub const DEFAULT_NAME: &'static str = "Dead Reckoning Component";

    /// Create a new dead reckoning configuration
    pub fn new() -> Self {
        Self {
            component_name: Self::DEFAULT_NAME.to_string(),
            force_clamp_interval: 3.0,
            high_res_ground_clamping_range: 0.0,
            max_translation_smoothing_time: 8.0,
            max_rotation_smoothing_time: 2.0,
        }
    }

    /// Set the component name
    pub fn with_component_name(mut self, name: impl Into<String>) -> Self {
        self.component_name = name.into();
        self
    }

    /// Set the forced clamp interval
    pub fn with_force_clamp_interval(mut self, seconds: f32) -> Self {
        self.force_clamp_interval = seconds;
        self
    }

    /// Set the high resolution clamp range
    pub fn with_high_res_ground_clamping_range(mut self, range: f32) -> Self {
        self.high_res_ground_clamping_range = range;
        self
    }

    /// Set both smoothing limits
    pub fn with_smoothing_times(mut self, translation: f32, rotation: f32) -> Self {
        self.max_translation_smoothing_time = translation;
        self.max_rotation_smoothing_time = rotation;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.component_name.is_empty() {
            return Err("Component name cannot be empty".to_string());
        }
        let values = [
            ("force_clamp_interval", self.force_clamp_interval),
            ("high_res_ground_clamping_range", self.high_res_ground_clamping_range),
            ("max_translation_smoothing_time", self.max_translation_smoothing_time),
            ("max_rotation_smoothing_time", self.max_rotation_smoothing_time),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

impl Default for DeadReckoningConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Wire Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Encode and decode records little endian
    pub little_endian: bool,
}

impl WireConfig {
    /// Create a new wire configuration
    pub const fn new() -> Self {
        Self {
            little_endian: true,
        }
    }

    /// Set the byte order
    pub const fn with_little_endian(mut self, little_endian: bool) -> Self {
        self.little_endian = little_endian;
        self
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Settings
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// `env_logger` filter, e.g. `"info"` or `"dr_engine=debug"`
    pub log_level: String,
    /// Coordinate frames
    pub coordinates: CoordinateConfig,
    /// Dead reckoning tuning
    pub dead_reckoning: DeadReckoningConfig,
    /// Wire settings
    pub wire: WireConfig,
}

impl EngineSettings {
    /// Create settings with defaults everywhere
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            coordinates: CoordinateConfig::default(),
            dead_reckoning: DeadReckoningConfig::default(),
            wire: WireConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set coordinate configuration
    pub fn with_coordinates(mut self, coordinates: CoordinateConfig) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Set dead reckoning configuration
    pub fn with_dead_reckoning(mut self, dead_reckoning: DeadReckoningConfig) -> Self {
        self.dead_reckoning = dead_reckoning;
        self
    }

    /// Set wire configuration
    pub fn with_wire(mut self, wire: WireConfig) -> Self {
        self.wire = wire;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.log_level.is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        self.coordinates.validate()?;
        self.dead_reckoning.validate()?;
        Ok(())
    }

    /// Load from file and validate
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Self::load_from_file(path)?;
        settings.validate().map_err(ConfigError::Invalid)?;
        Ok(settings)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineSettings {}

impl Config for CoordinateConfig {}

impl Config for DeadReckoningConfig {}
