//! Coordinate conversion between remote (network) and local (engine) frames
//!
//! This module provides:
//! - WGS84 geocentric/geodetic conversions
//! - UTM projection and zone selection
//! - MGRS formatting and parsing
//! - DIS Euler angle handling
//! - The stateful [`Coordinates`] converter used by the wire codec

pub mod converter;
pub mod ellipsoid;
pub mod euler;
pub mod mgrs;
pub mod utm;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use converter::{
    calculate_magnetic_north_offset, degrees_to_mils, mils_to_degrees, Coordinates,
    METERS_PER_DEGREE,
};

/// Errors raised for user supplied coordinate text and parameters
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    /// Malformed input such as an unparsable MGRS reference
    #[error("invalid coordinate input: {0}")]
    InvalidInput(String),

    /// MGRS resolution outside 0..=5
    #[error("MGRS resolution must be between 0 and 5 inclusive, got {0}")]
    InvalidResolution(u32),
}

/// Frame of positions and orientations arriving from the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IncomingCoordinateType {
    /// Earth-centered Cartesian meters
    Geocentric,
    /// Latitude, longitude in degrees and elevation in meters
    Geodetic,
    /// Easting, northing and elevation in the configured UTM zone
    #[default]
    Utm,
}

impl IncomingCoordinateType {
    /// All variants in declaration order
    pub const ALL: [Self; 3] = [Self::Geocentric, Self::Geodetic, Self::Utm];

    /// Display name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Geocentric => "Geocentric",
            Self::Geodetic => "Geodetic",
            Self::Utm => "UTM",
        }
    }
}

impl fmt::Display for IncomingCoordinateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame the engine renders in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocalCoordinateType {
    /// Scaled geocentric globe
    Globe,
    /// Flat earth tangent plane around an origin latitude/longitude
    CartesianFlatEarth,
    /// UTM grid offset by the local origin
    #[default]
    CartesianUtm,
}

impl LocalCoordinateType {
    /// All variants in declaration order
    pub const ALL: [Self; 3] = [Self::Globe, Self::CartesianFlatEarth, Self::CartesianUtm];

    /// Display name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Globe => "Globe",
            Self::CartesianFlatEarth => "Cartesian Flat Earth",
            Self::CartesianUtm => "Cartesian UTM",
        }
    }

    /// Whether this is one of the Cartesian frames
    pub const fn is_cartesian(self) -> bool {
        matches!(self, Self::CartesianFlatEarth | Self::CartesianUtm)
    }
}

impl fmt::Display for LocalCoordinateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// UTM hemisphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hemisphere {
    /// Northern, no false northing
    #[default]
    North,
    /// Southern, 10,000 km false northing
    South,
}

impl Hemisphere {
    /// `'S'` or `'s'` is south, anything else north
    pub const fn from_char(c: char) -> Self {
        match c {
            'S' | 's' => Self::South,
            _ => Self::North,
        }
    }

    /// Hemisphere of a latitude band letter (`N` and above are north)
    pub const fn from_band_letter(band: char) -> Self {
        if band.to_ascii_uppercase() >= 'N' {
            Self::North
        } else {
            Self::South
        }
    }

    /// `'N'` or `'S'`
    pub const fn as_char(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_parsing() {
        assert_eq!(Hemisphere::from_char('s'), Hemisphere::South);
        assert_eq!(Hemisphere::from_char('N'), Hemisphere::North);
        assert_eq!(Hemisphere::from_char('x'), Hemisphere::North);
        assert_eq!(Hemisphere::from_band_letter('M'), Hemisphere::South);
        assert_eq!(Hemisphere::from_band_letter('N'), Hemisphere::North);
        assert_eq!(Hemisphere::South.to_string(), "S");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(IncomingCoordinateType::Utm.to_string(), "UTM");
        assert_eq!(LocalCoordinateType::CartesianFlatEarth.to_string(), "Cartesian Flat Earth");
        assert!(!LocalCoordinateType::Globe.is_cartesian());
        assert_eq!(IncomingCoordinateType::ALL.len(), 3);
    }
}
