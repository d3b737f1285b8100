//! Environmental process record type codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes in front of every record payload: index (1), type code (4), length (2)
pub const RECORD_HEADER_SIZE: usize = 1 + 4 + 2;

/// Variant shape of an [`EnvironmentProcessRecord`](super::EnvironmentProcessRecord)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentRecordType {
    /// COMBIC state
    CombicState,
    /// Flare state
    FlareState,
    /// Biological agent state
    BiologicalState,
    /// Chemical liquid state
    ChemLiquidState,
    /// Chemical vapor state
    ChemVaporState,
    /// Radiological state
    RadiologicalState,
    /// Bounding sphere
    BoundingSphere,
    /// Uniform geometry
    UniformGeometry,
    /// Point, first form
    Point1,
    /// Line, first form
    Line1,
    /// Sphere, first form
    Sphere1,
    /// Ellipsoid without rates
    Ellipsoid1,
    /// Cone, first form
    Cone1,
    /// Rectangular volume without rates
    RectangularVolume1,
    /// Rectangular volume, third form
    RectangularVolume3,
    /// Point, second form
    Point2,
    /// Line, second form
    Line2,
    /// Sphere with radius rate and velocities
    Sphere2,
    /// Ellipsoid with rates and velocities
    Ellipsoid2,
    /// Cone, second form
    Cone2,
    /// Rectangular volume with rates and velocities
    RectangularVolume2,
    /// Gaussian plume
    GaussianPlume,
    /// Gaussian puff
    GaussianPuff,
    /// Gaussian puff with trailing reserved floats
    GaussianPuffEx,
    /// Any code this crate does not know; carried through as header only
    Unknown(u32),
}

impl EnvironmentRecordType {
    /// Every known record type
    pub const KNOWN: [Self; 24] = [
        Self::CombicState,
        Self::FlareState,
        Self::BiologicalState,
        Self::ChemLiquidState,
        Self::ChemVaporState,
        Self::RadiologicalState,
        Self::BoundingSphere,
        Self::UniformGeometry,
        Self::Point1,
        Self::Line1,
        Self::Sphere1,
        Self::Ellipsoid1,
        Self::Cone1,
        Self::RectangularVolume1,
        Self::RectangularVolume3,
        Self::Point2,
        Self::Line2,
        Self::Sphere2,
        Self::Ellipsoid2,
        Self::Cone2,
        Self::RectangularVolume2,
        Self::GaussianPlume,
        Self::GaussianPuff,
        Self::GaussianPuffEx,
    ];

    /// Map a wire code to a record type
    pub const fn from_code(code: u32) -> Self {
        match code {
            256 => Self::CombicState,
            259 => Self::FlareState,
            4096 => Self::BiologicalState,
            4097 => Self::ChemLiquidState,
            4098 => Self::ChemVaporState,
            4099 => Self::RadiologicalState,
            65_536 => Self::BoundingSphere,
            327_680 => Self::UniformGeometry,
            655_360 => Self::Point1,
            786_432 => Self::Line1,
            851_968 => Self::Sphere1,
            1_048_576 => Self::Ellipsoid1,
            3_145_728 => Self::Cone1,
            5_242_880 => Self::RectangularVolume1,
            83_886_080 => Self::RectangularVolume3,
            167_772_160 => Self::Point2,
            201_326_592 => Self::Line2,
            218_103_808 => Self::Sphere2,
            268_435_456 => Self::Ellipsoid2,
            805_306_368 => Self::Cone2,
            1_342_177_280 => Self::RectangularVolume2,
            1_610_612_736 => Self::GaussianPlume,
            1_879_048_192 => Self::GaussianPuff,
            1_879_048_193 => Self::GaussianPuffEx,
            other => Self::Unknown(other),
        }
    }

    /// Wire code
    pub const fn code(self) -> u32 {
        match self {
            Self::CombicState => 256,
            Self::FlareState => 259,
            Self::BiologicalState => 4096,
            Self::ChemLiquidState => 4097,
            Self::ChemVaporState => 4098,
            Self::RadiologicalState => 4099,
            Self::BoundingSphere => 65_536,
            Self::UniformGeometry => 327_680,
            Self::Point1 => 655_360,
            Self::Line1 => 786_432,
            Self::Sphere1 => 851_968,
            Self::Ellipsoid1 => 1_048_576,
            Self::Cone1 => 3_145_728,
            Self::RectangularVolume1 => 5_242_880,
            Self::RectangularVolume3 => 83_886_080,
            Self::Point2 => 167_772_160,
            Self::Line2 => 201_326_592,
            Self::Sphere2 => 218_103_808,
            Self::Ellipsoid2 => 268_435_456,
            Self::Cone2 => 805_306_368,
            Self::RectangularVolume2 => 1_342_177_280,
            Self::GaussianPlume => 1_610_612_736,
            Self::GaussianPuff => 1_879_048_192,
            Self::GaussianPuffEx => 1_879_048_193,
            Self::Unknown(code) => code,
        }
    }

    /// Payload bytes this type occupies after the header
    pub const fn payload_size(self) -> usize {
        match self {
            Self::BoundingSphere
            | Self::Sphere1
            | Self::BiologicalState
            | Self::ChemLiquidState
            | Self::RadiologicalState => 32,
            Self::Sphere2 => 56,
            Self::RectangularVolume1 | Self::Ellipsoid1 => 48,
            Self::RectangularVolume2 | Self::Ellipsoid2 => 88,
            Self::GaussianPuff => 112,
            Self::GaussianPuffEx => 128,
            Self::ChemVaporState => 16,
            _ => 0,
        }
    }

    /// Header plus payload bytes
    pub const fn encoded_size(self) -> usize {
        RECORD_HEADER_SIZE + self.payload_size()
    }

    /// Sphere shaped records
    pub const fn is_sphere(self) -> bool {
        matches!(self, Self::BoundingSphere | Self::Sphere1 | Self::Sphere2)
    }

    /// Rectangular, ellipsoid and puff volumes
    pub const fn is_volume(self) -> bool {
        matches!(
            self,
            Self::RectangularVolume1
                | Self::RectangularVolume2
                | Self::Ellipsoid1
                | Self::Ellipsoid2
                | Self::GaussianPuff
                | Self::GaussianPuffEx
        )
    }

    /// Chemical, biological and radiological state blocks
    pub const fn is_cbrn_state(self) -> bool {
        matches!(
            self,
            Self::BiologicalState
                | Self::ChemLiquidState
                | Self::ChemVaporState
                | Self::RadiologicalState
        )
    }

    /// Gaussian puffs, which carry an origination location and centroid height
    pub const fn is_puff(self) -> bool {
        matches!(self, Self::GaussianPuff | Self::GaussianPuffEx)
    }

    /// Volumes that carry dimension rate, velocity and angular velocity
    pub const fn has_rates(self) -> bool {
        self.is_volume() && !matches!(self, Self::RectangularVolume1 | Self::Ellipsoid1)
    }

    /// Whether the codec reads and writes a payload for this type
    pub const fn has_payload(self) -> bool {
        self.payload_size() > 0
    }
}

impl Default for EnvironmentRecordType {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl From<u32> for EnvironmentRecordType {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl From<EnvironmentRecordType> for u32 {
    fn from(record_type: EnvironmentRecordType) -> Self {
        record_type.code()
    }
}

impl fmt::Display for EnvironmentRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            known => write!(f, "{known:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for record_type in EnvironmentRecordType::KNOWN {
            assert_eq!(EnvironmentRecordType::from_code(record_type.code()), record_type);
        }
        assert_eq!(EnvironmentRecordType::from_code(12), EnvironmentRecordType::Unknown(12));
        assert_eq!(EnvironmentRecordType::Unknown(12).code(), 12);
    }

    #[test]
    fn test_encoded_size_table() {
        use EnvironmentRecordType as T;
        assert_eq!(T::BoundingSphere.encoded_size(), 39);
        assert_eq!(T::Sphere1.encoded_size(), 39);
        assert_eq!(T::Sphere2.encoded_size(), 63);
        assert_eq!(T::RectangularVolume1.encoded_size(), 55);
        assert_eq!(T::RectangularVolume2.encoded_size(), 95);
        assert_eq!(T::Ellipsoid1.encoded_size(), 55);
        assert_eq!(T::Ellipsoid2.encoded_size(), 95);
        assert_eq!(T::GaussianPuff.encoded_size(), 119);
        assert_eq!(T::GaussianPuffEx.encoded_size(), 135);
        assert_eq!(T::BiologicalState.encoded_size(), 39);
        assert_eq!(T::ChemLiquidState.encoded_size(), 39);
        assert_eq!(T::RadiologicalState.encoded_size(), 39);
        assert_eq!(T::ChemVaporState.encoded_size(), 23);
        assert_eq!(T::GaussianPlume.encoded_size(), 7);
        assert_eq!(T::CombicState.encoded_size(), 7);
        assert_eq!(T::Unknown(99).encoded_size(), 7);
    }

    #[test]
    fn test_shape_groups() {
        assert!(EnvironmentRecordType::Sphere2.is_sphere());
        assert!(EnvironmentRecordType::GaussianPuffEx.is_puff());
        assert!(EnvironmentRecordType::GaussianPuff.has_rates());
        assert!(!EnvironmentRecordType::Ellipsoid1.has_rates());
        assert!(EnvironmentRecordType::ChemVaporState.is_cbrn_state());
        assert!(!EnvironmentRecordType::Cone2.has_payload());
    }
}
