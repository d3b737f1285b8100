//! A single environmental process record

use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Write};

use super::record_type::{EnvironmentRecordType, RECORD_HEADER_SIZE};
use super::stream::{DataStream, WriteBuffer};
use super::WireError;
use crate::coordinates::Coordinates;
use crate::foundation::math::{pre_mult, rotation_part, Vec3, Vec3d};

/// Size of the length field, which counts itself
const LENGTH_FIELD_SIZE: usize = 2;

/// Named fields a record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordParameter {
    /// Local position of the process
    Location,
    /// Local position a puff was released from
    OriginationLocation,
    /// Heading, pitch, roll in degrees
    Orientation,
    /// Local velocity
    Velocity,
    /// Angular velocity, passed through unconverted
    AngularVelocity,
    /// Volume extents
    Dimension,
    /// Change of extents per second
    DimensionRate,
    /// Puff centroid height
    CentroidHeight,
    /// Sphere radius
    Radius,
    /// Change of radius per second
    RadiusRate,
    /// Agent enumeration
    AgentEnum,
    /// Geometry record index the state applies to
    GeomIndex,
    /// Total agent mass
    TotalMass,
    /// Smallest unit size
    MinUnitSize,
    /// Largest unit size
    MaxUnitSize,
    /// Average mass per unit
    AverageMassPerUnit,
    /// Agent purity in [0, 1]
    Purity,
    /// Radiological activity in Curies
    RadiologicalActivity,
    /// Biological viability in [0, 1]
    Viability,
    /// Probability in [0, 1]
    Probability,
}

impl RecordParameter {
    /// Parameter name as used by simulation messages
    pub const fn name(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::OriginationLocation => "OriginationLocation",
            Self::Orientation => "Orientation",
            Self::Velocity => "Velocity",
            Self::AngularVelocity => "AngularVelocity",
            Self::Dimension => "Dimension",
            Self::DimensionRate => "DimensionRate",
            Self::CentroidHeight => "CentroidHeight",
            Self::Radius => "Radius",
            Self::RadiusRate => "RadiusRate",
            Self::AgentEnum => "AgentEnum",
            Self::GeomIndex => "GeomIndex",
            Self::TotalMass => "TotalMass",
            Self::MinUnitSize => "MinUnitSize",
            Self::MaxUnitSize => "MaxUnitSize",
            Self::AverageMassPerUnit => "AverageMassPerUnit",
            Self::Purity => "Purity",
            Self::RadiologicalActivity => "RadiologicalActivity",
            Self::Viability => "Viability",
            Self::Probability => "Probability",
        }
    }

    /// Fields limited to [0, 1]
    pub const fn is_unit_range(self) -> bool {
        matches!(self, Self::Purity | Self::Viability | Self::Probability)
    }
}

impl fmt::Display for RecordParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    /// Single float
    Float(f32),
    /// 16-bit enumeration
    UShort(u16),
    /// Unsigned integer
    UInt(u32),
    /// Single precision vector
    Vec3(Vec3),
    /// Double precision vector
    Vec3d(Vec3d),
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<u16> for ParameterValue {
    fn from(value: u16) -> Self {
        Self::UShort(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        Self::UInt(value)
    }
}

impl From<Vec3> for ParameterValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Vec3d> for ParameterValue {
    fn from(value: Vec3d) -> Self {
        Self::Vec3d(value)
    }
}

/// One variant typed environmental record.
///
/// Only the parameters relevant to the record type are encoded; anything
/// missing is written as its default.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentProcessRecord {
    name: String,
    index: u8,
    record_type: EnvironmentRecordType,
    parameters: HashMap<RecordParameter, ParameterValue>,
}

impl EnvironmentProcessRecord {
    /// Create an empty record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            record_type: EnvironmentRecordType::default(),
            parameters: HashMap::new(),
        }
    }

    /// Record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire index
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Set the wire index
    pub fn set_index(&mut self, index: u8) {
        self.index = index;
    }

    /// Record type
    pub const fn record_type(&self) -> EnvironmentRecordType {
        self.record_type
    }

    /// Set the record type
    pub fn set_record_type(&mut self, record_type: EnvironmentRecordType) {
        self.record_type = record_type;
    }

    /// Raw type code
    pub const fn type_code(&self) -> u32 {
        self.record_type.code()
    }

    /// Set the raw type code
    pub fn set_type_code(&mut self, code: u32) {
        self.record_type = EnvironmentRecordType::from_code(code);
    }

    /// Bytes this record occupies on the wire
    pub const fn encoded_size(&self) -> usize {
        self.record_type.encoded_size()
    }

    /// Set a parameter
    pub fn set(&mut self, parameter: RecordParameter, value: impl Into<ParameterValue>) {
        self.parameters.insert(parameter, value.into());
    }

    /// Get a parameter
    pub fn get(&self, parameter: RecordParameter) -> Option<&ParameterValue> {
        self.parameters.get(&parameter)
    }

    /// Remove a parameter
    pub fn remove(&mut self, parameter: RecordParameter) -> Option<ParameterValue> {
        self.parameters.remove(&parameter)
    }

    /// Number of parameters set
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Float parameter, or `default` when missing or of another type
    pub fn float(&self, parameter: RecordParameter, default: f32) -> f32 {
        match self.get(parameter) {
            Some(ParameterValue::Float(value)) => *value,
            _ => default,
        }
    }

    /// Integer parameter; accepts both integer widths
    pub fn uint(&self, parameter: RecordParameter, default: u32) -> u32 {
        match self.get(parameter) {
            Some(ParameterValue::UInt(value)) => *value,
            Some(ParameterValue::UShort(value)) => u32::from(*value),
            _ => default,
        }
    }

    /// Single precision vector parameter
    pub fn vec3(&self, parameter: RecordParameter, default: Vec3) -> Vec3 {
        match self.get(parameter) {
            Some(ParameterValue::Vec3(value)) => *value,
            Some(ParameterValue::Vec3d(value)) => value.cast::<f32>(),
            _ => default,
        }
    }

    /// Double precision vector parameter
    pub fn vec3d(&self, parameter: RecordParameter, default: Vec3d) -> Vec3d {
        match self.get(parameter) {
            Some(ParameterValue::Vec3d(value)) => *value,
            Some(ParameterValue::Vec3(value)) => value.cast::<f64>(),
            _ => default,
        }
    }

    fn unit_float(&self, parameter: RecordParameter) -> f32 {
        clamp_unit(self.float(parameter, 0.0))
    }

    /// Encode into the stream at its current position.
    ///
    /// Returns the number of bytes written. Nothing is written when a fixed size
    /// stream cannot hold [`encoded_size`](Self::encoded_size) more bytes; a
    /// `Vec<u8>` stream grows instead.
    pub fn encode<B>(
        &self,
        ds: &mut DataStream<B>,
        coords: &mut Coordinates,
    ) -> Result<usize, WireError>
    where
        B: WriteBuffer,
        Cursor<B>: Write,
    {
        let required = self.encoded_size();
        let available = ds.writable();
        if available < required {
            return Err(WireError::BufferTooSmall {
                required,
                available,
            });
        }

        let start = ds.position();
        ds.write_u8(self.index)?;
        ds.write_u32(self.type_code())?;
        let length_position = ds.position();
        ds.write_u16(0)?;

        self.encode_variant(ds, coords)?;

        let end = ds.position();
        let length = end - length_position;
        ds.set_position(length_position);
        ds.write_u16(u16::try_from(length).unwrap_or(u16::MAX))?;
        ds.set_position(end);

        Ok(usize::try_from(end - start).unwrap_or(required))
    }

    fn encode_variant<B>(
        &self,
        ds: &mut DataStream<B>,
        coords: &mut Coordinates,
    ) -> Result<(), WireError>
    where
        B: WriteBuffer,
        Cursor<B>: Write,
    {
        use RecordParameter as P;
        let record_type = self.record_type;

        if record_type.is_sphere() {
            let location = self.remote_location(P::Location, coords);
            ds.write_vec3d(&location)?;
            ds.write_f32(self.float(P::Radius, 0.0))?;

            if record_type == EnvironmentRecordType::Sphere2 {
                ds.write_f32(self.float(P::RadiusRate, 0.0))?;
                ds.write_vec3(&self.remote_velocity(coords))?;
                ds.write_vec3(&self.vec3(P::AngularVelocity, Vec3::zeros()))?;
            } else {
                ds.write_zeros(4)?;
            }
        } else if record_type.is_volume() {
            let location = self.remote_location(P::Location, coords);
            ds.write_vec3d(&location)?;

            if record_type.is_puff() {
                let origination = self.remote_location(P::OriginationLocation, coords);
                // Orientation and velocity belong to the process location
                coords.set_remote_reference_for_origin_rotation_matrix(&location);
                ds.write_vec3d(&origination)?;
            }

            ds.write_vec3(&self.vec3(P::Dimension, Vec3::new(1.0, 1.0, 1.0)))?;
            if record_type.has_rates() {
                ds.write_vec3(&self.vec3(P::DimensionRate, Vec3::zeros()))?;
            }

            let orientation = self.vec3(P::Orientation, Vec3::zeros());
            let remote_orientation = coords.convert_to_remote_rotation(&orientation);
            ds.write_vec3(&remote_orientation.cast::<f32>())?;

            if record_type.has_rates() {
                ds.write_vec3(&self.remote_velocity(coords))?;
                ds.write_vec3(&self.vec3(P::AngularVelocity, Vec3::zeros()))?;

                if record_type.is_puff() {
                    ds.write_f32(self.float(P::CentroidHeight, 1.0))?;
                    if record_type == EnvironmentRecordType::GaussianPuffEx {
                        ds.write_zeros(16)?;
                    }
                } else {
                    ds.write_zeros(4)?;
                }
            }
        } else if record_type.is_cbrn_state() {
            let geom_index = self.uint(P::GeomIndex, 0);
            ds.write_u16(self.uint(P::AgentEnum, 0) as u16)?;
            ds.write_u16(geom_index as u16)?;
            ds.write_f32(self.float(P::TotalMass, 0.0))?;

            match record_type {
                EnvironmentRecordType::ChemVaporState => ds.write_zeros(4)?,
                EnvironmentRecordType::RadiologicalState => {
                    self.write_unit_sizes(ds)?;
                    // Curies, not a ratio
                    ds.write_f32(self.float(P::RadiologicalActivity, 0.0))?;
                }
                EnvironmentRecordType::ChemLiquidState => {
                    self.write_unit_sizes(ds)?;
                    ds.write_f32(self.unit_float(P::Purity))?;
                    ds.write_zeros(4)?;
                }
                _ => {
                    self.write_unit_sizes(ds)?;
                    ds.write_f32(self.unit_float(P::Purity))?;
                    ds.write_f32(self.unit_float(P::Viability))?;
                }
            }

            ds.write_f32(self.unit_float(P::Probability))?;
            if record_type == EnvironmentRecordType::RadiologicalState {
                ds.write_zeros(4)?;
            }
        }

        Ok(())
    }

    fn write_unit_sizes<B>(&self, ds: &mut DataStream<B>) -> Result<(), WireError>
    where
        B: WriteBuffer,
        Cursor<B>: Write,
    {
        ds.write_f32(self.float(RecordParameter::MinUnitSize, 0.0))?;
        ds.write_f32(self.float(RecordParameter::MaxUnitSize, 0.0))?;
        ds.write_f32(self.float(RecordParameter::AverageMassPerUnit, 0.0))?;
        Ok(())
    }

    fn remote_location(&self, parameter: RecordParameter, coords: &mut Coordinates) -> Vec3d {
        let local = self.vec3d(parameter, Vec3d::zeros()).cast::<f32>();
        coords.convert_to_remote_translation(&local)
    }

    fn remote_velocity(&self, coords: &Coordinates) -> Vec3 {
        let velocity = self.vec3(RecordParameter::Velocity, Vec3::zeros()).cast::<f64>();
        let inverse = rotation_part(coords.origin_rotation_matrix_inverse());
        pre_mult(&inverse, &velocity).cast::<f32>()
    }

    /// Decode from the stream at its current position, replacing every field.
    ///
    /// Never reads past the length the record header declares. On failure a
    /// warning is logged and the record keeps whatever was read so far.
    pub fn decode<B: AsRef<[u8]>>(
        &mut self,
        ds: &mut DataStream<B>,
        coords: &mut Coordinates,
    ) -> Result<(), WireError> {
        let available = ds.remaining();
        if available < RECORD_HEADER_SIZE {
            warn!(
                "Not enough data left to decode environment process record header: expected {RECORD_HEADER_SIZE} actual {available}"
            );
            return Err(WireError::Truncated {
                expected: RECORD_HEADER_SIZE,
                available,
            });
        }

        self.parameters.clear();
        self.index = ds.read_u8()?;
        self.set_type_code(ds.read_u32()?);
        let length = usize::from(ds.read_u16()?);
        let payload_length = length.saturating_sub(LENGTH_FIELD_SIZE);

        let available = ds.remaining();
        if available < payload_length {
            warn!(
                "Not enough data left to decode environment process record variant: expected {payload_length} actual {available}"
            );
            return Err(WireError::Truncated {
                expected: payload_length,
                available,
            });
        }

        let payload = ds.read_bytes(payload_length)?;
        if !self.record_type.has_payload() {
            debug!(
                "Skipped {payload_length} payload bytes of environment record type {}",
                self.record_type
            );
            return Ok(());
        }

        let expected = self.record_type.payload_size();
        if payload_length < expected {
            warn!(
                "Environment process record {} declares {payload_length} payload bytes but needs {expected}",
                self.record_type
            );
            return Err(WireError::Truncated {
                expected,
                available: payload_length,
            });
        }

        let mut payload_stream = DataStream::new(&payload[..], ds.is_little_endian());
        self.decode_variant(&mut payload_stream, coords)
    }

    fn decode_variant(
        &mut self,
        ds: &mut DataStream<&[u8]>,
        coords: &mut Coordinates,
    ) -> Result<(), WireError> {
        use RecordParameter as P;
        let record_type = self.record_type;

        if record_type.is_sphere() {
            let location = read_local_location(ds, coords, true)?;
            self.set(P::Location, location);
            self.set(P::Radius, ds.read_f32()?);

            if record_type == EnvironmentRecordType::Sphere2 {
                self.set(P::RadiusRate, ds.read_f32()?);
                let velocity = local_velocity(&ds.read_vec3()?, coords);
                self.set(P::Velocity, velocity);
                self.set(P::AngularVelocity, ds.read_vec3()?);
            }
        } else if record_type.is_volume() {
            let location = read_local_location(ds, coords, true)?;
            self.set(P::Location, location);

            if record_type.is_puff() {
                let origination = read_local_location(ds, coords, false)?;
                self.set(P::OriginationLocation, origination);
            }

            self.set(P::Dimension, ds.read_vec3()?);
            if record_type.has_rates() {
                self.set(P::DimensionRate, ds.read_vec3()?);
            }

            let remote = ds.read_vec3()?.cast::<f64>();
            let orientation = coords.convert_to_local_rotation(remote.x, remote.y, remote.z);
            self.set(P::Orientation, orientation);

            if record_type.has_rates() {
                let velocity = local_velocity(&ds.read_vec3()?, coords);
                self.set(P::Velocity, velocity);
                self.set(P::AngularVelocity, ds.read_vec3()?);

                if record_type.is_puff() {
                    self.set(P::CentroidHeight, ds.read_f32()?);
                }
            }
        } else if record_type.is_cbrn_state() {
            self.set(P::AgentEnum, ds.read_u16()?);
            self.set(P::GeomIndex, u32::from(ds.read_u16()?));
            self.set(P::TotalMass, ds.read_f32()?);

            if record_type == EnvironmentRecordType::ChemVaporState {
                ds.skip(4)?;
            } else {
                self.set(P::MinUnitSize, ds.read_f32()?);
                self.set(P::MaxUnitSize, ds.read_f32()?);
                self.set(P::AverageMassPerUnit, ds.read_f32()?);
                let purity_or_activity = ds.read_f32()?;

                match record_type {
                    EnvironmentRecordType::RadiologicalState => {
                        self.set(P::RadiologicalActivity, purity_or_activity);
                    }
                    EnvironmentRecordType::ChemLiquidState => {
                        self.set(P::Purity, clamp_unit(purity_or_activity));
                        ds.skip(4)?;
                    }
                    _ => {
                        self.set(P::Purity, clamp_unit(purity_or_activity));
                        self.set(P::Viability, clamp_unit(ds.read_f32()?));
                    }
                }
            }

            self.set(P::Probability, clamp_unit(ds.read_f32()?));
        }

        Ok(())
    }
}

fn read_local_location(
    ds: &mut DataStream<&[u8]>,
    coords: &mut Coordinates,
    pin_reference: bool,
) -> Result<Vec3d, WireError> {
    let remote = ds.read_vec3d()?;
    if pin_reference {
        coords.set_remote_reference_for_origin_rotation_matrix(&remote);
    }
    Ok(coords.convert_to_local_translation(&remote).cast::<f64>())
}

fn local_velocity(remote: &Vec3, coords: &Coordinates) -> Vec3 {
    let rotation = rotation_part(coords.origin_rotation_matrix());
    pre_mult(&rotation, &remote.cast::<f64>()).cast::<f32>()
}

/// Clamp to [0, 1]; NaN becomes 0
fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
