//! Ordered list of environmental process records

use log::{debug, warn};

use super::record::EnvironmentProcessRecord;
use super::record_type::RECORD_HEADER_SIZE;
use super::stream::DataStream;
use super::WireError;
use crate::coordinates::Coordinates;
use crate::core::WireConfig;

/// Record count (4) plus padding to 64 bits (4)
pub const LIST_HEADER_SIZE: usize = 8;

/// Records in wire order.
///
/// The coordinate converter is borrowed per call; encoding pins its origin
/// rotation to each record's location, so it needs to be mutable.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentProcessRecordList {
    records: Vec<EnvironmentProcessRecord>,
    counter: u32,
    little_endian: bool,
}

impl EnvironmentProcessRecordList {
    /// Create an empty list
    pub const fn new(little_endian: bool) -> Self {
        Self {
            records: Vec::new(),
            counter: 0,
            little_endian,
        }
    }

    /// Create an empty list with the configured byte order
    pub const fn from_config(config: &WireConfig) -> Self {
        Self::new(config.little_endian)
    }

    /// Byte order used for encode and decode
    pub const fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Number of records
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in wire order
    pub fn records(&self) -> &[EnvironmentProcessRecord] {
        &self.records
    }

    /// Mutable records in wire order
    pub fn records_mut(&mut self) -> &mut [EnvironmentProcessRecord] {
        &mut self.records
    }

    /// Append a new record named after the running counter ("000", "001", ...)
    pub fn add_record(&mut self) -> &mut EnvironmentProcessRecord {
        let record = self.next_record();
        self.records.push(record);
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    fn next_record(&mut self) -> EnvironmentProcessRecord {
        let mut record = EnvironmentProcessRecord::new(format!("{:03}", self.counter));
        record.set_index((self.counter % 256) as u8);
        self.counter = self.counter.wrapping_add(1);
        record
    }

    /// Remove every record with the given wire index
    pub fn remove_record(&mut self, index: u8) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.index() != index);
        self.records.len() != before
    }

    /// Remove all records
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Header plus the encoded size of every record
    pub fn encoded_size(&self) -> usize {
        LIST_HEADER_SIZE
            + self
                .records
                .iter()
                .map(EnvironmentProcessRecord::encoded_size)
                .sum::<usize>()
    }

    /// Encode into `buffer`, returning the bytes written.
    ///
    /// A buffer that cannot hold the whole list yields
    /// [`WireError::BufferTooSmall`] carrying the required size.
    pub fn encode(&self, buffer: &mut [u8], coords: &mut Coordinates) -> Result<usize, WireError> {
        let required = self.encoded_size();
        let available = buffer.len();
        if available < required {
            debug!("Record list needs {required} bytes, buffer holds {available}");
            return Err(WireError::BufferTooSmall {
                required,
                available,
            });
        }

        let count = u32::try_from(self.records.len())
            .map_err(|_| WireError::InvalidRecordCount(i32::MAX))?;

        let mut ds = DataStream::new(buffer, self.little_endian);
        ds.write_u32(count)?;
        ds.write_zeros(4)?;

        for record in &self.records {
            record.encode(&mut ds, coords)?;
        }

        Ok(usize::try_from(ds.position()).unwrap_or(required))
    }

    /// Encode into a freshly allocated buffer of exactly the required size
    pub fn encode_to_vec(&self, coords: &mut Coordinates) -> Result<Vec<u8>, WireError> {
        let mut buffer = vec![0; self.encoded_size()];
        let written = self.encode(&mut buffer, coords)?;
        buffer.truncate(written);
        Ok(buffer)
    }

    /// Replace the records with those decoded from `buffer`.
    ///
    /// Stops at the first record that fails to decode; records decoded before
    /// it are kept, the failing one is dropped.
    pub fn decode(&mut self, buffer: &[u8], coords: &mut Coordinates) -> Result<(), WireError> {
        if buffer.len() < LIST_HEADER_SIZE {
            warn!(
                "Not enough data to decode an environment process record list: expected {LIST_HEADER_SIZE} actual {}",
                buffer.len()
            );
            return Err(WireError::Truncated {
                expected: LIST_HEADER_SIZE,
                available: buffer.len(),
            });
        }

        let mut ds = DataStream::new(buffer, self.little_endian);
        let count = ds.read_i32()?;
        ds.skip(4)?;

        let max_records = ds.remaining() / RECORD_HEADER_SIZE;
        let count = match usize::try_from(count) {
            Ok(n) if n <= max_records => n,
            _ => {
                warn!(
                    "Invalid environment process record count {count}, at most {max_records} fit the buffer"
                );
                return Err(WireError::InvalidRecordCount(count));
            }
        };

        self.records.clear();
        self.records.reserve(count);

        for _ in 0..count {
            let mut record = self.next_record();
            record.decode(&mut ds, coords)?;
            self.records.push(record);
        }

        Ok(())
    }
}

impl Default for EnvironmentProcessRecordList {
    fn default() -> Self {
        Self::from_config(&WireConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec3, Vec3d};
    use crate::wire::{EnvironmentRecordType, RecordParameter};

    fn sample_list(little_endian: bool) -> EnvironmentProcessRecordList {
        let mut list = EnvironmentProcessRecordList::new(little_endian);

        let sphere = list.add_record();
        sphere.set_record_type(EnvironmentRecordType::BoundingSphere);
        sphere.set(RecordParameter::Location, Vec3d::new(5.0, 6.0, 7.0));
        sphere.set(RecordParameter::Radius, 12.0f32);

        let volume = list.add_record();
        volume.set_record_type(EnvironmentRecordType::Ellipsoid2);
        volume.set(RecordParameter::Dimension, Vec3::new(2.0, 3.0, 4.0));
        volume.set(RecordParameter::Velocity, Vec3::new(1.0, 0.0, 0.0));

        let vapor = list.add_record();
        vapor.set_record_type(EnvironmentRecordType::ChemVaporState);
        vapor.set(RecordParameter::Probability, 0.75f32);

        list
    }

    #[test]
    fn test_names_and_indices() {
        let list = sample_list(true);
        let names: Vec<&str> = list.records().iter().map(EnvironmentProcessRecord::name).collect();
        assert_eq!(names, vec!["000", "001", "002"]);
        assert_eq!(list.records()[2].index(), 2);
    }

    #[test]
    fn test_encoded_size() {
        let list = sample_list(true);
        assert_eq!(list.encoded_size(), 8 + 39 + 95 + 23);
        assert_eq!(EnvironmentProcessRecordList::default().encoded_size(), 8);
    }

    #[test]
    fn test_encode_header() {
        let mut coords = Coordinates::new();
        let list = sample_list(false);
        let bytes = list.encode_to_vec(&mut coords).unwrap();
        assert_eq!(bytes.len(), list.encoded_size());
        assert_eq!(&bytes[..4], &3u32.to_be_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_reports_required_size() {
        let mut coords = Coordinates::new();
        let list = sample_list(true);
        let mut buffer = vec![0u8; 100];
        match list.encode(&mut buffer, &mut coords) {
            Err(WireError::BufferTooSmall {
                required,
                available,
            }) => {
                assert_eq!(required, 165);
                assert_eq!(available, 100);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_decode_round_trip() {
        let mut coords = Coordinates::new();
        for little_endian in [true, false] {
            let list = sample_list(little_endian);
            let bytes = list.encode_to_vec(&mut coords).unwrap();

            let mut decoded = EnvironmentProcessRecordList::new(little_endian);
            decoded.decode(&bytes, &mut coords).unwrap();
            assert_eq!(decoded.num_records(), 3);

            let types: Vec<_> = decoded.records().iter().map(|r| r.record_type()).collect();
            assert_eq!(
                types,
                vec![
                    EnvironmentRecordType::BoundingSphere,
                    EnvironmentRecordType::Ellipsoid2,
                    EnvironmentRecordType::ChemVaporState
                ]
            );
            assert_eq!(decoded.records()[0].float(RecordParameter::Radius, 0.0), 12.0);
            assert_eq!(
                decoded.records()[1].vec3(RecordParameter::Dimension, Vec3::zeros()),
                Vec3::new(2.0, 3.0, 4.0)
            );
            assert_eq!(decoded.records()[2].float(RecordParameter::Probability, 0.0), 0.75);
        }
    }

    #[test]
    fn test_decode_keeps_records_before_failure() {
        let mut coords = Coordinates::new();
        let list = sample_list(true);
        let bytes = list.encode_to_vec(&mut coords).unwrap();

        // Cut into the second record's payload
        let cut = 8 + 39 + 20;
        let mut decoded = EnvironmentProcessRecordList::new(true);
        let result = decoded.decode(&bytes[..cut], &mut coords);
        assert!(matches!(result, Err(WireError::Truncated { .. })));
        assert_eq!(decoded.num_records(), 1);
        assert_eq!(
            decoded.records()[0].record_type(),
            EnvironmentRecordType::BoundingSphere
        );
    }

    #[test]
    fn test_decode_rejects_bad_counts() {
        let mut coords = Coordinates::new();
        let mut list = sample_list(true);

        let mut negative = (-1i32).to_le_bytes().to_vec();
        negative.extend_from_slice(&[0; 4]);
        assert!(matches!(
            list.decode(&negative, &mut coords),
            Err(WireError::InvalidRecordCount(-1))
        ));
        assert_eq!(list.num_records(), 3);

        let mut huge = 1_000_000i32.to_le_bytes().to_vec();
        huge.extend_from_slice(&[0; 20]);
        assert!(matches!(
            list.decode(&huge, &mut coords),
            Err(WireError::InvalidRecordCount(1_000_000))
        ));

        assert!(matches!(
            list.decode(&[0, 0, 0], &mut coords),
            Err(WireError::Truncated { expected: 8, .. })
        ));
    }

    #[test]
    fn test_decode_empty_list() {
        let mut coords = Coordinates::new();
        let mut list = sample_list(true);
        list.decode(&[0; 8], &mut coords).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_record() {
        let mut list = sample_list(true);
        list.records_mut()[2].set_index(0);
        assert!(list.remove_record(0));
        assert_eq!(list.num_records(), 1);
        assert!(!list.remove_record(0));
        list.clear();
        assert!(list.is_empty());
    }
}
