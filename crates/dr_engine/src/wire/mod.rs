//! Binary codec for environmental process records
//!
//! Records are encoded as:
//!
//! ```text
//! [1 byte index][4 byte type code][2 byte length][payload...]
//! ```
//!
//! The length counts its own two bytes plus the payload. A record list puts a
//! 4 byte record count and 4 bytes of padding in front of its records. All
//! numbers use the byte order chosen per list.
//!
//! Locations, velocities and orientations are converted between the local and
//! remote frames with a [`Coordinates`](crate::coordinates::Coordinates)
//! converter while encoding and decoding.

pub mod record;
pub mod record_list;
pub mod record_type;
pub mod stream;

use thiserror::Error;

pub use record::{EnvironmentProcessRecord, ParameterValue, RecordParameter};
pub use record_list::{EnvironmentProcessRecordList, LIST_HEADER_SIZE};
pub use record_type::{EnvironmentRecordType, RECORD_HEADER_SIZE};
pub use stream::{DataStream, WriteBuffer};

/// Wire codec errors
#[derive(Debug, Error)]
pub enum WireError {
    /// Output buffer cannot hold the encoded data
    #[error("buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall {
        /// Bytes needed for the whole encoding
        required: usize,
        /// Bytes the buffer offered
        available: usize,
    },

    /// Input ended before the declared data
    #[error("truncated data: expected {expected} bytes, {available} available")]
    Truncated {
        /// Bytes the header promised
        expected: usize,
        /// Bytes left in the input
        available: usize,
    },

    /// Record count that is negative or cannot fit in the input
    #[error("invalid record count {0}")]
    InvalidRecordCount(i32),

    /// Underlying stream error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
