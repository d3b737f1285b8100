//! Seekable byte stream with a runtime byte order

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use crate::foundation::math::{Vec3, Vec3d};

macro_rules! endian_read {
    ($self:ident, $method:ident) => {
        if $self.little_endian {
            $self.cursor.$method::<LittleEndian>()
        } else {
            $self.cursor.$method::<BigEndian>()
        }
    };
}

macro_rules! endian_write {
    ($self:ident, $method:ident, $value:expr) => {
        if $self.little_endian {
            $self.cursor.$method::<LittleEndian>($value)
        } else {
            $self.cursor.$method::<BigEndian>($value)
        }
    };
}

/// Buffer a [`DataStream`] can write into
pub trait WriteBuffer: AsRef<[u8]> {
    /// Whether writing past the end extends the buffer
    const GROWABLE: bool;
}

impl WriteBuffer for &mut [u8] {
    const GROWABLE: bool = false;
}

impl WriteBuffer for Vec<u8> {
    const GROWABLE: bool = true;
}

impl WriteBuffer for &mut Vec<u8> {
    const GROWABLE: bool = true;
}

/// Cursor over a byte buffer that reads and writes numbers in a chosen byte order.
///
/// Read methods are available for any `AsRef<[u8]>` buffer, write methods for
/// [`WriteBuffer`]s. A `&mut [u8]` has a fixed capacity while a `Vec<u8>`
/// grows as it is written.
#[derive(Debug)]
pub struct DataStream<B> {
    cursor: Cursor<B>,
    little_endian: bool,
}

impl<B: AsRef<[u8]>> DataStream<B> {
    /// Wrap a buffer, positioned at its start
    pub fn new(buffer: B, little_endian: bool) -> Self {
        Self {
            cursor: Cursor::new(buffer),
            little_endian,
        }
    }

    /// Whether numbers are little endian
    pub const fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Current byte offset
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Move to an absolute byte offset
    pub fn set_position(&mut self, position: u64) {
        self.cursor.set_position(position);
    }

    /// Total bytes in the underlying buffer
    pub fn capacity(&self) -> usize {
        self.cursor.get_ref().as_ref().len()
    }

    /// Bytes between the current position and the end of the buffer
    pub fn remaining(&self) -> usize {
        let position = usize::try_from(self.cursor.position()).unwrap_or(usize::MAX);
        self.capacity().saturating_sub(position)
    }

    /// Advance the position without touching the bytes
    pub fn skip(&mut self, bytes: usize) -> io::Result<()> {
        self.cursor.seek(SeekFrom::Current(bytes as i64)).map(|_| ())
    }

    /// Unwrap the buffer
    pub fn into_inner(self) -> B {
        self.cursor.into_inner()
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.cursor.read_u8()
    }

    /// Read an unsigned 16-bit integer
    pub fn read_u16(&mut self) -> io::Result<u16> {
        endian_read!(self, read_u16)
    }

    /// Read an unsigned 32-bit integer
    pub fn read_u32(&mut self) -> io::Result<u32> {
        endian_read!(self, read_u32)
    }

    /// Read a signed 32-bit integer
    pub fn read_i32(&mut self) -> io::Result<i32> {
        endian_read!(self, read_i32)
    }

    /// Read a single precision float
    pub fn read_f32(&mut self) -> io::Result<f32> {
        endian_read!(self, read_f32)
    }

    /// Read a double precision float
    pub fn read_f64(&mut self) -> io::Result<f64> {
        endian_read!(self, read_f64)
    }

    /// Read three single precision floats
    pub fn read_vec3(&mut self) -> io::Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read three double precision floats
    pub fn read_vec3d(&mut self) -> io::Result<Vec3d> {
        Ok(Vec3d::new(self.read_f64()?, self.read_f64()?, self.read_f64()?))
    }

    /// Read exactly `len` bytes into a new buffer
    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut bytes = vec![0; len];
        self.cursor.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

impl<B: WriteBuffer> DataStream<B>
where
    Cursor<B>: Write,
{
    /// Bytes that can still be written from the current position
    pub fn writable(&self) -> usize {
        if B::GROWABLE {
            usize::MAX
        } else {
            self.remaining()
        }
    }

    /// Write one byte
    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.cursor.write_u8(value)
    }

    /// Write an unsigned 16-bit integer
    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        endian_write!(self, write_u16, value)
    }

    /// Write an unsigned 32-bit integer
    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        endian_write!(self, write_u32, value)
    }

    /// Write a signed 32-bit integer
    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        endian_write!(self, write_i32, value)
    }

    /// Write a single precision float
    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        endian_write!(self, write_f32, value)
    }

    /// Write a double precision float
    pub fn write_f64(&mut self, value: f64) -> io::Result<()> {
        endian_write!(self, write_f64, value)
    }

    /// Write three single precision floats
    pub fn write_vec3(&mut self, value: &Vec3) -> io::Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    /// Write three double precision floats
    pub fn write_vec3d(&mut self, value: &Vec3d) -> io::Result<()> {
        self.write_f64(value.x)?;
        self.write_f64(value.y)?;
        self.write_f64(value.z)
    }

    /// Write `count` zero bytes
    pub fn write_zeros(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            self.cursor.write_u8(0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order() {
        let mut little = DataStream::new(vec![0u8; 0], true);
        little.write_u32(0x0102_0304).unwrap();
        assert_eq!(little.into_inner(), vec![4, 3, 2, 1]);

        let mut big = DataStream::new(vec![0u8; 0], false);
        big.write_u16(0x0102).unwrap();
        assert_eq!(big.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_seek_back_and_overwrite() {
        let mut buffer = [0u8; 8];
        let mut ds = DataStream::new(&mut buffer[..], true);
        ds.write_u16(0).unwrap();
        ds.write_u32(7).unwrap();
        let end = ds.position();
        ds.set_position(0);
        ds.write_u16(0xBEEF).unwrap();
        ds.set_position(end);
        assert_eq!(ds.position(), 6);
        assert_eq!(ds.remaining(), 2);
        assert_eq!(&buffer[..2], &[0xEF, 0xBE]);
    }

    #[test]
    fn test_write_past_end_fails() {
        let mut buffer = [0u8; 3];
        let mut ds = DataStream::new(&mut buffer[..], true);
        assert!(ds.write_u32(1).is_err());
    }

    #[test]
    fn test_writable_space() {
        let mut buffer = [0u8; 6];
        let mut fixed = DataStream::new(&mut buffer[..], true);
        fixed.write_u32(1).unwrap();
        assert_eq!(fixed.writable(), 2);

        let mut growing = DataStream::new(Vec::new(), true);
        assert_eq!(growing.remaining(), 0);
        assert_eq!(growing.writable(), usize::MAX);
        growing.write_u32(1).unwrap();
        assert_eq!(growing.writable(), usize::MAX);
    }

    #[test]
    fn test_read_vectors() {
        let mut ds = DataStream::new(Vec::new(), false);
        ds.write_vec3d(&Vec3d::new(1.5, -2.0, 1e7)).unwrap();
        ds.write_vec3(&Vec3::new(0.25, 0.5, 0.75)).unwrap();
        let bytes = ds.into_inner();
        assert_eq!(bytes.len(), 36);

        let mut reader = DataStream::new(&bytes[..], false);
        assert_eq!(reader.read_vec3d().unwrap(), Vec3d::new(1.5, -2.0, 1e7));
        assert_eq!(reader.read_vec3().unwrap(), Vec3::new(0.25, 0.5, 0.75));
        assert_eq!(reader.remaining(), 0);
        assert!(reader.read_u8().is_err());
    }
}
