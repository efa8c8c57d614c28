//! On-disk format for graph indices.
//!
//! All integers are little-endian. A file is laid out as:
//!
//! 1. [`GraphHeader`]
//! 2. one record per node: label `i64`, level `u8`, then for each level a
//!    `u32` neighbor count followed by the neighbor ids
//! 3. `count + 1` element offsets (`u64`, in scalars)
//! 4. zero padding up to an 8-byte boundary
//! 5. the packed element scalars
//!
//! The scalar region is aligned so a memory-mapped file can be read in place.

use crate::buffer::ScalarKind;
use crate::distance::MetricKind;
use std::io::{self, Read, Write};
use thiserror::Error;

/// "VBND" read as a little-endian `u32`.
pub const MAGIC_NUMBER: u32 = u32::from_le_bytes(*b"VBND");

pub const CURRENT_VERSION: u32 = 1;

/// Alignment of the scalar region, in bytes.
pub const DATA_ALIGNMENT: usize = 8;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid magic number: expected {expected:#x}, got {got:#x}")]
    InvalidMagicNumber { expected: u32, got: u32 },

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("{what} mismatch: index has {expected}, file has {got}")]
    Mismatch {
        what: &'static str,
        expected: String,
        got: String,
    },

    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

pub type SerializationResult<T> = Result<T, SerializationError>;

fn scalar_tag(kind: ScalarKind) -> u8 {
    match kind {
        ScalarKind::F16 => 1,
        ScalarKind::F32 => 2,
        ScalarKind::F64 => 3,
        ScalarKind::U16 => 4,
        ScalarKind::U32 => 5,
        ScalarKind::U64 => 6,
        ScalarKind::I16 => 7,
        ScalarKind::I32 => 8,
        ScalarKind::I64 => 9,
    }
}

/// Fixed-size preamble of every index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphHeader {
    pub metric: MetricKind,
    pub scalar: ScalarKind,
    /// Scalars per element, or 0 for variable-length elements.
    pub dimensions: usize,
    pub connectivity: usize,
    pub count: usize,
    pub entry_point: u32,
    pub max_level: u32,
}

impl GraphHeader {
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_u32(writer, MAGIC_NUMBER)?;
        write_u32(writer, CURRENT_VERSION)?;
        write_u8(writer, self.metric.tag())?;
        write_u8(writer, scalar_tag(self.scalar))?;
        writer.write_all(&[0u8; 2])?;
        write_usize(writer, self.dimensions)?;
        write_usize(writer, self.connectivity)?;
        write_usize(writer, self.count)?;
        write_u32(writer, self.entry_point)?;
        write_u32(writer, self.max_level)
    }

    /// Read a header and check that it describes an index of the expected
    /// metric, scalar type and dimensionality.
    pub fn read_expecting<R: Read>(
        reader: &mut R,
        metric: MetricKind,
        scalar: ScalarKind,
        dimensions: usize,
    ) -> SerializationResult<Self> {
        let magic = read_u32(reader)?;
        if magic != MAGIC_NUMBER {
            return Err(SerializationError::InvalidMagicNumber {
                expected: MAGIC_NUMBER,
                got: magic,
            });
        }
        let version = read_u32(reader)?;
        if version != CURRENT_VERSION {
            return Err(SerializationError::UnsupportedVersion(version));
        }

        let metric_tag = read_u8(reader)?;
        if metric_tag != metric.tag() {
            return Err(SerializationError::Mismatch {
                what: "Metric",
                expected: metric.to_string(),
                got: format!("tag {metric_tag}"),
            });
        }
        let scalar_tag_found = read_u8(reader)?;
        if scalar_tag_found != scalar_tag(scalar) {
            return Err(SerializationError::Mismatch {
                what: "Scalar type",
                expected: scalar.to_string(),
                got: format!("tag {scalar_tag_found}"),
            });
        }
        let mut reserved = [0u8; 2];
        reader.read_exact(&mut reserved)?;

        let found_dimensions = read_usize(reader)?;
        if found_dimensions != dimensions {
            return Err(SerializationError::Mismatch {
                what: "Dimensions",
                expected: dimensions.to_string(),
                got: found_dimensions.to_string(),
            });
        }

        Ok(Self {
            metric,
            scalar,
            dimensions,
            connectivity: read_usize(reader)?,
            count: read_usize(reader)?,
            entry_point: read_u32(reader)?,
            max_level: read_u32(reader)?,
        })
    }
}

/// Tracks how many bytes have gone through a writer, for alignment padding.
pub struct CountingWriter<W> {
    inner: W,
    written: usize,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Write zeros until the position is a multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: usize) -> io::Result<()> {
        let padding = (alignment - self.written % alignment) % alignment;
        self.write_all(&vec![0u8; padding])
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// Helper functions for binary I/O

#[inline]
pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

#[inline]
pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

#[inline]
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[inline]
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
pub fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[inline]
pub fn write_i64<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
pub fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

#[inline]
pub fn write_usize<W: Write>(writer: &mut W, value: usize) -> io::Result<()> {
    write_u64(writer, value as u64)
}

#[inline]
pub fn read_usize<R: Read>(reader: &mut R) -> io::Result<usize> {
    let value = read_u64(reader)?;
    usize::try_from(value).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "value exceeds usize"))
}
