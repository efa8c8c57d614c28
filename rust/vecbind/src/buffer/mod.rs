//! Typed views over externally-owned numeric buffers.
//!
//! A [`BufferView`] is the contract between a caller and the adapters: an
//! element format tag, a shape, byte strides and a borrowed byte slice. It is
//! validated once at construction so that every element address implied by
//! shape and strides lies inside the slice; the strided views handed out by
//! [`crate::dispatch`] rely on that.

mod strided;

pub use strided::{StridedMatrix, StridedVector};

use crate::types::Float16;
use bytemuck::Pod;
use std::fmt;
use thiserror::Error;

/// Element encodings a buffer may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    F16,
    F32,
    F64,
    U16,
    U32,
    U64,
    I16,
    I32,
    I64,
}

impl ScalarKind {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::F16 | ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::F32 | ScalarKind::U32 | ScalarKind::I32 => 4,
            ScalarKind::F64 | ScalarKind::U64 | ScalarKind::I64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::F16 => "f16",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
        }
    }

    /// Parse a buffer-protocol (struct module) format string.
    ///
    /// A leading byte-order character is accepted and ignored; `l`/`L` are
    /// treated as 32-bit and `n`/`N` as 64-bit.
    pub fn from_format_code(code: &str) -> Result<Self, FormatError> {
        let trimmed = code.trim_start_matches(['@', '=', '<', '>', '!']);
        match trimmed {
            "e" => Ok(ScalarKind::F16),
            "f" => Ok(ScalarKind::F32),
            "d" => Ok(ScalarKind::F64),
            "h" => Ok(ScalarKind::I16),
            "H" => Ok(ScalarKind::U16),
            "i" | "l" => Ok(ScalarKind::I32),
            "I" | "L" => Ok(ScalarKind::U32),
            "q" | "n" => Ok(ScalarKind::I64),
            "Q" | "N" => Ok(ScalarKind::U64),
            _ => Err(FormatError::UnknownFormatCode(code.to_string())),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Plain-old-data scalars that may back a [`BufferView`].
pub trait Scalar: Pod + fmt::Debug + Send + Sync + 'static {
    const KIND: ScalarKind;
}

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;
        })*
    };
}

impl_scalar! {
    Float16 => F16,
    f32 => F32,
    f64 => F64,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i16 => I16,
    i32 => I32,
    i64 => I64,
}

/// The declared element format is not usable by the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Incompatible scalars: got {found}, expected one of {expected}")]
    Unsupported {
        found: ScalarKind,
        expected: &'static str,
    },

    #[error("Incompatible label type: got {found}, expected i64")]
    Labels { found: ScalarKind },

    #[error("Unknown buffer format code: {0:?}")]
    UnknownFormatCode(String),

    #[error("Unknown scalar accuracy: {0:?}")]
    UnknownAccuracy(String),

    #[error("Unknown metric: {0:?}")]
    UnknownMetric(String),
}

/// Rank, dimensionality or extent does not match what the operation needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Expected a rank-{expected} buffer, got rank {got}")]
    Rank { expected: usize, got: usize },

    #[error("The number of vector dimensions doesn't match: expected {expected}, got {got}")]
    Dimensions { expected: usize, got: usize },

    #[error("Number of labels and vectors must match: {labels} labels, {vectors} vectors")]
    CountMismatch { labels: usize, vectors: usize },

    #[error("Shape has {shape} axes but {strides} strides were given")]
    StridesLength { shape: usize, strides: usize },

    #[error("Buffer extent of {required} bytes exceeds the {available} bytes provided")]
    OutOfBounds { required: usize, available: usize },
}

/// Byte extent needed to address every element of a shape/stride pair.
pub(crate) fn required_extent(
    shape: &[usize],
    strides: &[usize],
    element_size: usize,
) -> Option<usize> {
    if shape.iter().any(|&n| n == 0) {
        return Some(0);
    }
    let mut last = 0usize;
    for (&n, &stride) in shape.iter().zip(strides) {
        last = last.checked_add((n - 1).checked_mul(stride)?)?;
    }
    last.checked_add(element_size)
}

/// A typed, strided view over caller-owned memory.
///
/// The bytes are borrowed for the duration of one call; nothing in this crate
/// retains them afterwards.
#[derive(Debug, Clone)]
pub struct BufferView<'a> {
    kind: ScalarKind,
    shape: Vec<usize>,
    strides: Vec<usize>,
    bytes: &'a [u8],
}

impl<'a> BufferView<'a> {
    /// Describe raw bytes. `bytes` must start at the first element and
    /// `strides` are in bytes.
    pub fn new(
        kind: ScalarKind,
        shape: Vec<usize>,
        strides: Vec<usize>,
        bytes: &'a [u8],
    ) -> Result<Self, ShapeError> {
        if shape.len() != strides.len() {
            return Err(ShapeError::StridesLength {
                shape: shape.len(),
                strides: strides.len(),
            });
        }
        let required = required_extent(&shape, &strides, kind.size()).ok_or(
            ShapeError::OutOfBounds {
                required: usize::MAX,
                available: bytes.len(),
            },
        )?;
        if required > bytes.len() {
            return Err(ShapeError::OutOfBounds {
                required,
                available: bytes.len(),
            });
        }
        Ok(Self {
            kind,
            shape,
            strides,
            bytes,
        })
    }

    /// View a contiguous slice as a rank-1 buffer.
    pub fn from_slice<T: Scalar>(data: &'a [T]) -> Self {
        Self {
            kind: T::KIND,
            shape: vec![data.len()],
            strides: vec![std::mem::size_of::<T>()],
            bytes: bytemuck::cast_slice(data),
        }
    }

    /// View a row-major slice as a `rows x cols` matrix.
    pub fn from_matrix<T: Scalar>(data: &'a [T], rows: usize, cols: usize) -> Result<Self, ShapeError> {
        let size = std::mem::size_of::<T>();
        let expected = rows.checked_mul(cols).ok_or(ShapeError::OutOfBounds {
            required: usize::MAX,
            available: data.len() * size,
        })?;
        if expected != data.len() {
            return Err(ShapeError::OutOfBounds {
                required: expected.saturating_mul(size),
                available: data.len() * size,
            });
        }
        Ok(Self {
            kind: T::KIND,
            shape: vec![rows, cols],
            strides: vec![cols * size, size],
            bytes: bytemuck::cast_slice(data),
        })
    }

    #[inline]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Reinterpret a rank-1 view as a strided vector of `T`.
    ///
    /// The caller has already matched `T::KIND` against `self.kind()`.
    pub(crate) fn vector<T: Scalar>(&self) -> Result<StridedVector<'a, T>, ShapeError> {
        if self.rank() != 1 {
            return Err(ShapeError::Rank {
                expected: 1,
                got: self.rank(),
            });
        }
        debug_assert_eq!(T::KIND, self.kind);
        StridedVector::new(self.bytes, self.strides[0], self.shape[0])
    }

    /// Reinterpret a rank-2 view as a strided matrix of `T`.
    pub(crate) fn matrix<T: Scalar>(&self) -> Result<StridedMatrix<'a, T>, ShapeError> {
        if self.rank() != 2 {
            return Err(ShapeError::Rank {
                expected: 2,
                got: self.rank(),
            });
        }
        debug_assert_eq!(T::KIND, self.kind);
        StridedMatrix::new(
            self.bytes,
            self.shape[0],
            self.shape[1],
            self.strides[0],
            self.strides[1],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_codes() {
        assert_eq!(ScalarKind::from_format_code("e").unwrap(), ScalarKind::F16);
        assert_eq!(ScalarKind::from_format_code("<f").unwrap(), ScalarKind::F32);
        assert_eq!(ScalarKind::from_format_code("d").unwrap(), ScalarKind::F64);
        assert_eq!(ScalarKind::from_format_code("H").unwrap(), ScalarKind::U16);
        assert_eq!(ScalarKind::from_format_code("l").unwrap(), ScalarKind::I32);
        assert_eq!(ScalarKind::from_format_code("N").unwrap(), ScalarKind::U64);
        assert!(matches!(
            ScalarKind::from_format_code("Zf"),
            Err(FormatError::UnknownFormatCode(_))
        ));
    }

    #[test]
    fn test_from_slice_is_contiguous() {
        let data = [1.0f32, 2.0, 3.0];
        let view = BufferView::from_slice(&data);
        assert_eq!(view.kind(), ScalarKind::F32);
        assert_eq!(view.shape(), &[3]);
        assert_eq!(view.strides(), &[4]);
        assert_eq!(view.bytes().len(), 12);
    }

    #[test]
    fn test_from_matrix_checks_length() {
        let data = [0u16; 6];
        let view = BufferView::from_matrix(&data, 2, 3).unwrap();
        assert_eq!(view.strides(), &[6, 2]);
        assert!(BufferView::from_matrix(&data, 4, 2).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_bounds_strides() {
        let bytes = [0u8; 16];
        // 3 elements, 8 bytes apart, 4 bytes each: needs 20 bytes
        let err = BufferView::new(ScalarKind::F32, vec![3], vec![8], &bytes).unwrap_err();
        assert_eq!(
            err,
            ShapeError::OutOfBounds {
                required: 20,
                available: 16
            }
        );
        assert!(BufferView::new(ScalarKind::F32, vec![2], vec![8], &bytes).is_ok());
    }

    #[test]
    fn test_new_rejects_mismatched_strides() {
        let bytes = [0u8; 16];
        assert!(matches!(
            BufferView::new(ScalarKind::F32, vec![2, 2], vec![8], &bytes),
            Err(ShapeError::StridesLength { .. })
        ));
    }

    #[test]
    fn test_empty_shape_needs_no_bytes() {
        let view = BufferView::new(ScalarKind::U64, vec![0], vec![8], &[]).unwrap();
        assert_eq!(view.shape(), &[0]);
    }
}
