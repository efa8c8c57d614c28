//! Scalar dispatch: turn a [`BufferView`] into exactly one strongly-typed view.
//!
//! The format tag is matched once per operation. Everything downstream of the
//! adapter is generic over the element type, so no per-element dispatch
//! happens. Bytes are only ever reinterpreted under the declared format; the
//! adapter performs no numeric casts. Re-encoding into the engine's storage
//! accuracy is a separate, explicit step ([`encode_row`]).

use crate::buffer::{BufferView, FormatError, ShapeError, StridedMatrix, StridedVector};
use crate::buffer::{Scalar, ScalarKind};
use crate::index::IndexError;
use crate::types::{Float16, LabelType, VectorElement};
use std::any::TypeId;
use std::borrow::Cow;

const DENSE_FORMATS: &str = "f16, f32, f64";
const HASHABLE_FORMATS: &str = "16, 32 or 64 bit integers";

/// A single dense vector in one of the supported float encodings.
#[derive(Debug, Clone, Copy)]
pub enum DenseVector<'a> {
    F16(StridedVector<'a, Float16>),
    F32(StridedVector<'a, f32>),
    F64(StridedVector<'a, f64>),
}

/// A batch of dense vectors, one per row.
#[derive(Debug, Clone, Copy)]
pub enum DenseMatrix<'a> {
    F16(StridedMatrix<'a, Float16>),
    F32(StridedMatrix<'a, f32>),
    F64(StridedMatrix<'a, f64>),
}

impl DenseMatrix<'_> {
    pub fn rows(&self) -> usize {
        match self {
            DenseMatrix::F16(m) => m.rows(),
            DenseMatrix::F32(m) => m.rows(),
            DenseMatrix::F64(m) => m.rows(),
        }
    }
}

/// An integer array to be folded into a bit-sketch.
///
/// Signed inputs are carried as the unsigned type of the same width; only
/// their bit patterns matter to the hasher.
#[derive(Debug, Clone, Copy)]
pub enum HashableArray<'a> {
    U16(StridedVector<'a, u16>),
    U32(StridedVector<'a, u32>),
    U64(StridedVector<'a, u64>),
}

impl HashableArray<'_> {
    pub fn len(&self) -> usize {
        match self {
            HashableArray::U16(v) => v.len(),
            HashableArray::U32(v) => v.len(),
            HashableArray::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_dimensions(expected: usize, got: usize) -> Result<(), ShapeError> {
    if expected != got {
        return Err(ShapeError::Dimensions { expected, got });
    }
    Ok(())
}

/// Adapt a rank-1 buffer into a single dense vector of `dimensions` elements.
pub fn dense_vector<'a>(
    buffer: &BufferView<'a>,
    dimensions: usize,
) -> Result<DenseVector<'a>, IndexError> {
    if buffer.rank() != 1 {
        return Err(ShapeError::Rank {
            expected: 1,
            got: buffer.rank(),
        }
        .into());
    }
    check_dimensions(dimensions, buffer.shape()[0])?;
    let vector = match buffer.kind() {
        ScalarKind::F16 => DenseVector::F16(buffer.vector()?),
        ScalarKind::F32 => DenseVector::F32(buffer.vector()?),
        ScalarKind::F64 => DenseVector::F64(buffer.vector()?),
        found => {
            return Err(FormatError::Unsupported {
                found,
                expected: DENSE_FORMATS,
            }
            .into())
        }
    };
    Ok(vector)
}

/// Adapt a rank-2 buffer into a batch of dense vectors.
///
/// A rank-1 buffer is accepted as a batch holding a single vector.
pub fn dense_matrix<'a>(
    buffer: &BufferView<'a>,
    dimensions: usize,
) -> Result<DenseMatrix<'a>, IndexError> {
    if buffer.rank() == 1 {
        let matrix = match dense_vector(buffer, dimensions)? {
            DenseVector::F16(v) => DenseMatrix::F16(StridedMatrix::from_row(v)),
            DenseVector::F32(v) => DenseMatrix::F32(StridedMatrix::from_row(v)),
            DenseVector::F64(v) => DenseMatrix::F64(StridedMatrix::from_row(v)),
        };
        return Ok(matrix);
    }
    if buffer.rank() != 2 {
        return Err(ShapeError::Rank {
            expected: 2,
            got: buffer.rank(),
        }
        .into());
    }
    check_dimensions(dimensions, buffer.shape()[1])?;
    let matrix = match buffer.kind() {
        ScalarKind::F16 => DenseMatrix::F16(buffer.matrix()?),
        ScalarKind::F32 => DenseMatrix::F32(buffer.matrix()?),
        ScalarKind::F64 => DenseMatrix::F64(buffer.matrix()?),
        found => {
            return Err(FormatError::Unsupported {
                found,
                expected: DENSE_FORMATS,
            }
            .into())
        }
    };
    Ok(matrix)
}

/// Adapt a rank-1 buffer of 64-bit signed labels.
pub fn label_vector<'a>(buffer: &BufferView<'a>) -> Result<StridedVector<'a, LabelType>, IndexError> {
    if buffer.kind() != ScalarKind::I64 {
        return Err(FormatError::Labels {
            found: buffer.kind(),
        }
        .into());
    }
    Ok(buffer.vector()?)
}

/// Adapt a rank-1 integer buffer for sketching.
pub fn hashable_array<'a>(buffer: &BufferView<'a>) -> Result<HashableArray<'a>, IndexError> {
    if buffer.rank() != 1 {
        return Err(ShapeError::Rank {
            expected: 1,
            got: buffer.rank(),
        }
        .into());
    }
    let (bytes, stride, len) = (buffer.bytes(), buffer.strides()[0], buffer.shape()[0]);
    let array = match buffer.kind() {
        ScalarKind::U16 | ScalarKind::I16 => HashableArray::U16(StridedVector::new(bytes, stride, len)?),
        ScalarKind::U32 | ScalarKind::I32 => HashableArray::U32(StridedVector::new(bytes, stride, len)?),
        ScalarKind::U64 | ScalarKind::I64 => HashableArray::U64(StridedVector::new(bytes, stride, len)?),
        found => {
            return Err(FormatError::Unsupported {
                found,
                expected: HASHABLE_FORMATS,
            }
            .into())
        }
    };
    Ok(array)
}

fn same_scalar<S: Scalar, T: Scalar>() -> bool {
    TypeId::of::<S>() == TypeId::of::<T>()
}

/// Re-encode one row into the engine's storage accuracy.
///
/// Rows already in the storage encoding and packed contiguously are borrowed
/// as-is; everything else is converted through `f64`.
pub fn encode_row<'a, S, T>(row: StridedVector<'a, S>) -> Cow<'a, [T]>
where
    S: VectorElement,
    T: VectorElement,
{
    if same_scalar::<S, T>() {
        if let Some(slice) = row.as_slice() {
            // S and T are the same type, so this cast is the identity.
            if let Ok(same) = bytemuck::try_cast_slice::<S, T>(slice) {
                return Cow::Borrowed(same);
            }
        }
    }
    Cow::Owned(row.iter().map(|v| T::from_f64(v.to_f64())).collect())
}
