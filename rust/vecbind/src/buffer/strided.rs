//! Bounds-checked strided views.
//!
//! Both views are constructed once, validated against the backing slice, and
//! then read without further checks beyond slice indexing. Reads go through
//! `bytemuck::pod_read_unaligned`, so strides need not be multiples of the
//! element alignment.

use super::{required_extent, Scalar, ShapeError};
use std::borrow::Cow;
use std::marker::PhantomData;

/// A one-dimensional strided view of `len` elements of `T`.
#[derive(Debug, Clone, Copy)]
pub struct StridedVector<'a, T: Scalar> {
    bytes: &'a [u8],
    stride: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Scalar> StridedVector<'a, T> {
    /// Create a view; `bytes` starts at element 0 and `stride` is in bytes.
    pub fn new(bytes: &'a [u8], stride: usize, len: usize) -> Result<Self, ShapeError> {
        let required = required_extent(&[len], &[stride], std::mem::size_of::<T>()).ok_or(
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
        Ok(Self::from_validated(bytes, stride, len))
    }

    #[inline]
    fn from_validated(bytes: &'a [u8], stride: usize, len: usize) -> Self {
        Self {
            bytes,
            stride,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Read element `i`, or `None` past the end.
    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        if i >= self.len {
            return None;
        }
        let start = i * self.stride;
        let end = start + std::mem::size_of::<T>();
        Some(bytemuck::pod_read_unaligned(&self.bytes[start..end]))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + 'a {
        let view = *self;
        (0..view.len).map(move |i| {
            let start = i * view.stride;
            bytemuck::pod_read_unaligned(&view.bytes[start..start + std::mem::size_of::<T>()])
        })
    }

    /// Whether elements are packed back to back.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.len <= 1 || self.stride == std::mem::size_of::<T>()
    }

    /// Borrow the elements as a slice when they are packed and aligned.
    pub fn as_slice(&self) -> Option<&'a [T]> {
        if !self.is_contiguous() {
            return None;
        }
        let bytes = &self.bytes[..self.len * std::mem::size_of::<T>()];
        bytemuck::try_cast_slice(bytes).ok()
    }

    /// Borrow when possible, gather into an owned vector otherwise.
    pub fn to_cow(&self) -> Cow<'a, [T]> {
        match self.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(self.iter().collect()),
        }
    }
}

/// A two-dimensional strided view: `rows` vectors of `cols` elements.
#[derive(Debug, Clone, Copy)]
pub struct StridedMatrix<'a, T: Scalar> {
    bytes: &'a [u8],
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Scalar> StridedMatrix<'a, T> {
    pub fn new(
        bytes: &'a [u8],
        rows: usize,
        cols: usize,
        row_stride: usize,
        col_stride: usize,
    ) -> Result<Self, ShapeError> {
        let required = required_extent(
            &[rows, cols],
            &[row_stride, col_stride],
            std::mem::size_of::<T>(),
        )
        .ok_or(ShapeError::OutOfBounds {
            required: usize::MAX,
            available: bytes.len(),
        })?;
        if required > bytes.len() {
            return Err(ShapeError::OutOfBounds {
                required,
                available: bytes.len(),
            });
        }
        Ok(Self {
            bytes,
            rows,
            cols,
            row_stride,
            col_stride,
            _marker: PhantomData,
        })
    }

    /// Treat a single vector as a one-row matrix.
    pub fn from_row(row: StridedVector<'a, T>) -> Self {
        Self {
            bytes: row.bytes,
            rows: 1,
            cols: row.len,
            row_stride: 0,
            col_stride: row.stride,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// View of row `i`, or `None` past the last row.
    #[inline]
    pub fn row(&self, i: usize) -> Option<StridedVector<'a, T>> {
        if i >= self.rows {
            return None;
        }
        if self.cols == 0 {
            return Some(StridedVector::from_validated(&[], self.col_stride, 0));
        }
        let start = i * self.row_stride;
        Some(StridedVector::from_validated(
            &self.bytes[start..],
            self.col_stride,
            self.cols,
        ))
    }
}
