//! Element storage: owned vectors, or a read-only memory-mapped file.

use super::EngineError;
use crate::buffer::Scalar;
use crate::types::IdType;
use memmap2::Mmap;
use std::collections::TryReserveError;
use std::ops::Range;

/// Packed element scalars plus the offset of each element.
///
/// `offsets` always has one more entry than there are elements, so element
/// `i` spans `offsets[i]..offsets[i + 1]`. Fixed-width indices have evenly
/// spaced offsets; set indices do not.
pub(crate) enum ElementStore<S: Scalar> {
    Owned {
        scalars: Vec<S>,
        offsets: Vec<usize>,
    },
    Mapped {
        map: Mmap,
        /// Byte range of the scalar region within `map`.
        data: Range<usize>,
        offsets: Vec<usize>,
    },
}

impl<S: Scalar> ElementStore<S> {
    pub fn new() -> Self {
        ElementStore::Owned {
            scalars: Vec::new(),
            offsets: vec![0],
        }
    }

    pub fn owned(scalars: Vec<S>, offsets: Vec<usize>) -> Self {
        ElementStore::Owned { scalars, offsets }
    }

    pub fn mapped(map: Mmap, data: Range<usize>, offsets: Vec<usize>) -> Self {
        ElementStore::Mapped { map, data, offsets }
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self, ElementStore::Mapped { .. })
    }

    #[inline]
    pub fn offsets(&self) -> &[usize] {
        match self {
            ElementStore::Owned { offsets, .. } | ElementStore::Mapped { offsets, .. } => offsets,
        }
    }

    /// All element scalars, back to back.
    #[inline]
    pub fn scalars(&self) -> &[S] {
        match self {
            ElementStore::Owned { scalars, .. } => scalars,
            // Alignment and length were checked when the file was mapped.
            ElementStore::Mapped { map, data, .. } => map
                .get(data.clone())
                .and_then(|bytes| bytemuck::try_cast_slice(bytes).ok())
                .unwrap_or(&[]),
        }
    }

    /// Scalars of element `id`; empty if `id` is out of range.
    #[inline]
    pub fn get(&self, id: IdType) -> &[S] {
        let offsets = self.offsets();
        let id = id as usize;
        match (offsets.get(id), offsets.get(id + 1)) {
            (Some(&start), Some(&end)) => self.scalars().get(start..end).unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn push(&mut self, element: &[S]) -> Result<(), EngineError> {
        match self {
            ElementStore::Owned { scalars, offsets } => {
                scalars.extend_from_slice(element);
                offsets.push(scalars.len());
                Ok(())
            }
            ElementStore::Mapped { .. } => Err(EngineError::ReadOnly),
        }
    }

    /// Reserve room for `elements` more elements holding `scalars` scalars.
    pub fn try_reserve(&mut self, elements: usize, scalars: usize) -> Result<(), TryReserveError> {
        if let ElementStore::Owned {
            scalars: data,
            offsets,
        } = self
        {
            offsets.try_reserve(elements)?;
            data.try_reserve(scalars)?;
        }
        Ok(())
    }
}
