//! Validation of integer sets handed to the Jaccard index.
//!
//! A set is a rank-1, unit-stride array of `u32` members in strictly
//! increasing order. Nothing is sorted or deduplicated on the caller's
//! behalf: anything else is rejected.

use crate::buffer::{BufferView, FormatError, ScalarKind, StridedVector};
use crate::index::IndexError;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetFormatError {
    #[error("Set can't be multi-dimensional: got rank {rank}")]
    MultiDimensional { rank: usize },

    #[error("Set can't be strided: stride is {stride} bytes, expected 4")]
    Strided { stride: usize },

    #[error("Set must be sorted: member {index} is smaller than the one before it")]
    Unsorted { index: usize },

    #[error("Set must be deduplicated: member {index} repeats the one before it")]
    Duplicate { index: usize },
}

/// Check ordering of set members: sortedness first, then uniqueness.
pub fn validate_members(members: &[u32]) -> Result<(), SetFormatError> {
    if let Some(i) = members.windows(2).position(|w| w[1] < w[0]) {
        return Err(SetFormatError::Unsorted { index: i + 1 });
    }
    if let Some(i) = members.windows(2).position(|w| w[1] == w[0]) {
        return Err(SetFormatError::Duplicate { index: i + 1 });
    }
    Ok(())
}

/// Members of a validated set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetView<'a>(Cow<'a, [u32]>);

impl<'a> SetView<'a> {
    /// Validate a plain slice of members.
    pub fn new(members: &'a [u32]) -> Result<Self, SetFormatError> {
        validate_members(members)?;
        Ok(Self(Cow::Borrowed(members)))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validate a caller buffer as a set.
///
/// Checks run in a fixed order: rank, member type, stride, sortedness, then
/// duplicates. Aligned buffers are borrowed; unaligned ones are copied.
pub fn validate_set<'a>(buffer: &BufferView<'a>) -> Result<SetView<'a>, IndexError> {
    if buffer.rank() != 1 {
        return Err(SetFormatError::MultiDimensional { rank: buffer.rank() }.into());
    }
    if buffer.kind() != ScalarKind::U32 {
        return Err(FormatError::Unsupported {
            found: buffer.kind(),
            expected: "u32",
        }
        .into());
    }
    let stride = buffer.strides()[0];
    if stride != ScalarKind::U32.size() {
        return Err(SetFormatError::Strided { stride }.into());
    }

    let members = StridedVector::<u32>::new(buffer.bytes(), stride, buffer.shape()[0])?.to_cow();
    validate_members(&members)?;
    Ok(SetView(members))
}
