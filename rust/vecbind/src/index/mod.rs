//! Index facades.
//!
//! Each facade wraps one graph engine and runs caller input through the
//! matching adapter before it reaches the engine:
//!
//! - [`DenseIndex`]: float vectors through the scalar dispatch adapter
//! - [`SetsIndex`]: sorted `u32` sets through the set validator
//! - [`HashIndex`]: integer arrays through the bit-sketch hasher
//!
//! Insertions grow capacity first (see [`crate::capacity`]); batches fan out
//! over the [`crate::executor::BatchExecutor`].

mod dense;
mod error;
mod hash;
mod params;
mod results;
mod sets;

pub use dense::DenseIndex;
pub use error::{IndexError, IndexResult};
pub use hash::HashIndex;
pub use params::{Accuracy, DenseParams, HashParams, IndexParams, MetricChoice};
pub use results::{BatchMatches, Match, Matches};
pub use sets::SetsIndex;

use crate::engine::GraphEngine;

/// Lifecycle state of an index handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexState {
    /// No elements, writable.
    Empty,
    /// At least one element, writable.
    Populated,
    /// Serving a memory-mapped file; read-only.
    Viewing,
}

impl IndexState {
    pub(crate) fn of<E: GraphEngine + ?Sized>(engine: &E) -> Self {
        if engine.is_view() {
            IndexState::Viewing
        } else if engine.size() == 0 {
            IndexState::Empty
        } else {
            IndexState::Populated
        }
    }
}
