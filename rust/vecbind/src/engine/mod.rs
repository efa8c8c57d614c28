//! The approximate nearest-neighbor engine behind every index facade.
//!
//! [`GraphEngine`] is the narrow contract the facades program against;
//! [`Hnsw`] is the layered proximity graph implementing it for any
//! [`DistanceFunction`](crate::distance::DistanceFunction).
//!
//! Key parameters:
//! - `connectivity`: links per node on upper levels (twice that on level 0)
//! - `expansion_add`: candidate list size while inserting
//! - `expansion_search`: candidate list size while querying

pub mod graph;
mod hnsw;
mod persist;
pub mod search;
mod storage;
pub mod visited;

pub use hnsw::Hnsw;

use crate::buffer::Scalar;
use crate::executor::ThreadSlot;
use crate::serialization::SerializationResult;
use crate::types::{Distance, LabelType};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONNECTIVITY: usize = 16;
pub const DEFAULT_EXPANSION_ADD: usize = 128;
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Index is full: capacity {capacity}")]
    CapacityExceeded { capacity: usize },

    #[error("Failed to allocate room for {requested} elements")]
    Allocation { requested: usize },

    #[error("Thread slot {slot} is out of range for concurrency {concurrency}")]
    InvalidSlot { slot: usize, concurrency: usize },

    #[error("Element has {got} scalars, expected {expected}")]
    ElementLength { expected: usize, got: usize },

    #[error("Output buffer holds {got} entries, {needed} required")]
    OutputTooSmall { needed: usize, got: usize },

    #[error("Index is a read-only view of a file")]
    ReadOnly,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Construction parameters for a graph engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
    /// Elements to reserve room for up front.
    pub capacity: usize,
    /// Number of thread slots, i.e. concurrent calls the engine accepts.
    pub concurrency: usize,
    /// Seed for level assignment; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            capacity: 0,
            concurrency: 1,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_connectivity(mut self, connectivity: usize) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_expansion_add(mut self, expansion: usize) -> Self {
        self.expansion_add = expansion;
        self
    }

    pub fn with_expansion_search(mut self, expansion: usize) -> Self {
        self.expansion_search = expansion;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Make level assignment, and so the graph shape, reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.connectivity < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "connectivity must be at least 2, got {}",
                self.connectivity
            )));
        }
        if self.expansion_add == 0 || self.expansion_search == 0 {
            return Err(EngineError::InvalidConfig("expansion factors must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(EngineError::InvalidConfig("concurrency must be positive".into()));
        }
        Ok(())
    }
}

/// What an index facade needs from the engine.
///
/// Structural changes (`reserve`, `clear`, `load`, `view`) take `&mut self`.
/// `add` and `search` take `&self` and may run concurrently. Each call names
/// a [`ThreadSlot`] below [`concurrency`](GraphEngine::concurrency); calls
/// on the same slot wait for one another.
pub trait GraphEngine: Send + Sync {
    type Scalar: Scalar;

    /// Grow to hold at least `capacity` elements. Never shrinks.
    fn reserve(&mut self, capacity: usize) -> Result<(), EngineError>;

    fn size(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Scalars per element, or 0 for variable-length elements.
    fn dimensions(&self) -> usize;

    fn connectivity(&self) -> usize;

    fn concurrency(&self) -> usize;

    /// Insert one element. The engine always keeps its own copy of
    /// `element`, so `copy` only records the caller's intent.
    fn add(
        &self,
        label: LabelType,
        element: &[Self::Scalar],
        slot: ThreadSlot,
        copy: bool,
    ) -> Result<(), EngineError>;

    /// Write up to `k` nearest labels (and optionally distances), closest
    /// first, and return how many were found.
    fn search(
        &self,
        query: &[Self::Scalar],
        k: usize,
        labels: &mut [LabelType],
        distances: Option<&mut [Distance]>,
        slot: ThreadSlot,
    ) -> Result<usize, EngineError>;

    fn save(&self, path: &Path) -> SerializationResult<()>;

    /// Replace the contents with a copy of a saved index.
    fn load(&mut self, path: &Path) -> SerializationResult<()>;

    /// Serve a saved index straight from the file, read-only.
    fn view(&mut self, path: &Path) -> SerializationResult<()>;

    /// Drop all elements; keeps the reserved capacity.
    fn clear(&mut self) -> Result<(), EngineError>;

    fn is_view(&self) -> bool;
}
