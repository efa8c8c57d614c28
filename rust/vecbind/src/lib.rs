//! VecBind - caller-facing front-end for graph-based nearest neighbor search.
//!
//! The crate sits between untyped caller buffers and a typed approximate
//! nearest neighbor engine. Each caller buffer is described once by a
//! [`buffer::BufferView`] (scalar kind, shape, byte strides) and then
//! adapted to whatever the engine expects.
//!
//! # Index Types
//!
//! - **DenseIndex**: float vectors stored as `f16`, `f32` or `f64`, searched
//!   by inner product, cosine, squared L2, haversine or a user callback.
//!   Batches fan out over scoped worker threads spawned for the call, one per
//!   thread slot.
//!
//! - **SetsIndex**: sorted, deduplicated `u32` sets searched by Jaccard
//!   distance.
//!
//! - **HashIndex**: integer arrays folded into fixed-width bit-sketches and
//!   searched by Hamming distance.
//!
//! # Capacity
//!
//! Indices grow their capacity to the next power of two before every
//! insertion that would not fit, so callers never size them up front.
//!
//! # Examples
//!
//! ```rust
//! use vecbind::prelude::*;
//!
//! let params = DenseParams::new(4).with_metric(MetricKind::L2Squared);
//! let mut index = DenseIndex::new(params).unwrap();
//!
//! index.add(1, &BufferView::from_slice(&[1.0f32, 0.0, 0.0, 0.0]), true).unwrap();
//! index.add(2, &BufferView::from_slice(&[0.0f32, 1.0, 0.0, 0.0]), true).unwrap();
//!
//! let query = BufferView::from_slice(&[0.9f32, 0.1, 0.0, 0.0]);
//! let results = index.search(&query, 1).unwrap();
//! assert_eq!(results.labels(0), &[1]);
//! ```
//!
//! ## Batches
//!
//! ```rust
//! use vecbind::prelude::*;
//!
//! let mut index = DenseIndex::new(DenseParams::new(2).with_metric(MetricKind::L2Squared)).unwrap();
//! let vectors = [0.0f64, 0.0, 1.0, 1.0, 5.0, 5.0];
//! let labels = [10i64, 20, 30];
//! index
//!     .add_batch(
//!         &BufferView::from_slice(&labels),
//!         &BufferView::from_matrix(&vectors, 3, 2).unwrap(),
//!         true,
//!     )
//!     .unwrap();
//! assert_eq!(index.size(), 3);
//! assert!(index.capacity() >= 3);
//! ```

pub mod buffer;
pub mod capacity;
pub mod dispatch;
pub mod distance;
pub mod engine;
pub mod executor;
pub mod index;
pub mod serialization;
pub mod sets;
pub mod sketch;
pub mod types;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Use `use vecbind::prelude::*;` to import commonly used types.
pub mod prelude {
    // Types
    pub use crate::types::{Distance, Float16, IdType, LabelType, VectorElement, INVALID_ID};

    // Buffers
    pub use crate::buffer::{BufferView, FormatError, Scalar, ScalarKind, ShapeError};

    // Distance
    pub use crate::distance::{DistanceFunction, MetricKind};

    // Engine
    pub use crate::engine::{EngineConfig, EngineError, GraphEngine, Hnsw};
    pub use crate::executor::{BatchExecutor, ThreadSlot};

    // Facades
    pub use crate::index::{
        Accuracy, BatchMatches, DenseIndex, DenseParams, HashIndex, HashParams, IndexError,
        IndexParams, IndexResult, IndexState, Match, Matches, MetricChoice, SetsIndex,
    };

    // Adapters
    pub use crate::sets::{SetFormatError, SetView};
    pub use crate::sketch::BitSketch;

    // Serialization
    pub use crate::serialization::SerializationError;
}
