//! Error taxonomy surfaced by the index facades.

use crate::buffer::{FormatError, ShapeError};
use crate::engine::EngineError;
use crate::serialization::SerializationError;
use crate::sets::SetFormatError;
use thiserror::Error;

/// Everything a facade operation can fail with.
///
/// Validation errors (`Format`, `Shape`, `SetFormat`) are raised before the
/// index is touched, so a rejected call never leaves partial changes.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    SetFormat(#[from] SetFormatError),

    #[error("Failed to grow capacity to {requested}: {source}")]
    Capacity {
        requested: usize,
        #[source]
        source: EngineError,
    },

    #[error("Batch aborted at item {item}: {source}")]
    Batch {
        item: usize,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Persistence(#[from] SerializationError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type IndexResult<T> = Result<T, IndexError>;
