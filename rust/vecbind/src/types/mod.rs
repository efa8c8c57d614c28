//! Core type definitions shared by the adapters, the facades and the graph engine.
//!
//! - `LabelType`: caller-assigned identifier of a point
//! - `IdType`: internal slot identifier inside the graph engine
//! - `Distance`: result type of every metric
//! - `VectorElement`: scalars a dense vector may be stored in (`Float16`, `f32`, `f64`)

pub mod fp16;

pub use fp16::Float16;

use crate::buffer::Scalar;

/// External label for a point. Uniqueness is not enforced.
pub type LabelType = i64;

/// Internal element identifier.
pub type IdType = u32;

/// Sentinel value for internal IDs.
pub const INVALID_ID: IdType = IdType::MAX;

/// Every metric reports distances in single precision.
pub type Distance = f32;

/// Trait for scalars a dense vector can be encoded in.
///
/// Conversions go through `f64` so that no encoding loses precision on its way
/// to a wider one.
pub trait VectorElement: Scalar + PartialEq + Default {
    /// Convert to f64 for distance accumulation and re-encoding.
    fn to_f64(self) -> f64;

    /// Create from f64, rounding to the nearest representable value.
    fn from_f64(v: f64) -> Self;

    /// Convert to f32.
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }
}

impl VectorElement for f32 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }
}

impl VectorElement for f64 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v
    }
}
