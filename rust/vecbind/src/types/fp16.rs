//! Half-precision floating point (FP16/Float16) support.
//!
//! This module provides a wrapper around the `half` crate's `f16` type,
//! implementing `VectorElement` so that half-precision buffers can be indexed
//! directly and used as a storage accuracy.

use super::VectorElement;
use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Half-precision floating point number (IEEE 754-2008 binary16).
///
/// FP16 provides:
/// - 1 sign bit
/// - 5 exponent bits
/// - 10 mantissa bits
/// - Range: ~6.0e-5 to 65504
/// - Precision: ~3 decimal digits
#[derive(Copy, Clone, Default, PartialEq, PartialOrd, Pod, Zeroable)]
#[repr(transparent)]
pub struct Float16(half::f16);

impl Float16 {
    /// Zero value.
    pub const ZERO: Self = Self(half::f16::ZERO);

    /// One value.
    pub const ONE: Self = Self(half::f16::ONE);

    /// Create a new Float16 from raw bits.
    #[inline(always)]
    pub const fn from_bits(bits: u16) -> Self {
        Self(half::f16::from_bits(bits))
    }

    /// Get the raw bits of this Float16.
    #[inline(always)]
    pub const fn to_bits(self) -> u16 {
        self.0.to_bits()
    }

    /// Create a Float16 from an f32.
    #[inline(always)]
    pub fn from_f32(v: f32) -> Self {
        Self(half::f16::from_f32(v))
    }
}

impl fmt::Debug for Float16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Float16({})", self.0.to_f32())
    }
}

impl fmt::Display for Float16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_f32())
    }
}

impl From<f32> for Float16 {
    #[inline(always)]
    fn from(v: f32) -> Self {
        Self::from_f32(v)
    }
}

impl From<Float16> for f32 {
    #[inline(always)]
    fn from(v: Float16) -> Self {
        v.0.to_f32()
    }
}

impl VectorElement for Float16 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self.0.to_f64()
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        Self(half::f16::from_f64(v))
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self.0.to_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float16_roundtrip() {
        let values = [0.0f32, 1.0, -1.0, 0.5, 100.0, -100.0];
        for v in values {
            let fp16 = Float16::from_f32(v);
            let back: f32 = fp16.into();
            // FP16 has limited precision
            assert!((back - v).abs() < 0.01 * v.abs().max(1.0));
        }
    }

    #[test]
    fn test_float16_bits_are_preserved() {
        let one = Float16::ONE;
        assert_eq!(Float16::from_bits(one.to_bits()), one);
        assert_eq!(Float16::ZERO.to_f64(), 0.0);
        assert_eq!(std::mem::size_of::<Float16>(), 2);
    }
}
