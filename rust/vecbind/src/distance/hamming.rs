//! Hamming distance over packed bit-sketch words.

use super::{DistanceFunction, MetricKind};
use crate::types::Distance;

#[derive(Debug, Clone, Copy, Default)]
pub struct BitHamming;

impl DistanceFunction for BitHamming {
    type Element = u64;

    #[inline]
    fn compute(&self, a: &[u64], b: &[u64]) -> Distance {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x ^ y).count_ones())
            .sum::<u32>() as Distance
    }

    fn metric(&self) -> MetricKind {
        MetricKind::BitHamming
    }
}
