//! Jaccard distance over sorted, deduplicated `u32` sets.

use super::{DistanceFunction, MetricKind};
use crate::types::Distance;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

/// Size of the intersection of two sorted, deduplicated slices.
pub fn intersection_size(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

impl DistanceFunction for Jaccard {
    type Element = u32;

    fn compute(&self, a: &[u32], b: &[u32]) -> Distance {
        let shared = intersection_size(a, b);
        let union = a.len() + b.len() - shared;
        if union == 0 {
            return 0.0;
        }
        (1.0 - shared as f64 / union as f64) as Distance
    }

    fn metric(&self) -> MetricKind {
        MetricKind::Jaccard
    }
}
