//! Metrics over dense float vectors.
//!
//! Accumulation happens in `f64` regardless of the storage accuracy.

use super::{DistanceFunction, MetricKind};
use crate::types::{Distance, VectorElement};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A caller-supplied distance over `f32` vectors.
pub type CustomMetricFn = Arc<dyn Fn(&[f32], &[f32]) -> f32 + Send + Sync>;

/// One of the built-in dense metrics, for storage type `T`.
#[derive(Debug, Clone, Copy)]
pub struct DenseMetric<T> {
    kind: MetricKind,
    _marker: PhantomData<fn() -> T>,
}

impl<T: VectorElement> DenseMetric<T> {
    /// Returns `None` for kinds that are not dense built-ins.
    pub fn new(kind: MetricKind) -> Option<Self> {
        match kind {
            MetricKind::InnerProduct
            | MetricKind::Cosine
            | MetricKind::L2Squared
            | MetricKind::Haversine => Some(Self {
                kind,
                _marker: PhantomData,
            }),
            _ => None,
        }
    }
}

impl<T: VectorElement> DistanceFunction for DenseMetric<T> {
    type Element = T;

    #[inline]
    fn compute(&self, a: &[T], b: &[T]) -> Distance {
        match self.kind {
            MetricKind::InnerProduct => inner_product(a, b),
            MetricKind::Cosine => cosine(a, b),
            MetricKind::Haversine => haversine(a, b),
            _ => l2_squared(a, b),
        }
    }

    fn metric(&self) -> MetricKind {
        self.kind
    }
}

/// Wraps a [`CustomMetricFn`]. Only `f32` storage is supported.
#[derive(Clone)]
pub struct UserMetric {
    func: CustomMetricFn,
}

impl UserMetric {
    pub fn new(func: CustomMetricFn) -> Self {
        Self { func }
    }
}

impl fmt::Debug for UserMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserMetric").finish_non_exhaustive()
    }
}

impl DistanceFunction for UserMetric {
    type Element = f32;

    #[inline]
    fn compute(&self, a: &[f32], b: &[f32]) -> Distance {
        (self.func)(a, b)
    }

    fn metric(&self) -> MetricKind {
        MetricKind::Custom
    }
}

fn inner_product<T: VectorElement>(a: &[T], b: &[T]) -> Distance {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x.to_f64() * y.to_f64()).sum();
    (1.0 - dot) as Distance
}

fn cosine<T: VectorElement>(a: &[T], b: &[T]) -> Distance {
    let (mut dot, mut aa, mut bb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x.to_f64(), y.to_f64());
        dot += x * y;
        aa += x * x;
        bb += y * y;
    }
    if aa == 0.0 && bb == 0.0 {
        return 0.0;
    }
    if aa == 0.0 || bb == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (aa.sqrt() * bb.sqrt())) as Distance
}

fn l2_squared<T: VectorElement>(a: &[T], b: &[T]) -> Distance {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x.to_f64() - y.to_f64();
            d * d
        })
        .sum::<f64>() as Distance
}

/// Expects `[latitude, longitude]` in radians; returns the central angle.
fn haversine<T: VectorElement>(a: &[T], b: &[T]) -> Distance {
    let (Some(&[lat1, lon1]), Some(&[lat2, lon2])) = (a.get(..2), b.get(..2)) else {
        return Distance::MAX;
    };
    let (lat1, lon1, lat2, lon2) = (lat1.to_f64(), lon1.to_f64(), lat2.to_f64(), lon2.to_f64());
    let half_lat = ((lat2 - lat1) / 2.0).sin();
    let half_lon = ((lon2 - lon1) / 2.0).sin();
    let h = half_lat * half_lat + lat1.cos() * lat2.cos() * half_lon * half_lon;
    (2.0 * h.clamp(0.0, 1.0).sqrt().asin()) as Distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Float16;

    fn metric<T: VectorElement>(kind: MetricKind) -> DenseMetric<T> {
        DenseMetric::new(kind).unwrap()
    }

    #[test]
    fn test_inner_product() {
        let m = metric::<f32>(MetricKind::InnerProduct);
        assert!((m.compute(&[1.0, 0.0], &[1.0, 0.0]) - 0.0).abs() < 1e-6);
        assert!((m.compute(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let m = metric::<f64>(MetricKind::Cosine);
        assert!(m.compute(&[2.0, 0.0], &[5.0, 0.0]).abs() < 1e-6);
        assert!((m.compute(&[1.0, 0.0], &[-3.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(m.compute(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(m.compute(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_l2_squared_half_precision() {
        let m = metric::<Float16>(MetricKind::L2Squared);
        let a = [Float16::from_f32(1.0), Float16::from_f32(2.0)];
        let b = [Float16::from_f32(4.0), Float16::from_f32(6.0)];
        assert!((m.compute(&a, &b) - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_haversine_quarter_circle() {
        let m = metric::<f64>(MetricKind::Haversine);
        let equator = [0.0, 0.0];
        let pole = [std::f64::consts::FRAC_PI_2, 0.0];
        let d = m.compute(&equator, &pole);
        assert!((d as f64 - std::f64::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(m.compute(&pole, &pole), 0.0);
    }

    #[test]
    fn test_non_dense_kinds_rejected() {
        assert!(DenseMetric::<f32>::new(MetricKind::Jaccard).is_none());
        assert!(DenseMetric::<f32>::new(MetricKind::Custom).is_none());
    }

    #[test]
    fn test_user_metric() {
        let m = UserMetric::new(Arc::new(|a: &[f32], b: &[f32]| {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f32>()
        }));
        assert_eq!(m.compute(&[1.0, 2.0], &[3.0, 0.0]), 4.0);
        assert_eq!(m.metric(), MetricKind::Custom);
    }
}
