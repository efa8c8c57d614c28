//! Distance functions over stored elements.
//!
//! - dense metrics (inner product, cosine, squared L2, haversine) and
//!   user-supplied closures over `f32` vectors
//! - Jaccard distance over sorted `u32` sets
//! - Hamming distance over `u64` bit-sketch words
//!
//! Every function returns a distance: lower is more similar.

pub mod dense;
pub mod hamming;
pub mod jaccard;

pub use dense::{CustomMetricFn, DenseMetric, UserMetric};
pub use hamming::BitHamming;
pub use jaccard::Jaccard;

use crate::buffer::{FormatError, Scalar};
use crate::types::Distance;
use std::fmt;
use std::str::FromStr;

/// Identifies a distance function, both in the API and in persisted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// `1 - a·b`.
    InnerProduct,
    /// `1 - a·b / (|a| |b|)`.
    Cosine,
    /// Squared Euclidean distance.
    L2Squared,
    /// Great-circle distance between `[latitude, longitude]` pairs in radians.
    Haversine,
    /// `1 - |A ∩ B| / |A ∪ B|` over sorted sets.
    Jaccard,
    /// Number of differing bits.
    BitHamming,
    /// A caller-supplied function.
    Custom,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::InnerProduct => "ip",
            MetricKind::Cosine => "cos",
            MetricKind::L2Squared => "l2sq",
            MetricKind::Haversine => "haversine",
            MetricKind::Jaccard => "jaccard",
            MetricKind::BitHamming => "hamming",
            MetricKind::Custom => "custom",
        }
    }

    /// Tag written to persisted files.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            MetricKind::InnerProduct => 1,
            MetricKind::Cosine => 2,
            MetricKind::L2Squared => 3,
            MetricKind::Haversine => 4,
            MetricKind::Jaccard => 5,
            MetricKind::BitHamming => 6,
            MetricKind::Custom => 7,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ip" | "inner_product" | "dot" => Ok(MetricKind::InnerProduct),
            "cos" | "cosine" => Ok(MetricKind::Cosine),
            "l2sq" | "l2_sq" | "l2" => Ok(MetricKind::L2Squared),
            "haversine" => Ok(MetricKind::Haversine),
            "jaccard" => Ok(MetricKind::Jaccard),
            "hamming" | "bit_hamming" => Ok(MetricKind::BitHamming),
            _ => Err(FormatError::UnknownMetric(s.to_string())),
        }
    }
}

/// A distance function over one stored element type.
pub trait DistanceFunction: Send + Sync + 'static {
    /// The scalar the engine stores for this metric.
    type Element: Scalar;

    /// Distance between two elements. Both slices come from the same index,
    /// so fixed-width metrics may assume equal lengths.
    fn compute(&self, a: &[Self::Element], b: &[Self::Element]) -> Distance;

    fn metric(&self) -> MetricKind;
}
