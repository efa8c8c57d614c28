//! Construction parameters for the index facades.

use crate::buffer::{FormatError, ScalarKind};
use crate::distance::{CustomMetricFn, MetricKind};
use crate::engine::{EngineConfig, DEFAULT_CONNECTIVITY, DEFAULT_EXPANSION_ADD, DEFAULT_EXPANSION_SEARCH};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Scalar encoding a dense index stores its vectors in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accuracy {
    F16,
    #[default]
    F32,
    F64,
}

impl Accuracy {
    pub fn scalar_kind(self) -> ScalarKind {
        match self {
            Accuracy::F16 => ScalarKind::F16,
            Accuracy::F32 => ScalarKind::F32,
            Accuracy::F64 => ScalarKind::F64,
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.scalar_kind(), f)
    }
}

impl FromStr for Accuracy {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f16" => Ok(Accuracy::F16),
            "f32" => Ok(Accuracy::F32),
            "f64" => Ok(Accuracy::F64),
            _ => Err(FormatError::UnknownAccuracy(s.to_string())),
        }
    }
}

/// A named metric, or a caller-supplied distance over `f32` vectors.
#[derive(Clone)]
pub enum MetricChoice {
    Named(MetricKind),
    Custom(CustomMetricFn),
}

impl MetricChoice {
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&[f32], &[f32]) -> f32 + Send + Sync + 'static,
    {
        MetricChoice::Custom(Arc::new(func))
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricChoice::Named(kind) => *kind,
            MetricChoice::Custom(_) => MetricKind::Custom,
        }
    }
}

impl Default for MetricChoice {
    fn default() -> Self {
        MetricChoice::Named(MetricKind::InnerProduct)
    }
}

impl From<MetricKind> for MetricChoice {
    fn from(kind: MetricKind) -> Self {
        MetricChoice::Named(kind)
    }
}

impl fmt::Debug for MetricChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricChoice::Named(kind) => f.debug_tuple("Named").field(kind).finish(),
            MetricChoice::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Graph parameters shared by every facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexParams {
    /// Elements to reserve room for up front; 0 defers to the first add.
    pub capacity: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
    /// Seed for reproducible graph construction.
    pub seed: Option<u64>,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            capacity: 0,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            seed: None,
        }
    }
}

impl IndexParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

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

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn engine_config(&self, concurrency: usize) -> EngineConfig {
        let config = EngineConfig::default()
            .with_connectivity(self.connectivity)
            .with_expansion_add(self.expansion_add)
            .with_expansion_search(self.expansion_search)
            .with_capacity(self.capacity)
            .with_concurrency(concurrency);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

/// Parameters for [`DenseIndex`](super::DenseIndex).
#[derive(Debug, Clone)]
pub struct DenseParams {
    pub dimensions: usize,
    pub dtype: Accuracy,
    pub metric: MetricChoice,
    pub common: IndexParams,
}

impl DenseParams {
    /// Inner-product index over `f32` vectors of `dimensions` elements.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            dtype: Accuracy::default(),
            metric: MetricChoice::default(),
            common: IndexParams::default(),
        }
    }

    pub fn with_dtype(mut self, dtype: Accuracy) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_metric(mut self, metric: impl Into<MetricChoice>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn with_common(mut self, common: IndexParams) -> Self {
        self.common = common;
        self
    }
}

/// Parameters for [`HashIndex`](super::HashIndex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashParams {
    /// Sketch width; rounded up to whole 64-bit words.
    pub bits: usize,
    pub common: IndexParams,
}

impl HashParams {
    pub fn new(bits: usize) -> Self {
        Self {
            bits,
            common: IndexParams::default(),
        }
    }

    pub fn with_common(mut self, common: IndexParams) -> Self {
        self.common = common;
        self
    }
}
