//! Dense-vector similarity index.

use super::params::{Accuracy, DenseParams, MetricChoice};
use super::results::BatchMatches;
use super::{IndexError, IndexState};
use crate::buffer::{BufferView, ShapeError, StridedMatrix, StridedVector};
use crate::capacity::ensure_capacity;
use crate::dispatch::{self, encode_row, DenseMatrix, DenseVector};
use crate::distance::{DenseMetric, MetricKind, UserMetric};
use crate::engine::{EngineConfig, EngineError, GraphEngine, Hnsw};
use crate::executor::{hardware_concurrency, BatchExecutor, BatchFailure, ThreadSlot};
use crate::types::{Float16, LabelType, VectorElement};
use std::path::Path;

/// One engine per storage accuracy, plus the user-metric engine.
enum DenseEngine {
    F16(Hnsw<DenseMetric<Float16>>),
    F32(Hnsw<DenseMetric<f32>>),
    F64(Hnsw<DenseMetric<f64>>),
    Custom(Hnsw<UserMetric>),
}

/// Run `$body` with `$e` bound to whichever engine is active.
macro_rules! with_engine {
    ($engine:expr, $e:ident => $body:expr) => {
        match $engine {
            DenseEngine::F16($e) => $body,
            DenseEngine::F32($e) => $body,
            DenseEngine::F64($e) => $body,
            DenseEngine::Custom($e) => $body,
        }
    };
}

fn named_engine<T: VectorElement>(
    kind: MetricKind,
    dimensions: usize,
    config: EngineConfig,
) -> Result<Hnsw<DenseMetric<T>>, IndexError> {
    let metric = DenseMetric::new(kind)
        .ok_or_else(|| IndexError::InvalidParameter(format!("{kind} is not a dense-vector metric")))?;
    Ok(Hnsw::new(metric, dimensions, config)?)
}

fn batch_error(failure: BatchFailure<EngineError>) -> IndexError {
    IndexError::Batch {
        item: failure.item,
        source: failure.error,
    }
}

fn insert_one<E, S>(engine: &E, label: LabelType, row: StridedVector<'_, S>, copy: bool) -> Result<(), IndexError>
where
    E: GraphEngine,
    E::Scalar: VectorElement,
    S: VectorElement,
{
    engine.add(label, &encode_row::<S, E::Scalar>(row), ThreadSlot::FIRST, copy)?;
    Ok(())
}

fn insert_rows<E, S>(
    engine: &E,
    labels: StridedVector<'_, LabelType>,
    rows: StridedMatrix<'_, S>,
    copy: bool,
) -> Result<(), IndexError>
where
    E: GraphEngine,
    E::Scalar: VectorElement,
    S: VectorElement,
{
    let items = labels.iter().zip((0..rows.rows()).filter_map(|i| rows.row(i)));
    BatchExecutor::new(engine.concurrency())
        .run_each(items, |slot, _, (label, row)| {
            engine.add(label, &encode_row::<S, E::Scalar>(row), slot, copy)
        })
        .map_err(batch_error)
}

fn search_rows<E, S>(engine: &E, queries: StridedMatrix<'_, S>, results: &mut BatchMatches) -> Result<(), IndexError>
where
    E: GraphEngine,
    E::Scalar: VectorElement,
    S: VectorElement,
{
    let k = results.k();
    let items = (0..queries.rows())
        .filter_map(|i| queries.row(i))
        .zip(results.rows_mut());
    BatchExecutor::new(engine.concurrency())
        .run_each(items, |slot, _, (query, (labels, distances, count))| {
            engine
                .search(&encode_row::<S, E::Scalar>(query), k, labels, Some(distances), slot)
                .map(|found| *count = found)
        })
        .map_err(batch_error)
}

/// Approximate nearest-neighbor index over fixed-width float vectors.
///
/// Input may be `f16`, `f32` or `f64` regardless of the storage accuracy;
/// rows are converted on the way in. Batches run on one thread per hardware
/// core, each with its own engine slot.
pub struct DenseIndex {
    engine: DenseEngine,
    dimensions: usize,
    accuracy: Accuracy,
    metric: MetricKind,
}

impl DenseIndex {
    pub fn new(params: DenseParams) -> Result<Self, IndexError> {
        let DenseParams {
            dimensions,
            dtype,
            metric,
            common,
        } = params;

        if dimensions == 0 {
            return Err(IndexError::InvalidParameter("dimensions must be positive".into()));
        }
        let kind = metric.kind();
        if kind == MetricKind::Haversine && dimensions != 2 {
            return Err(IndexError::InvalidParameter(format!(
                "haversine needs 2 dimensions (latitude, longitude), got {dimensions}"
            )));
        }

        let config = common.engine_config(hardware_concurrency());
        let engine = match (metric, dtype) {
            (MetricChoice::Custom(func), Accuracy::F32) => {
                DenseEngine::Custom(Hnsw::new(UserMetric::new(func), dimensions, config)?)
            }
            (MetricChoice::Custom(_), other) => {
                return Err(IndexError::InvalidParameter(format!(
                    "custom metrics need f32 storage, got {other}"
                )))
            }
            (MetricChoice::Named(kind), Accuracy::F16) => DenseEngine::F16(named_engine(kind, dimensions, config)?),
            (MetricChoice::Named(kind), Accuracy::F32) => DenseEngine::F32(named_engine(kind, dimensions, config)?),
            (MetricChoice::Named(kind), Accuracy::F64) => DenseEngine::F64(named_engine(kind, dimensions, config)?),
        };

        Ok(Self {
            engine,
            dimensions,
            accuracy: dtype,
            metric: kind,
        })
    }

    /// Add one vector under `label`.
    pub fn add(&mut self, label: LabelType, vector: &BufferView<'_>, copy: bool) -> Result<(), IndexError> {
        let vector = dispatch::dense_vector(vector, self.dimensions)?;
        with_engine!(&mut self.engine, engine => {
            ensure_capacity(engine, 1)?;
            match vector {
                DenseVector::F16(row) => insert_one(&*engine, label, row, copy),
                DenseVector::F32(row) => insert_one(&*engine, label, row, copy),
                DenseVector::F64(row) => insert_one(&*engine, label, row, copy),
            }
        })
    }

    /// Add every row of `vectors`, row `i` under `labels[i]`.
    ///
    /// `labels` must be a rank-1 `i64` buffer. A rank-1 `vectors` buffer is a
    /// batch of one. The first failing row aborts the batch.
    pub fn add_batch(&mut self, labels: &BufferView<'_>, vectors: &BufferView<'_>, copy: bool) -> Result<(), IndexError> {
        let labels = dispatch::label_vector(labels)?;
        let vectors = dispatch::dense_matrix(vectors, self.dimensions)?;
        if labels.len() != vectors.rows() {
            return Err(ShapeError::CountMismatch {
                labels: labels.len(),
                vectors: vectors.rows(),
            }
            .into());
        }
        if labels.is_empty() {
            return Ok(());
        }

        with_engine!(&mut self.engine, engine => {
            ensure_capacity(engine, labels.len())?;
            match vectors {
                DenseMatrix::F16(rows) => insert_rows(&*engine, labels, rows, copy),
                DenseMatrix::F32(rows) => insert_rows(&*engine, labels, rows, copy),
                DenseMatrix::F64(rows) => insert_rows(&*engine, labels, rows, copy),
            }
        })
    }

    /// Find the `k` nearest neighbors of each query.
    ///
    /// `queries` is a rank-2 batch or a single rank-1 vector; the result has
    /// one row per query. `k == 0` returns an empty result without looking
    /// at the input. Rows hold at most `size()` matches whatever `k` is.
    pub fn search(&self, queries: &BufferView<'_>, k: usize) -> Result<BatchMatches, IndexError> {
        if k == 0 {
            return Ok(BatchMatches::default());
        }
        let queries = dispatch::dense_matrix(queries, self.dimensions)?;
        let k = k.min(self.size());
        let mut results = BatchMatches::with_rows(queries.rows(), k)?;
        if k == 0 {
            return Ok(results);
        }
        with_engine!(&self.engine, engine => match queries {
            DenseMatrix::F16(rows) => search_rows(engine, rows, &mut results),
            DenseMatrix::F32(rows) => search_rows(engine, rows, &mut results),
            DenseMatrix::F64(rows) => search_rows(engine, rows, &mut results),
        })?;
        Ok(results)
    }

    pub fn size(&self) -> usize {
        with_engine!(&self.engine, e => e.size())
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        with_engine!(&self.engine, e => e.capacity())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn connectivity(&self) -> usize {
        with_engine!(&self.engine, e => e.connectivity())
    }

    /// Threads a batch may fan out over.
    pub fn concurrency(&self) -> usize {
        with_engine!(&self.engine, e => e.concurrency())
    }

    pub fn accuracy(&self) -> Accuracy {
        self.accuracy
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    pub fn state(&self) -> IndexState {
        with_engine!(&self.engine, e => IndexState::of(e))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        Ok(with_engine!(&self.engine, e => e.save(path.as_ref()))?)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        Ok(with_engine!(&mut self.engine, e => e.load(path.as_ref()))?)
    }

    pub fn view(&mut self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        Ok(with_engine!(&mut self.engine, e => e.view(path.as_ref()))?)
    }

    pub fn clear(&mut self) -> Result<(), IndexError> {
        Ok(with_engine!(&mut self.engine, e => e.clear())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FormatError;
    use crate::index::IndexParams;

    fn l2_index(dimensions: usize) -> DenseIndex {
        DenseIndex::new(
            DenseParams::new(dimensions)
                .with_metric(MetricKind::L2Squared)
                .with_common(IndexParams::new().with_seed(9)),
        )
        .unwrap()
    }

    #[test]
    fn test_add_and_search_single() {
        let mut index = l2_index(3);
        assert_eq!(index.state(), IndexState::Empty);
        index.add(42, &BufferView::from_slice(&[1.0f32, 2.0, 3.0]), true).unwrap();
        index.add(43, &BufferView::from_slice(&[9.0f32, 9.0, 9.0]), true).unwrap();
        assert_eq!(index.state(), IndexState::Populated);
        assert_eq!(index.len(), 2);

        let results = index.search(&BufferView::from_slice(&[1.0f32, 2.0, 3.0]), 1).unwrap();
        assert_eq!(results.rows(), 1);
        assert_eq!(results.labels(0), &[42]);
        assert_eq!(results.distances(0), &[0.0]);
    }

    #[test]
    fn test_wrong_dimensions_leave_index_untouched() {
        let mut index = l2_index(3);
        let err = index.add(1, &BufferView::from_slice(&[1.0f32, 2.0]), true).unwrap_err();
        assert!(matches!(err, IndexError::Shape(ShapeError::Dimensions { expected: 3, got: 2 })));
        assert_eq!(index.size(), 0);
        assert_eq!(index.capacity(), 0);

        assert!(matches!(
            index.search(&BufferView::from_slice(&[1.0f32; 4]), 1),
            Err(IndexError::Shape(_))
        ));
    }

    #[test]
    fn test_k_zero_skips_validation() {
        let index = l2_index(3);
        let wrong = [0u16; 5];
        let results = index.search(&BufferView::from_slice(&wrong), 0).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_k_larger_than_index() {
        let mut index = l2_index(2);
        let vectors = [0.0f32, 0.0, 5.0, 5.0];
        let matrix = BufferView::from_matrix(&vectors, 2, 2).unwrap();

        let results = index.search(&matrix, usize::MAX).unwrap();
        assert_eq!(results.rows(), 2);
        assert!(results.labels(1).is_empty());

        index.add_batch(&BufferView::from_slice(&[1i64, 2]), &matrix, true).unwrap();
        for k in [usize::MAX, usize::MAX / 2 + 1, 1_000_000_000] {
            let results = index.search(&matrix, k).unwrap();
            assert_eq!(results.k(), 2);
            assert_eq!(results.labels(0), &[1, 2]);
            assert_eq!(results.labels(1), &[2, 1]);
        }
        assert!(matches!(
            index.search(&BufferView::from_slice(&[1.0f32; 3]), usize::MAX),
            Err(IndexError::Shape(_))
        ));
    }

    #[test]
    fn test_batch_label_checks() {
        let mut index = l2_index(2);
        let vectors = [0.0f32, 0.0, 1.0, 1.0];
        let matrix = BufferView::from_matrix(&vectors, 2, 2).unwrap();

        let wrong_type = [1u64, 2];
        assert!(matches!(
            index.add_batch(&BufferView::from_slice(&wrong_type), &matrix, true),
            Err(IndexError::Format(FormatError::Labels { .. }))
        ));

        let too_few = [1i64];
        assert!(matches!(
            index.add_batch(&BufferView::from_slice(&too_few), &matrix, true),
            Err(IndexError::Shape(ShapeError::CountMismatch { labels: 1, vectors: 2 }))
        ));
        assert_eq!(index.size(), 0);

        index.add_batch(&BufferView::from_slice(&[1i64, 2]), &matrix, true).unwrap();
        assert_eq!(index.size(), 2);
    }

    #[test]
    fn test_storage_accuracy_conversion() {
        let mut index = DenseIndex::new(
            DenseParams::new(2)
                .with_dtype(Accuracy::F16)
                .with_metric(MetricKind::L2Squared),
        )
        .unwrap();
        index.add(1, &BufferView::from_slice(&[0.5f64, 0.25]), true).unwrap();
        index.add(2, &BufferView::from_slice(&[4.0f32, 4.0]), true).unwrap();

        let results = index.search(&BufferView::from_slice(&[0.5f64, 0.25]), 2).unwrap();
        assert_eq!(results.labels(0), &[1, 2]);
        assert_eq!(results.distances(0)[0], 0.0);
    }

    #[test]
    fn test_custom_metric() {
        let manhattan = MetricChoice::custom(|a, b| a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f32>());
        let mut index = DenseIndex::new(DenseParams::new(2).with_metric(manhattan)).unwrap();
        assert_eq!(index.metric(), MetricKind::Custom);
        index.add(1, &BufferView::from_slice(&[0.0f32, 0.0]), true).unwrap();
        index.add(2, &BufferView::from_slice(&[3.0f32, 4.0]), true).unwrap();

        let results = index.search(&BufferView::from_slice(&[3.0f32, 3.0]), 2).unwrap();
        assert_eq!(results.labels(0), &[2, 1]);
        assert_eq!(results.distances(0), &[1.0, 6.0]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            DenseIndex::new(DenseParams::new(0)),
            Err(IndexError::InvalidParameter(_))
        ));
        assert!(matches!(
            DenseIndex::new(DenseParams::new(3).with_metric(MetricKind::Haversine)),
            Err(IndexError::InvalidParameter(_))
        ));
        assert!(matches!(
            DenseIndex::new(DenseParams::new(3).with_metric(MetricKind::Jaccard)),
            Err(IndexError::InvalidParameter(_))
        ));
        assert!(matches!(
            DenseIndex::new(
                DenseParams::new(3)
                    .with_dtype(Accuracy::F64)
                    .with_metric(MetricChoice::custom(|_, _| 0.0))
            ),
            Err(IndexError::InvalidParameter(_))
        ));
        assert!(matches!(
            DenseIndex::new(DenseParams::new(3).with_common(IndexParams::new().with_connectivity(1))),
            Err(IndexError::Engine(EngineError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_haversine_cities() {
        let mut index = DenseIndex::new(DenseParams::new(2).with_dtype(Accuracy::F64).with_metric(MetricKind::Haversine))
            .unwrap();
        let deg = |d: f64| d.to_radians();
        index.add(1, &BufferView::from_slice(&[deg(48.86), deg(2.35)]), true).unwrap(); // Paris
        index.add(2, &BufferView::from_slice(&[deg(40.71), deg(-74.01)]), true).unwrap(); // New York
        index.add(3, &BufferView::from_slice(&[deg(51.51), deg(-0.13)]), true).unwrap(); // London

        let near_paris = index.search(&BufferView::from_slice(&[deg(49.0), deg(2.0)]), 2).unwrap();
        assert_eq!(near_paris.labels(0), &[1, 3]);
    }
}
