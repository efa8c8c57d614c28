//! Hamming similarity index over bit-sketches of integer arrays.

use super::params::HashParams;
use super::results::Matches;
use super::{IndexError, IndexState};
use crate::buffer::BufferView;
use crate::capacity::ensure_capacity;
use crate::dispatch::hashable_array;
use crate::distance::BitHamming;
use crate::engine::{GraphEngine, Hnsw};
use crate::executor::ThreadSlot;
use crate::sketch::BitSketch;
use crate::types::{Distance, LabelType};
use std::path::Path;

/// Approximate nearest-neighbor index over sketches of integer arrays.
///
/// Every array is folded into a fixed-width [`BitSketch`] and the sketches
/// are compared by Hamming distance. The sketch buffer is reused between
/// calls, so hashing, adding and searching all take `&mut self`: a handle
/// serves one caller at a time.
pub struct HashIndex {
    engine: Hnsw<BitHamming>,
    sketch: BitSketch,
}

impl HashIndex {
    pub fn new(params: HashParams) -> Result<Self, IndexError> {
        if params.bits == 0 {
            return Err(IndexError::InvalidParameter("bits must be positive".into()));
        }
        let sketch = BitSketch::new(params.bits);
        let engine = Hnsw::new(BitHamming, sketch.words(), params.common.engine_config(1))?;
        Ok(Self { engine, sketch })
    }

    /// Sketch `array` without touching the index.
    pub fn hash(&mut self, array: &BufferView<'_>) -> Result<&[u64], IndexError> {
        let array = hashable_array(array)?;
        Ok(self.sketch.hash(&array))
    }

    pub fn add(&mut self, label: LabelType, array: &BufferView<'_>, copy: bool) -> Result<(), IndexError> {
        let array = hashable_array(array)?;
        ensure_capacity(&mut self.engine, 1)?;
        let words = self.sketch.hash(&array);
        self.engine.add(label, words, ThreadSlot::FIRST, copy)?;
        Ok(())
    }

    /// The `k` stored arrays whose sketches are closest to that of `array`.
    pub fn search(&mut self, array: &BufferView<'_>, k: usize) -> Result<Matches, IndexError> {
        if k == 0 {
            return Ok(Matches::default());
        }
        let array = hashable_array(array)?;
        let words = self.sketch.hash(&array);
        let k = k.min(self.engine.size());
        if k == 0 {
            return Ok(Matches::default());
        }
        let mut labels: Vec<LabelType> = vec![0; k];
        let mut distances: Vec<Distance> = vec![0.0; k];
        let found = self
            .engine
            .search(words, k, &mut labels, Some(&mut distances[..]), ThreadSlot::FIRST)?;
        Ok(Matches::from_parts(&labels[..found], &distances[..found]))
    }

    /// Sketch width in bits, rounded up to whole words.
    pub fn bits(&self) -> usize {
        self.sketch.bits()
    }

    pub fn words(&self) -> usize {
        self.sketch.words()
    }

    pub fn size(&self) -> usize {
        self.engine.size()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        self.engine.capacity()
    }

    /// Words per sketch.
    pub fn dimensions(&self) -> usize {
        self.engine.dimensions()
    }

    pub fn connectivity(&self) -> usize {
        self.engine.connectivity()
    }

    pub fn state(&self) -> IndexState {
        IndexState::of(&self.engine)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        Ok(self.engine.save(path.as_ref())?)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        Ok(self.engine.load(path.as_ref())?)
    }

    pub fn view(&mut self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        Ok(self.engine.view(path.as_ref())?)
    }

    pub fn clear(&mut self) -> Result<(), IndexError> {
        Ok(self.engine.clear()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FormatError, ShapeError};
    use crate::index::IndexParams;

    #[test]
    fn test_width_rounding() {
        let index = HashIndex::new(HashParams::new(64)).unwrap();
        assert_eq!(index.words(), 1);
        assert_eq!(index.bits(), 64);

        let index = HashIndex::new(HashParams::new(100)).unwrap();
        assert_eq!(index.words(), 2);
        assert_eq!(index.dimensions(), 2);

        assert!(matches!(
            HashIndex::new(HashParams::new(0)),
            Err(IndexError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let mut index = HashIndex::new(HashParams::new(256)).unwrap();
        let data = [4u32, 8, 15, 16, 23, 42];
        let first = index.hash(&BufferView::from_slice(&data)).unwrap().to_vec();
        let second = index.hash(&BufferView::from_slice(&data)).unwrap().to_vec();
        assert_eq!(first, second);

        let empty = index.hash(&BufferView::from_slice::<u64>(&[])).unwrap();
        assert!(empty.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_add_and_search() {
        let mut index = HashIndex::new(HashParams::new(512).with_common(IndexParams::new().with_seed(1))).unwrap();
        index.add(1, &BufferView::from_slice(&[1u64, 2, 3, 4, 5]), true).unwrap();
        index.add(2, &BufferView::from_slice(&[100u64, 200, 300]), true).unwrap();
        index.add(3, &BufferView::from_slice(&[1u64, 2, 3, 4, 6]), true).unwrap();
        assert_eq!(index.state(), IndexState::Populated);

        let results = index.search(&BufferView::from_slice(&[1u64, 2, 3, 4, 5]), 3).unwrap();
        assert_eq!(results.best().unwrap().label, 1);
        assert_eq!(results.best().unwrap().distance, 0.0);
        assert_eq!(results.labels()[1], 3);
    }

    #[test]
    fn test_k_larger_than_index() {
        let mut index = HashIndex::new(HashParams::new(128)).unwrap();
        assert!(index.search(&BufferView::from_slice(&[1u32]), usize::MAX).unwrap().is_empty());

        index.add(1, &BufferView::from_slice(&[1u32, 2]), true).unwrap();
        index.add(2, &BufferView::from_slice(&[3u32, 4]), true).unwrap();
        let results = index.search(&BufferView::from_slice(&[1u32, 2]), usize::MAX).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.best().unwrap().label, 1);
    }

    #[test]
    fn test_rejections_leave_index_untouched() {
        let mut index = HashIndex::new(HashParams::new(64)).unwrap();
        assert!(matches!(
            index.add(1, &BufferView::from_slice(&[1.0f32]), true),
            Err(IndexError::Format(FormatError::Unsupported { .. }))
        ));
        let data = [1u32, 2, 3, 4];
        let matrix = BufferView::from_matrix(&data, 2, 2).unwrap();
        assert!(matches!(
            index.add(1, &matrix, true),
            Err(IndexError::Shape(ShapeError::Rank { expected: 1, got: 2 }))
        ));
        assert_eq!(index.size(), 0);
        assert!(index.search(&BufferView::from_slice(&[1.0f64]), 0).unwrap().is_empty());
    }
}
