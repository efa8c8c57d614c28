//! Jaccard similarity index over integer sets.

use super::params::IndexParams;
use super::results::Matches;
use super::{IndexError, IndexState};
use crate::buffer::BufferView;
use crate::capacity::ensure_capacity;
use crate::distance::Jaccard;
use crate::engine::{GraphEngine, Hnsw};
use crate::executor::ThreadSlot;
use crate::sets::validate_set;
use crate::types::{Distance, LabelType};
use std::path::Path;

/// Approximate nearest-neighbor index over sorted, deduplicated `u32` sets.
///
/// Calls run one at a time on a single engine slot.
pub struct SetsIndex {
    engine: Hnsw<Jaccard>,
}

impl SetsIndex {
    pub fn new(params: IndexParams) -> Result<Self, IndexError> {
        Ok(Self {
            engine: Hnsw::new(Jaccard, 0, params.engine_config(1))?,
        })
    }

    pub fn add(&mut self, label: LabelType, set: &BufferView<'_>, copy: bool) -> Result<(), IndexError> {
        let set = validate_set(set)?;
        ensure_capacity(&mut self.engine, 1)?;
        self.engine.add(label, set.as_slice(), ThreadSlot::FIRST, copy)?;
        Ok(())
    }

    /// The `k` stored sets closest to `set` by Jaccard distance.
    pub fn search(&self, set: &BufferView<'_>, k: usize) -> Result<Matches, IndexError> {
        if k == 0 {
            return Ok(Matches::default());
        }
        let set = validate_set(set)?;
        // Never more results than stored sets.
        let k = k.min(self.engine.size());
        if k == 0 {
            return Ok(Matches::default());
        }
        let mut labels: Vec<LabelType> = vec![0; k];
        let mut distances: Vec<Distance> = vec![0.0; k];
        let found = self
            .engine
            .search(set.as_slice(), k, &mut labels, Some(&mut distances[..]), ThreadSlot::FIRST)?;
        Ok(Matches::from_parts(&labels[..found], &distances[..found]))
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

    /// Sets have no fixed width; always 0.
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
