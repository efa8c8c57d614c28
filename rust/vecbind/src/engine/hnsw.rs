//! Layered proximity graph engine.

use super::graph::{GraphState, Node, MAX_LEVEL};
use super::persist::{decode_graph, write_graph};
use super::search::{greedy_search, search_layer, select_neighbors};
use super::storage::ElementStore;
use super::visited::VisitedSet;
use super::{EngineConfig, EngineError, GraphEngine};
use crate::buffer::Scalar;
use crate::distance::DistanceFunction;
use crate::executor::ThreadSlot;
use crate::serialization::{CountingWriter, GraphHeader, SerializationError, SerializationResult};
use crate::types::{Distance, IdType, LabelType, INVALID_ID};
use crate::utils::Candidate;
use memmap2::Mmap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// A layered proximity graph over elements compared with `D`.
///
/// Insertions serialize on the structure lock; searches share it. Each
/// thread slot owns the scratch space one call needs, so concurrent calls
/// on distinct slots never contend on anything but the graph itself.
pub struct Hnsw<D: DistanceFunction> {
    metric: D,
    dimensions: usize,
    config: EngineConfig,
    /// Multiplier for random level generation (1/ln(connectivity)).
    level_mult: f64,
    state: RwLock<GraphState<D::Element>>,
    slots: Vec<Mutex<VisitedSet>>,
    rng: Mutex<StdRng>,
}

impl<D: DistanceFunction> Hnsw<D> {
    /// Create an engine for elements of `dimensions` scalars (0 for
    /// variable-length elements).
    pub fn new(metric: D, dimensions: usize, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut engine = Self {
            metric,
            dimensions,
            level_mult: 1.0 / (config.connectivity as f64).ln(),
            state: RwLock::new(GraphState::new()),
            slots: (0..config.concurrency).map(|_| Mutex::new(VisitedSet::default())).collect(),
            rng: Mutex::new(rng),
            config,
        };
        if engine.config.capacity > 0 {
            engine.reserve(engine.config.capacity)?;
        }
        Ok(engine)
    }

    pub fn metric(&self) -> &D {
        &self.metric
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Most links a node keeps on `level`.
    #[inline]
    fn max_links(&self, level: usize) -> usize {
        if level == 0 {
            self.config.connectivity * 2
        } else {
            self.config.connectivity
        }
    }

    fn random_level(&self) -> u8 {
        // 1 - [0, 1) keeps the logarithm finite.
        let r: f64 = 1.0 - self.rng.lock().gen::<f64>();
        let level = (-r.ln() * self.level_mult).floor();
        level.min(MAX_LEVEL as f64) as u8
    }

    fn check_length(&self, element: &[D::Element]) -> Result<(), EngineError> {
        if self.dimensions != 0 && element.len() != self.dimensions {
            return Err(EngineError::ElementLength {
                expected: self.dimensions,
                got: element.len(),
            });
        }
        Ok(())
    }

    fn scratch(&self, slot: ThreadSlot) -> Result<MutexGuard<'_, VisitedSet>, EngineError> {
        let cell = self.slots.get(slot.index()).ok_or(EngineError::InvalidSlot {
            slot: slot.index(),
            concurrency: self.slots.len(),
        })?;
        Ok(cell.lock())
    }

    /// Wire a freshly appended node into the graph.
    fn link(&self, state: &mut GraphState<D::Element>, visited: &mut VisitedSet, id: IdType, level: usize) {
        let GraphState {
            nodes,
            store,
            entry_point,
            max_level,
            ..
        } = state;
        let query = store.get(id);
        let distance = |other: IdType| self.metric.compute(store.get(other), query);
        let pair_distance = |a: IdType, b: IdType| self.metric.compute(store.get(a), store.get(b));

        let mut entry = *entry_point;
        let mut entry_distance = distance(entry);
        for l in (level + 1..=*max_level).rev() {
            (entry, entry_distance) = greedy_search(entry, entry_distance, l, nodes, &distance);
        }

        let mut entry_points = vec![Candidate::new(entry, entry_distance)];
        for l in (0..=level.min(*max_level)).rev() {
            visited.reset();
            let found = search_layer(&entry_points, l, self.config.expansion_add, nodes, visited, &distance);
            let selected = select_neighbors(&found, self.max_links(l), &pair_distance);

            nodes[id as usize].set_neighbors(l, &selected);
            for &neighbor in &selected {
                self.connect(nodes, store, neighbor, id, l);
            }
            if !found.is_empty() {
                entry_points = found;
            }
        }

        if level > *max_level {
            *max_level = level;
            *entry_point = id;
        }
    }

    /// Add the back-link `from -> to`, pruning `from`'s links if they overflow.
    fn connect(&self, nodes: &mut [Node], store: &ElementStore<D::Element>, from: IdType, to: IdType, level: usize) {
        let Some(node) = nodes.get_mut(from as usize) else {
            return;
        };
        if node.neighbors(level).contains(&to) {
            return;
        }
        node.push_neighbor(level, to);

        let m = self.max_links(level);
        if node.neighbors(level).len() <= m {
            return;
        }
        let base = store.get(from);
        let candidates: Vec<Candidate> = node
            .neighbors(level)
            .iter()
            .map(|&n| Candidate::new(n, self.metric.compute(store.get(n), base)))
            .collect();
        let kept = select_neighbors(&candidates, m, |a, b| self.metric.compute(store.get(a), store.get(b)));
        node.set_neighbors(level, &kept);
    }

    fn install(&mut self, nodes: Vec<Node>, store: ElementStore<D::Element>, entry_point: IdType, max_level: usize) {
        let state = self.state.get_mut();
        state.capacity = nodes.len();
        state.nodes = nodes;
        state.store = store;
        state.entry_point = entry_point;
        state.max_level = max_level;
    }
}

impl<D: DistanceFunction> GraphEngine for Hnsw<D> {
    type Scalar = D::Element;

    fn reserve(&mut self, capacity: usize) -> Result<(), EngineError> {
        let state = self.state.get_mut();
        if state.store.is_mapped() {
            return Err(EngineError::ReadOnly);
        }
        if capacity <= state.capacity {
            return Ok(());
        }

        let failed = || EngineError::Allocation { requested: capacity };
        let additional = capacity - state.nodes.len();
        let scalars = additional.checked_mul(self.dimensions).ok_or_else(failed)?;
        state.nodes.try_reserve(additional).map_err(|_| failed())?;
        state.store.try_reserve(additional, scalars).map_err(|_| failed())?;
        state.capacity = capacity;

        debug!(capacity, "reserved graph capacity");
        Ok(())
    }

    fn size(&self) -> usize {
        self.state.read().nodes.len()
    }

    fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn connectivity(&self) -> usize {
        self.config.connectivity
    }

    fn concurrency(&self) -> usize {
        self.slots.len()
    }

    fn add(&self, label: LabelType, element: &[D::Element], slot: ThreadSlot, _copy: bool) -> Result<(), EngineError> {
        self.check_length(element)?;
        let mut visited = self.scratch(slot)?;
        let level = self.random_level();

        let mut state = self.state.write();
        if state.store.is_mapped() {
            return Err(EngineError::ReadOnly);
        }
        if state.nodes.len() >= state.capacity {
            return Err(EngineError::CapacityExceeded {
                capacity: state.capacity,
            });
        }

        let id = state.nodes.len() as IdType;
        state.store.push(element)?;
        state
            .nodes
            .push(Node::new(label, level, self.max_links(0), self.max_links(1)));
        visited.resize(state.nodes.len());

        if state.entry_point == INVALID_ID {
            state.entry_point = id;
            state.max_level = level as usize;
            return Ok(());
        }
        self.link(&mut state, &mut visited, id, level as usize);
        Ok(())
    }

    fn search(
        &self,
        query: &[D::Element],
        k: usize,
        labels: &mut [LabelType],
        distances: Option<&mut [Distance]>,
        slot: ThreadSlot,
    ) -> Result<usize, EngineError> {
        self.check_length(query)?;
        if labels.len() < k {
            return Err(EngineError::OutputTooSmall {
                needed: k,
                got: labels.len(),
            });
        }
        if let Some(out) = distances.as_deref() {
            if out.len() < k {
                return Err(EngineError::OutputTooSmall { needed: k, got: out.len() });
            }
        }
        if k == 0 {
            return Ok(0);
        }

        let mut visited = self.scratch(slot)?;
        let state = self.state.read();
        if state.entry_point == INVALID_ID {
            return Ok(0);
        }
        visited.resize(state.nodes.len());

        let distance = |id: IdType| self.metric.compute(state.store.get(id), query);
        let mut entry = state.entry_point;
        let mut entry_distance = distance(entry);
        for l in (1..=state.max_level).rev() {
            (entry, entry_distance) = greedy_search(entry, entry_distance, l, &state.nodes, &distance);
        }

        visited.reset();
        // The beam never needs to be wider than the graph.
        let ef = self.config.expansion_search.max(k).min(state.nodes.len());
        let found = search_layer(
            &[Candidate::new(entry, entry_distance)],
            0,
            ef,
            &state.nodes,
            &mut visited,
            &distance,
        );

        let count = found.len().min(k);
        for (out, candidate) in labels.iter_mut().zip(&found[..count]) {
            *out = state.nodes[candidate.id as usize].label;
        }
        if let Some(out) = distances {
            for (out, candidate) in out.iter_mut().zip(&found[..count]) {
                *out = candidate.distance;
            }
        }
        Ok(count)
    }

    fn save(&self, path: &Path) -> SerializationResult<()> {
        let state = self.state.read();
        let header = GraphHeader {
            metric: self.metric.metric(),
            scalar: D::Element::KIND,
            dimensions: self.dimensions,
            connectivity: self.config.connectivity,
            count: state.nodes.len(),
            entry_point: state.entry_point,
            max_level: state.max_level as u32,
        };
        let mut writer = CountingWriter::new(BufWriter::new(File::create(path)?));
        write_graph(&mut writer, &header, &state)?;

        info!(path = %path.display(), size = header.count, bytes = writer.written(), "saved index");
        Ok(())
    }

    fn load(&mut self, path: &Path) -> SerializationResult<()> {
        let bytes = std::fs::read(path)?;
        let graph = decode_graph::<D::Element>(&bytes, self.metric.metric(), self.dimensions)?;
        let scalars: Vec<D::Element> = bytemuck::pod_collect_to_vec(&bytes[graph.data.clone()]);

        let size = graph.nodes.len();
        self.install(
            graph.nodes,
            ElementStore::owned(scalars, graph.offsets),
            graph.entry_point,
            graph.max_level,
        );
        info!(path = %path.display(), size, "loaded index");
        Ok(())
    }

    fn view(&mut self, path: &Path) -> SerializationResult<()> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and the file is expected to stay
        // unmodified while the view is open.
        let map = unsafe { Mmap::map(&file)? };
        let graph = decode_graph::<D::Element>(&map, self.metric.metric(), self.dimensions)?;
        if bytemuck::try_cast_slice::<u8, D::Element>(&map[graph.data.clone()]).is_err() {
            return Err(SerializationError::DataCorruption(
                "scalar region is not aligned for in-place reading".into(),
            ));
        }

        let size = graph.nodes.len();
        self.install(
            graph.nodes,
            ElementStore::mapped(map, graph.data, graph.offsets),
            graph.entry_point,
            graph.max_level,
        );
        info!(path = %path.display(), size, "viewing index");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), EngineError> {
        let state = self.state.get_mut();
        if state.store.is_mapped() {
            return Err(EngineError::ReadOnly);
        }
        state.nodes.clear();
        state.store = ElementStore::new();
        state.entry_point = INVALID_ID;
        state.max_level = 0;
        Ok(())
    }

    fn is_view(&self) -> bool {
        self.state.read().store.is_mapped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{DenseMetric, Jaccard, MetricKind};
    use rand::Rng;

    fn l2_engine(dim: usize, capacity: usize) -> Hnsw<DenseMetric<f32>> {
        let config = EngineConfig::default().with_capacity(capacity).with_seed(42);
        Hnsw::new(DenseMetric::new(MetricKind::L2Squared).unwrap(), dim, config).unwrap()
    }

    fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect()).collect()
    }

    fn nearest(engine: &impl GraphEngine<Scalar = f32>, query: &[f32], k: usize) -> Vec<(LabelType, Distance)> {
        let mut labels = vec![0; k];
        let mut distances = vec![0.0; k];
        let found = engine
            .search(query, k, &mut labels, Some(&mut distances[..]), ThreadSlot::FIRST)
            .unwrap();
        labels.into_iter().zip(distances).take(found).collect()
    }

    #[test]
    fn test_add_and_find_self() {
        let vectors = random_vectors(200, 8, 1);
        let engine = l2_engine(8, 200);
        for (i, v) in vectors.iter().enumerate() {
            engine.add(i as LabelType, v, ThreadSlot::FIRST, true).unwrap();
        }
        assert_eq!(engine.size(), 200);

        for (i, v) in vectors.iter().enumerate().step_by(17) {
            let results = nearest(&engine, v, 5);
            assert_eq!(results[0].0, i as LabelType);
            assert_eq!(results[0].1, 0.0);
            assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
        }
    }

    #[test]
    fn test_search_empty_and_k_zero() {
        let engine = l2_engine(2, 4);
        assert!(nearest(&engine, &[0.0, 0.0], 3).is_empty());

        engine.add(1, &[0.0, 0.0], ThreadSlot::FIRST, true).unwrap();
        let found = engine.search(&[0.0, 0.0], 0, &mut [], None, ThreadSlot::FIRST).unwrap();
        assert_eq!(found, 0);

        // Fewer elements than k.
        assert_eq!(nearest(&engine, &[1.0, 1.0], 3), vec![(1, 2.0)]);
    }

    #[test]
    fn test_add_requires_capacity() {
        let engine = l2_engine(2, 1);
        engine.add(1, &[0.0, 0.0], ThreadSlot::FIRST, true).unwrap();
        assert_eq!(
            engine.add(2, &[1.0, 0.0], ThreadSlot::FIRST, true),
            Err(EngineError::CapacityExceeded { capacity: 1 })
        );
        assert_eq!(engine.size(), 1);
    }

    #[test]
    fn test_reserve_grows_and_never_shrinks() {
        let mut engine = l2_engine(4, 0);
        assert_eq!(engine.capacity(), 0);
        engine.reserve(16).unwrap();
        assert_eq!(engine.capacity(), 16);
        engine.reserve(4).unwrap();
        assert_eq!(engine.capacity(), 16);
    }

    #[test]
    fn test_failed_reserve_keeps_capacity() {
        let mut engine = l2_engine(4, 8);
        assert_eq!(
            engine.reserve(usize::MAX),
            Err(EngineError::Allocation { requested: usize::MAX })
        );
        assert_eq!(engine.capacity(), 8);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let engine = l2_engine(3, 4);
        assert_eq!(
            engine.add(1, &[1.0, 2.0], ThreadSlot::FIRST, true),
            Err(EngineError::ElementLength { expected: 3, got: 2 })
        );
        assert_eq!(engine.size(), 0);
    }

    #[test]
    fn test_slot_checks() {
        let engine = l2_engine(2, 4);
        assert_eq!(
            engine.add(1, &[0.0, 0.0], ThreadSlot::new(1), true),
            Err(EngineError::InvalidSlot { slot: 1, concurrency: 1 })
        );

    }

    #[test]
    fn test_busy_slot_waits() {
        let engine = l2_engine(2, 4);
        let held = engine.slots[0].lock();
        std::thread::scope(|s| {
            let writer = s.spawn(|| engine.add(1, &[0.0, 0.0], ThreadSlot::FIRST, true));
            std::thread::sleep(std::time::Duration::from_millis(20));
            assert_eq!(engine.size(), 0);
            drop(held);
            writer.join().unwrap().unwrap();
        });
        assert_eq!(engine.size(), 1);
    }

    #[test]
    fn test_k_beyond_size() {
        let engine = l2_engine(2, 4);
        for i in 0..3 {
            engine.add(i, &[i as f32, 0.0], ThreadSlot::FIRST, true).unwrap();
        }
        assert_eq!(nearest(&engine, &[0.0, 0.0], 1000).len(), 3);
    }

    #[test]
    fn test_output_buffers_checked() {
        let engine = l2_engine(2, 4);
        let mut labels = [0; 1];
        assert_eq!(
            engine.search(&[0.0, 0.0], 2, &mut labels, None, ThreadSlot::FIRST),
            Err(EngineError::OutputTooSmall { needed: 2, got: 1 })
        );
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut engine = l2_engine(2, 8);
        engine.add(1, &[0.0, 0.0], ThreadSlot::FIRST, true).unwrap();
        engine.clear().unwrap();
        assert_eq!(engine.size(), 0);
        assert_eq!(engine.capacity(), 8);
        assert!(nearest(&engine, &[0.0, 0.0], 1).is_empty());
    }

    #[test]
    fn test_variable_length_sets() {
        let engine = Hnsw::new(Jaccard, 0, EngineConfig::default().with_capacity(8)).unwrap();
        engine.add(10, &[1, 2, 3], ThreadSlot::FIRST, true).unwrap();
        engine.add(20, &[7, 8], ThreadSlot::FIRST, true).unwrap();
        engine.add(30, &[], ThreadSlot::FIRST, true).unwrap();

        let mut labels = [0; 1];
        engine.search(&[2, 3], 1, &mut labels, None, ThreadSlot::FIRST).unwrap();
        assert_eq!(labels[0], 10);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.vbnd");
        let vectors = random_vectors(50, 4, 2);

        let engine = l2_engine(4, 50);
        for (i, v) in vectors.iter().enumerate() {
            engine.add(i as LabelType * 10, v, ThreadSlot::FIRST, true).unwrap();
        }
        engine.save(&path).unwrap();

        let mut restored = l2_engine(4, 0);
        restored.load(&path).unwrap();
        assert_eq!(restored.size(), 50);
        assert!(!restored.is_view());
        assert_eq!(nearest(&restored, &vectors[7], 3), nearest(&engine, &vectors[7], 3));

        // A loaded index is writable again.
        restored.reserve(64).unwrap();
        restored.add(-1, &[0.5; 4], ThreadSlot::FIRST, true).unwrap();
        assert_eq!(restored.size(), 51);
    }

    #[test]
    fn test_view_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.vbnd");
        let engine = l2_engine(2, 4);
        engine.add(5, &[1.0, 1.0], ThreadSlot::FIRST, true).unwrap();
        engine.add(6, &[3.0, 3.0], ThreadSlot::FIRST, true).unwrap();
        engine.save(&path).unwrap();

        let mut view = l2_engine(2, 0);
        view.view(&path).unwrap();
        assert!(view.is_view());
        assert_eq!(nearest(&view, &[3.0, 3.0], 1), vec![(6, 0.0)]);

        assert_eq!(view.add(7, &[0.0, 0.0], ThreadSlot::FIRST, true), Err(EngineError::ReadOnly));
        assert_eq!(view.reserve(100), Err(EngineError::ReadOnly));
        assert_eq!(view.clear(), Err(EngineError::ReadOnly));

        // Loading replaces the mapping with an owned copy.
        view.load(&path).unwrap();
        assert!(!view.is_view());
    }

    #[test]
    fn test_load_rejects_other_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.vbnd");
        l2_engine(4, 0).save(&path).unwrap();

        let mut wider = l2_engine(8, 0);
        assert!(matches!(
            wider.load(&path),
            Err(SerializationError::Mismatch { what: "Dimensions", .. })
        ));

        let mut f64s = Hnsw::new(DenseMetric::<f64>::new(MetricKind::L2Squared).unwrap(), 4, EngineConfig::default())
            .unwrap();
        assert!(matches!(
            f64s.load(&path),
            Err(SerializationError::Mismatch { what: "Scalar type", .. })
        ));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.vbnd");
        let engine = l2_engine(4, 4);
        engine.add(1, &[1.0; 4], ThreadSlot::FIRST, true).unwrap();
        engine.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        let mut restored = l2_engine(4, 0);
        assert!(restored.load(&path).is_err());
        assert_eq!(restored.size(), 0);
    }

    #[test]
    fn test_seeded_engines_build_identical_graphs() {
        let vectors = random_vectors(64, 4, 3);
        let a = l2_engine(4, 64);
        let b = l2_engine(4, 64);
        for (i, v) in vectors.iter().enumerate() {
            a.add(i as LabelType, v, ThreadSlot::FIRST, true).unwrap();
            b.add(i as LabelType, v, ThreadSlot::FIRST, true).unwrap();
        }
        assert_eq!(a.state.read().nodes, b.state.read().nodes);
    }
}
