//! Visited-node tracking for graph traversal.

use crate::types::IdType;

/// Tag-based visited set.
///
/// Instead of clearing between traversals, the current tag is bumped; a node
/// counts as visited when its stored tag equals the current one. Each thread
/// slot owns one of these, so no atomics are needed.
#[derive(Debug, Default)]
pub struct VisitedSet {
    tags: Vec<u32>,
    current: u32,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            tags: vec![0; capacity],
            current: 1,
        }
    }

    /// Start a new traversal. O(1) except on tag wrap-around.
    #[inline]
    pub fn reset(&mut self) {
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            self.tags.iter_mut().for_each(|t| *t = 0);
            self.current = 1;
        }
    }

    /// Mark `id` as visited. Returns true if it already was.
    #[inline]
    pub fn visit(&mut self, id: IdType) -> bool {
        match self.tags.get_mut(id as usize) {
            Some(tag) => std::mem::replace(tag, self.current) == self.current,
            None => false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.tags.len()
    }

    /// Grow to track at least `capacity` nodes.
    pub fn resize(&mut self, capacity: usize) {
        if capacity > self.tags.len() {
            self.tags.resize(capacity, 0);
        }
    }
}
