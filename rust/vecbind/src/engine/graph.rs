//! Graph data for the layered proximity graph.

use super::storage::ElementStore;
use crate::buffer::Scalar;
use crate::types::{IdType, LabelType, INVALID_ID};

/// Highest level a node may be assigned.
pub const MAX_LEVEL: u8 = 16;

/// One indexed element: its label and its neighbor lists, one per level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub label: LabelType,
    links: Vec<Vec<IdType>>,
}

impl Node {
    /// A node present on levels `0..=level`, with no neighbors yet.
    pub fn new(label: LabelType, level: u8, max_links_0: usize, max_links: usize) -> Self {
        let links = (0..=level as usize)
            .map(|l| Vec::with_capacity(if l == 0 { max_links_0 } else { max_links } + 1))
            .collect();
        Self { label, links }
    }

    pub(crate) fn from_links(label: LabelType, links: Vec<Vec<IdType>>) -> Self {
        Self { label, links }
    }

    /// Top level of this node.
    #[inline]
    pub fn level(&self) -> usize {
        self.links.len().saturating_sub(1)
    }

    #[inline]
    pub fn neighbors(&self, level: usize) -> &[IdType] {
        self.links.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_neighbors(&mut self, level: usize, neighbors: &[IdType]) {
        if let Some(links) = self.links.get_mut(level) {
            links.clear();
            links.extend_from_slice(neighbors);
        }
    }

    pub fn push_neighbor(&mut self, level: usize, id: IdType) {
        if let Some(links) = self.links.get_mut(level) {
            links.push(id);
        }
    }

    pub(crate) fn levels(&self) -> impl Iterator<Item = &[IdType]> {
        self.links.iter().map(Vec::as_slice)
    }
}

/// Everything guarded by the engine's structure lock.
pub(crate) struct GraphState<S: Scalar> {
    pub nodes: Vec<Node>,
    pub store: ElementStore<S>,
    pub entry_point: IdType,
    pub max_level: usize,
    pub capacity: usize,
}

impl<S: Scalar> GraphState<S> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            store: ElementStore::new(),
            entry_point: INVALID_ID,
            max_level: 0,
            capacity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_levels() {
        let mut node = Node::new(7, 2, 32, 16);
        assert_eq!(node.level(), 2);
        assert!(node.neighbors(0).is_empty());

        node.set_neighbors(1, &[3, 4]);
        node.push_neighbor(1, 5);
        assert_eq!(node.neighbors(1), &[3, 4, 5]);

        // Levels above the node's own are ignored.
        node.push_neighbor(5, 1);
        assert!(node.neighbors(5).is_empty());
        assert_eq!(node.levels().count(), 3);
    }
}
