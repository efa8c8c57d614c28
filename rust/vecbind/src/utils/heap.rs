//! Priority queues used by graph traversal.
//!
//! - `MaxHeap`: bounded result set, evicts the farthest candidate
//! - `MinHeap`: exploration frontier, yields the closest candidate first

use crate::types::{Distance, IdType};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A node id paired with its distance to the current query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: IdType,
    pub distance: Distance,
}

impl Candidate {
    #[inline]
    pub fn new(id: IdType, distance: Distance) -> Self {
        Self { id, distance }
    }
}

#[inline]
fn order(a: Distance, b: Distance) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Farthest-first ordering.
#[derive(Debug, Clone, Copy)]
struct Farthest(Candidate);

impl PartialEq for Farthest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Farthest {}

impl PartialOrd for Farthest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Farthest {
    fn cmp(&self, other: &Self) -> Ordering {
        order(self.0.distance, other.0.distance)
    }
}

/// Closest-first ordering.
#[derive(Debug, Clone, Copy)]
struct Closest(Candidate);

impl PartialEq for Closest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Closest {}

impl PartialOrd for Closest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Closest {
    fn cmp(&self, other: &Self) -> Ordering {
        order(other.0.distance, self.0.distance)
    }
}

/// Keeps the `capacity` closest candidates seen so far.
///
/// The farthest retained candidate sits on top, so deciding whether a new
/// candidate displaces anything is a single peek.
#[derive(Debug)]
pub struct MaxHeap {
    heap: BinaryHeap<Farthest>,
    capacity: usize,
}

impl MaxHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Distance of the farthest retained candidate.
    #[inline]
    pub fn top_distance(&self) -> Option<Distance> {
        self.heap.peek().map(|e| e.0.distance)
    }

    /// Insert if there is room or if `distance` beats the current farthest.
    /// Returns true if the candidate was kept.
    #[inline]
    pub fn try_insert(&mut self, id: IdType, distance: Distance) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push(Farthest(Candidate::new(id, distance)));
            true
        } else if let Some(mut top) = self.heap.peek_mut() {
            if distance < top.0.distance {
                *top = Farthest(Candidate::new(id, distance));
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    /// Consume into candidates sorted closest first.
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        // BinaryHeap::into_sorted_vec is ascending under Ord, which is
        // ascending distance for Farthest.
        self.heap.into_sorted_vec().into_iter().map(|e| e.0).collect()
    }
}

/// Exploration frontier, closest candidate first.
#[derive(Debug, Default)]
pub struct MinHeap {
    heap: BinaryHeap<Closest>,
}

impl MinHeap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn push(&mut self, id: IdType, distance: Distance) {
        self.heap.push(Closest(Candidate::new(id, distance)));
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|e| e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_heap_keeps_closest() {
        let mut heap = MaxHeap::new(3);
        assert!(heap.try_insert(1, 5.0));
        assert!(heap.try_insert(2, 3.0));
        assert!(heap.try_insert(3, 7.0));
        assert!(heap.is_full());
        assert_eq!(heap.top_distance(), Some(7.0));

        assert!(heap.try_insert(4, 1.0));
        assert!(!heap.try_insert(5, 10.0));
        assert_eq!(heap.len(), 3);

        let ids: Vec<_> = heap.into_sorted_vec().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 2, 1]);
    }

    #[test]
    fn test_min_heap_pops_closest() {
        let mut heap = MinHeap::with_capacity(4);
        heap.push(1, 5.0);
        heap.push(2, 3.0);
        heap.push(3, 7.0);
        heap.push(4, 1.0);

        let order: Vec<_> = std::iter::from_fn(|| heap.pop()).map(|c| c.id).collect();
        assert_eq!(order, vec![4, 2, 1, 3]);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_zero_capacity_max_heap() {
        let mut heap = MaxHeap::new(0);
        assert!(!heap.try_insert(1, 0.0));
        assert!(heap.is_empty());
    }
}
