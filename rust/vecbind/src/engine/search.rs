//! Graph traversal used by both insertion and queries.
//!
//! - `greedy_search`: walk a single upper level towards the query
//! - `search_layer`: beam search on one level with a candidate list of `ef`
//! - `select_neighbors`: diversity heuristic for choosing links

use super::graph::Node;
use super::visited::VisitedSet;
use crate::types::{Distance, IdType};
use crate::utils::{Candidate, MaxHeap, MinHeap};
use std::cmp::Ordering;

/// Follow the closest neighbor on `level` until no neighbor improves.
pub(crate) fn greedy_search<F>(
    entry: IdType,
    entry_distance: Distance,
    level: usize,
    nodes: &[Node],
    distance: F,
) -> (IdType, Distance)
where
    F: Fn(IdType) -> Distance,
{
    let mut current = entry;
    let mut current_distance = entry_distance;

    loop {
        let mut changed = false;
        if let Some(node) = nodes.get(current as usize) {
            for &neighbor in node.neighbors(level) {
                let d = distance(neighbor);
                if d < current_distance {
                    current = neighbor;
                    current_distance = d;
                    changed = true;
                }
            }
        }
        if !changed {
            return (current, current_distance);
        }
    }
}

/// Find up to `ef` closest nodes on `level`, closest first.
///
/// `visited` must have been reset by the caller.
pub(crate) fn search_layer<F>(
    entry_points: &[Candidate],
    level: usize,
    ef: usize,
    nodes: &[Node],
    visited: &mut VisitedSet,
    distance: F,
) -> Vec<Candidate>
where
    F: Fn(IdType) -> Distance,
{
    let mut candidates = MinHeap::with_capacity(ef.saturating_mul(2));
    let mut results = MaxHeap::new(ef);

    for entry in entry_points {
        if !visited.visit(entry.id) {
            candidates.push(entry.id, entry.distance);
            results.try_insert(entry.id, entry.distance);
        }
    }

    while let Some(candidate) = candidates.pop() {
        if results.is_full() && results.top_distance().is_some_and(|worst| candidate.distance > worst) {
            break;
        }

        let Some(node) = nodes.get(candidate.id as usize) else {
            continue;
        };
        for &neighbor in node.neighbors(level) {
            if visited.visit(neighbor) {
                continue;
            }
            let d = distance(neighbor);
            let dominated = results.is_full() && results.top_distance().is_some_and(|worst| d >= worst);
            if !dominated {
                results.try_insert(neighbor, d);
                candidates.push(neighbor, d);
            }
        }
    }

    results.into_sorted_vec()
}

/// Pick up to `m` links out of `candidates`.
///
/// A candidate is kept only if it is closer to the base node than to every
/// link already chosen; remaining room is then filled with the closest
/// rejected candidates.
pub(crate) fn select_neighbors<F>(candidates: &[Candidate], m: usize, pair_distance: F) -> Vec<IdType>
where
    F: Fn(IdType, IdType) -> Distance,
{
    let mut working = candidates.to_vec();
    working.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));

    let mut selected: Vec<IdType> = Vec::with_capacity(m);
    let mut pruned: Vec<IdType> = Vec::new();

    for candidate in working {
        if selected.len() >= m {
            break;
        }
        let diverse = selected
            .iter()
            .all(|&chosen| pair_distance(candidate.id, chosen) >= candidate.distance);
        if diverse {
            selected.push(candidate.id);
        } else {
            pruned.push(candidate.id);
        }
    }

    for id in pruned {
        if selected.len() >= m {
            break;
        }
        selected.push(id);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on a line, each linked to its immediate neighbors on level 0.
    fn line(n: usize) -> Vec<Node> {
        (0..n)
            .map(|i| {
                let mut node = Node::new(i as i64, 0, 4, 2);
                let mut links = Vec::new();
                if i > 0 {
                    links.push(i as IdType - 1);
                }
                if i + 1 < n {
                    links.push(i as IdType + 1);
                }
                node.set_neighbors(0, &links);
                node
            })
            .collect()
    }

    #[test]
    fn test_greedy_search_walks_the_line() {
        let nodes = line(10);
        let target = 7.0f32;
        let (id, d) = greedy_search(0, target, 0, &nodes, |id| (id as f32 - target).abs());
        assert_eq!(id, 7);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_search_layer_returns_closest_sorted() {
        let nodes = line(20);
        let target = 12.0f32;
        let dist = |id: IdType| (id as f32 - target).abs();
        let mut visited = VisitedSet::new(20);
        visited.reset();

        let found = search_layer(&[Candidate::new(0, dist(0))], 0, 3, &nodes, &mut visited, dist);
        let ids: Vec<_> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids[0], 12);
        assert_eq!(ids.len(), 3);
        assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_select_neighbors_prefers_diverse_links() {
        // 1 and 2 sit next to each other; 3 is on the other side of the base.
        let position = |id: IdType| match id {
            1 => 1.0f32,
            2 => 1.1,
            _ => -2.0,
        };
        let candidates = [Candidate::new(1, 1.0), Candidate::new(2, 1.1), Candidate::new(3, 2.0)];
        let selected = select_neighbors(&candidates, 2, |a, b| (position(a) - position(b)).abs());
        assert_eq!(selected, vec![1, 3]);

        // With room to spare, pruned candidates fill the gap.
        let selected = select_neighbors(&candidates, 3, |a, b| (position(a) - position(b)).abs());
        assert_eq!(selected, vec![1, 3, 2]);
    }

    #[test]
    fn test_select_neighbors_empty() {
        assert!(select_neighbors(&[], 4, |_, _| 0.0).is_empty());
    }
}
