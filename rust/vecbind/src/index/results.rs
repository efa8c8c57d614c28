//! Search result types.

use super::IndexError;
use crate::types::{Distance, LabelType};

/// One neighbor: its label and distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub label: LabelType,
    pub distance: Distance,
}

impl Match {
    #[inline]
    pub fn new(label: LabelType, distance: Distance) -> Self {
        Self { label, distance }
    }
}

/// Neighbors of a single query, closest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matches {
    results: Vec<Match>,
}

impl Matches {
    pub(crate) fn from_parts(labels: &[LabelType], distances: &[Distance]) -> Self {
        Self {
            results: labels
                .iter()
                .zip(distances)
                .map(|(&label, &distance)| Match::new(label, distance))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The closest match, if any.
    pub fn best(&self) -> Option<Match> {
        self.results.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.results.iter()
    }

    pub fn labels(&self) -> Vec<LabelType> {
        self.results.iter().map(|m| m.label).collect()
    }

    pub fn into_vec(self) -> Vec<Match> {
        self.results
    }
}

impl IntoIterator for Matches {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Neighbors for a batch of queries.
///
/// Row `i` answers query `i`. Each row has room for `k` matches, of which
/// the first `counts()[i]` are filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMatches {
    k: usize,
    labels: Vec<LabelType>,
    distances: Vec<Distance>,
    counts: Vec<usize>,
}

/// Output slots of one row: labels, distances, count.
pub(crate) type RowOutput<'a> = (&'a mut [LabelType], &'a mut [Distance], &'a mut usize);

impl BatchMatches {
    pub(crate) fn with_rows(rows: usize, k: usize) -> Result<Self, IndexError> {
        let slots = rows.checked_mul(k).ok_or_else(|| {
            IndexError::InvalidParameter(format!("{rows} queries with k = {k} overflow the result buffer"))
        })?;
        Ok(Self {
            k,
            labels: vec![0; slots],
            distances: vec![Distance::MAX; slots],
            counts: vec![0; rows],
        })
    }

    /// Mutable views of every row, in order. `k` must be positive.
    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = RowOutput<'_>> {
        let k = self.k.max(1);
        self.labels
            .chunks_mut(k)
            .zip(self.distances.chunks_mut(k))
            .zip(self.counts.iter_mut())
            .map(|((labels, distances), count)| (labels, distances, count))
    }

    /// Number of queries answered.
    pub fn rows(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Room per row: the requested `k`, capped at the index size.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Matches found per query.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Found labels of row `row`, closest first.
    pub fn labels(&self, row: usize) -> &[LabelType] {
        let count = self.counts.get(row).copied().unwrap_or(0);
        let start = row.saturating_mul(self.k);
        self.labels.get(start..start.saturating_add(count)).unwrap_or(&[])
    }

    /// Found distances of row `row`, closest first.
    pub fn distances(&self, row: usize) -> &[Distance] {
        let count = self.counts.get(row).copied().unwrap_or(0);
        let start = row.saturating_mul(self.k);
        self.distances.get(start..start.saturating_add(count)).unwrap_or(&[])
    }

    pub fn row(&self, row: usize) -> Option<Matches> {
        (row < self.rows()).then(|| Matches::from_parts(self.labels(row), self.distances(row)))
    }
}
