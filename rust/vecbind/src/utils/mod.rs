//! Small shared helpers for graph traversal.

pub mod heap;

pub use heap::{Candidate, MaxHeap, MinHeap};
