//! Capacity growth ahead of insertion.
//!
//! Before `n` elements are added to an index holding `size` of `capacity`,
//! capacity is raised to the next power of two at or above `size + n`
//! whenever `size + n >= capacity`. Every insertion thus finds
//! `size < capacity`, and a run of single inserts reserves only a
//! logarithmic number of times.

use crate::engine::{EngineError, GraphEngine};
use crate::index::IndexError;
use tracing::debug;

/// The capacity to reserve before adding `incoming` elements, if any.
///
/// Fails if the target does not fit in `usize`.
pub fn plan_growth(size: usize, incoming: usize, capacity: usize) -> Result<Option<usize>, IndexError> {
    let overflow = || IndexError::Capacity {
        requested: usize::MAX,
        source: EngineError::Allocation { requested: usize::MAX },
    };
    let needed = size.checked_add(incoming).ok_or_else(overflow)?;
    if needed < capacity {
        return Ok(None);
    }
    let target = needed.checked_next_power_of_two().ok_or_else(overflow)?;
    Ok((target > capacity).then_some(target))
}

/// Grow `engine` so `incoming` more elements fit.
///
/// On failure the engine keeps its previous capacity. A read-only engine is
/// reported as [`IndexError::Engine`], not as a failed growth.
pub fn ensure_capacity<E: GraphEngine + ?Sized>(engine: &mut E, incoming: usize) -> Result<(), IndexError> {
    let (size, capacity) = (engine.size(), engine.capacity());
    let Some(target) = plan_growth(size, incoming, capacity)? else {
        return Ok(());
    };
    engine.reserve(target).map_err(|source| match source {
        EngineError::ReadOnly => IndexError::Engine(source),
        source => IndexError::Capacity { requested: target, source },
    })?;
    debug!(size, incoming, from = capacity, to = target, "grew index capacity");
    Ok(())
}
