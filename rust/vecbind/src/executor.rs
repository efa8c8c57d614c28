//! Fan a batch of independent items out over a fixed number of threads.
//!
//! Item `i` always runs on thread slot `i % threads`, so each slot is owned by
//! exactly one worker for the duration of a batch. Workers are scoped to the
//! call; nothing outlives it. The first failure stops the batch: workers check
//! a shared flag before each item and bail out once it is set.

use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{trace, warn};

/// Identifies the per-thread scratch an engine call may use.
///
/// Two calls running at the same time must never share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadSlot(usize);

impl ThreadSlot {
    /// Slot used by single-item and single-threaded calls.
    pub const FIRST: ThreadSlot = ThreadSlot(0);

    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ThreadSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The first item that failed in an aborted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure<E> {
    pub item: usize,
    pub error: E,
}

/// Number of threads the hardware can run in parallel, at least 1.
pub fn hardware_concurrency() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchExecutor {
    threads: usize,
}

impl BatchExecutor {
    /// An executor using up to `threads` workers (at least one).
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `task(slot, i)` for every `i` in `0..count`.
    pub fn run<F, E>(&self, count: usize, task: F) -> Result<(), BatchFailure<E>>
    where
        F: Fn(ThreadSlot, usize) -> Result<(), E> + Sync,
        E: Send,
    {
        self.run_each(0..count, |slot, i, _| task(slot, i))
    }

    /// Run `task(slot, i, item)` for each item, `i` being its position.
    ///
    /// Batches of one item, and executors with a single thread, run inline on
    /// [`ThreadSlot::FIRST`] without spawning.
    pub fn run_each<I, It, F, E>(&self, items: It, task: F) -> Result<(), BatchFailure<E>>
    where
        It: IntoIterator<Item = I>,
        I: Send,
        F: Fn(ThreadSlot, usize, I) -> Result<(), E> + Sync,
        E: Send,
    {
        let items: Vec<I> = items.into_iter().collect();
        let count = items.len();
        let threads = self.threads.min(count);

        if threads <= 1 {
            for (i, item) in items.into_iter().enumerate() {
                task(ThreadSlot::FIRST, i, item).map_err(|error| BatchFailure { item: i, error })?;
            }
            return Ok(());
        }

        let mut buckets: Vec<Vec<(usize, I)>> = (0..threads)
            .map(|_| Vec::with_capacity(count / threads + 1))
            .collect();
        for (i, item) in items.into_iter().enumerate() {
            buckets[i % threads].push((i, item));
        }
        let buckets: Vec<Mutex<Vec<(usize, I)>>> = buckets.into_iter().map(Mutex::new).collect();

        trace!(items = count, threads, "dispatching batch");

        let aborted = AtomicBool::new(false);
        let first_failure: Mutex<Option<BatchFailure<E>>> = Mutex::new(None);

        let drain = |slot: ThreadSlot| {
            let bucket = std::mem::take(&mut *buckets[slot.index()].lock());
            for (i, item) in bucket {
                if aborted.load(Ordering::Acquire) {
                    return;
                }
                if let Err(error) = task(slot, i, item) {
                    aborted.store(true, Ordering::Release);
                    let mut failure = first_failure.lock();
                    if failure.as_ref().map_or(true, |f| i < f.item) {
                        *failure = Some(BatchFailure { item: i, error });
                    }
                    return;
                }
            }
        };

        thread::scope(|scope| {
            let mut refused = Vec::new();
            for index in 0..threads {
                let slot = ThreadSlot::new(index);
                let drain = &drain;
                let spawned = thread::Builder::new()
                    .name(format!("vecbind-batch-{index}"))
                    .spawn_scoped(scope, move || drain(slot));
                if let Err(err) = spawned {
                    warn!(slot = index, error = %err, "failed to spawn batch worker, running inline");
                    refused.push(slot);
                }
            }
            // No worker owns a refused slot, so this thread can take it over.
            for slot in refused {
                drain(slot);
            }
        });

        match first_failure.into_inner() {
            Some(failure) => {
                warn!(item = failure.item, "batch aborted");
                Err(failure)
            }
            None => Ok(()),
        }
    }
}
