//! Fixed-size worker pool that preserves input order.
//!
//! Work items are indices sent through a bounded channel; each result comes
//! back tagged with its index and lands in that slot, so completion order
//! never leaks into the output.

use crossbeam_channel::{bounded, unbounded};
use std::num::NonZeroUsize;
use std::thread;
use tracing::trace;

/// Pool of scoped OS threads
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` threads (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// One worker per available CPU
    pub fn with_default_size() -> Self {
        Self::new(default_workers())
    }

    pub fn size(&self) -> usize {
        self.workers
    }

    /// Apply `task` to every item and return the results in input order.
    ///
    /// Once `stop` returns true no further item is started; items already
    /// running finish, and every item that never ran keeps a `None` slot.
    pub fn map<T, R, S, F>(&self, items: &[T], stop: S, task: F) -> Vec<Option<R>>
    where
        T: Sync,
        R: Send,
        S: Fn() -> bool + Sync,
        F: Fn(usize, &T) -> R + Sync,
    {
        let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
        if items.is_empty() {
            return slots;
        }

        let threads = self.workers.min(items.len());
        let (job_tx, job_rx) = bounded::<usize>(threads * 2);
        let (done_tx, done_rx) = unbounded::<(usize, R)>();

        thread::scope(|scope| {
            for worker in 0..threads {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let (stop, task) = (&stop, &task);

                scope.spawn(move || {
                    for index in job_rx.iter() {
                        // Queued but not started: leave the slot empty
                        if stop() {
                            continue;
                        }
                        trace!("worker {} took item {}", worker, index);
                        if done_tx.send((index, task(index, &items[index]))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(done_tx);

            // The bounded queue keeps the feeder at most a few items ahead
            for index in 0..items.len() {
                if stop() || job_tx.send(index).is_err() {
                    break;
                }
            }
            drop(job_tx);

            for (index, result) in done_rx.iter() {
                slots[index] = Some(result);
            }
        });

        slots
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_default_size()
    }
}

/// Number of CPUs available to this process, or 1 when unknown
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Apply `task` to every item on the calling thread, in order, with the
/// same stop semantics as [`WorkerPool::map`]
pub fn map_sequential<T, R, S, F>(items: &[T], stop: S, task: F) -> Vec<Option<R>>
where
    S: Fn() -> bool,
    F: Fn(usize, &T) -> R,
{
    let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();

    for (index, item) in items.iter().enumerate() {
        if stop() {
            break;
        }
        slots[index] = Some(task(index, item));
    }

    slots
}
