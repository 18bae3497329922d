//! Workers as threads of one process

use std::sync::{Arc, Barrier, Mutex};

use anyhow::{Result, anyhow};

use super::Communicator;

/// State shared by all communicators of a group
struct SharedSlots {
    /// Contribution of every rank to the running reduction
    slots: Mutex<Vec<Vec<f64>>>,
    barrier: Barrier
}

/// Communicator for one thread of a group of threads
///
/// Ranks publish their buffers into shared slots and sum all slots in rank
/// order, so every rank obtains bitwise identical results.
pub struct ThreadCommunicator {
    rank: usize,
    size: usize,
    shared: Arc<SharedSlots>
}

impl ThreadCommunicator {
    /// Create the communicators of a group with `size` ranks
    pub fn group(size: usize) -> Result<Vec<ThreadCommunicator>> {
        if size == 0 {
            return Err(anyhow!("Communicator group needs at least one rank"));
        }
        let shared = Arc::new(SharedSlots {
            slots: Mutex::new(vec![vec![]; size]),
            barrier: Barrier::new(size)
        });
        Ok((0..size)
            .map(|rank| ThreadCommunicator { rank, size, shared: shared.clone() })
            .collect())
    }

    fn publish(&self, values: &[f64]) -> Result<()> {
        let mut slots = self.shared.slots.lock()
            .map_err(|_| anyhow!("Reduction slots are poisoned"))?;
        slots[self.rank].clear();
        slots[self.rank].extend_from_slice(values);
        Ok(())
    }

    fn collect(&self, values: &mut [f64]) -> Result<()> {
        let slots = self.shared.slots.lock()
            .map_err(|_| anyhow!("Reduction slots are poisoned"))?;
        if let Some((rank, slot)) = slots.iter().enumerate().find(|(_, slot)| slot.len() != values.len()) {
            return Err(anyhow!("Reduction buffer of rank {} has length {} (expected {})",
                rank, slot.len(), values.len()));
        }
        values.fill(0.0);
        for slot in slots.iter() {
            for (value, contribution) in values.iter_mut().zip(slot) {
                *value += contribution;
            }
        }
        Ok(())
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_sum(&self, values: &mut [f64]) -> Result<()> {
        // Both barriers are passed even on error so the other ranks do not hang
        let published = self.publish(values);
        self.shared.barrier.wait();
        let collected = published.and_then(|_| self.collect(values));
        // Nobody may overwrite a slot before every rank has read all of them
        self.shared.barrier.wait();
        collected
    }
}

/// Runs a closure once per rank on scoped threads
pub struct ThreadGroup;

impl ThreadGroup {
    /// Run `f` on `size` threads, each with its own communicator, and
    /// return the results in rank order
    pub fn run<T, F>(size: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(ThreadCommunicator) -> T + Sync
    {
        let comms = ThreadCommunicator::group(size)?;
        let f = &f;
        crossbeam::thread::scope(|s| {
            let handles = comms.into_iter()
                .map(|comm| s.spawn(move |_| f(comm)))
                .collect::<Vec<_>>();
            handles.into_iter()
                .map(|handle| handle.join().map_err(|_| anyhow!("Worker thread panicked")))
                .collect::<Result<Vec<_>>>()
        })
        .map_err(|_| anyhow!("Worker thread panicked"))?
    }
}
