use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use crossbeam_utils::sync::WaitGroup;
use gridspace_common::CellId;
use parking_lot::{Mutex, RwLock};

use crate::node::Handle;

/// Immutable copy of a partition's entity list, published after every mutation.
pub type Snapshot<T> = Arc<[Handle<T>]>;

/// Work items processed by a partition's worker, one at a time in arrival order.
///
/// `done` tokens are dropped once the change is published, which releases the
/// caller. Transfer halves instead wait on a barrier shared with the other
/// partition, so neither worker moves on until both halves are visible.
enum Job<T> {
    Add { node: Handle<T>, done: WaitGroup },
    Remove { node: Handle<T>, done: WaitGroup },
    TransferOut { node: Handle<T>, barrier: WaitGroup },
    TransferIn { node: Handle<T>, barrier: WaitGroup },
}

/// Actor owning every entity filed under one cell.
///
/// All mutations go through the worker thread's inbox. Reads never touch the
/// inbox: [`Partition::read`] returns the last published [`Snapshot`].
///
/// Outside the crate a partition is read-only; entities only enter or leave
/// one through [`SpatialIndex`](crate::SpatialIndex), which keeps each entity
/// in exactly one partition.
///
/// ```compile_fail
/// use glam::DVec3;
/// use gridspace_index::SpatialIndex;
///
/// let index = SpatialIndex::<()>::with_tile_size(10.0).unwrap();
/// let held = index.create((), DVec3::ZERO);
/// let other = index.create((), DVec3::new(50.0, 0.0, 0.0));
/// index.partition(other.cell()).unwrap().add(held.clone());
/// ```
pub struct Partition<T> {
    cell: CellId,
    inbox: Sender<Job<T>>,
    snapshot: Arc<RwLock<Snapshot<T>>>,
    /// Held while enqueueing a transfer half, always in [`Partition::lock_key`] order.
    gate: Mutex<()>,
}

impl<T: Send + Sync + 'static> Partition<T> {
    /// Start the worker for `cell`.
    ///
    /// # Panics
    /// Panics if the OS refuses to spawn the worker thread.
    pub(crate) fn spawn(cell: CellId, capacity: usize) -> Self {
        let (inbox, jobs) = crossbeam_channel::unbounded();
        let snapshot = Arc::new(RwLock::new(Snapshot::<T>::from(Vec::new())));

        let worker = Worker {
            cell,
            entries: Vec::with_capacity(capacity),
            snapshot: Arc::clone(&snapshot),
        };
        std::thread::Builder::new()
            .name(format!("partition{cell}"))
            .spawn(move || worker.run(jobs))
            .unwrap_or_else(|err| panic!("failed to spawn worker for partition {cell}: {err}"));

        tracing::debug!(%cell, "partition spawned");

        Self {
            cell,
            inbox,
            snapshot,
            gate: Mutex::new(()),
        }
    }

    /// Insert an entity. Returns once the new snapshot is published.
    pub(crate) fn add(&self, node: Handle<T>) {
        let done = WaitGroup::new();
        self.send(Job::Add {
            node,
            done: done.clone(),
        });
        done.wait();
    }

    /// Remove an entity. Returns once the new snapshot is published.
    ///
    /// Removing an entity this partition does not hold is a no-op.
    pub(crate) fn remove(&self, node: &Handle<T>) {
        let done = WaitGroup::new();
        self.send(Job::Remove {
            node: node.clone(),
            done: done.clone(),
        });
        done.wait();
    }

    /// Move an entity from this partition into `dest`.
    ///
    /// The two halves run as separate jobs on each worker and meet at a
    /// shared barrier. Returns after both partitions have published.
    /// Transferring into the same partition does nothing.
    pub(crate) fn transfer(&self, node: &Handle<T>, dest: &Self) {
        if std::ptr::eq(self, dest) {
            return;
        }

        let barrier = WaitGroup::new();
        {
            // Enqueue both halves as one step relative to any other transfer
            // touching either partition, so every inbox sees transfers in the
            // same relative order.
            let (first, second) = if self.lock_key() < dest.lock_key() {
                (self, dest)
            } else {
                (dest, self)
            };
            let _first = first.gate.lock();
            let _second = second.gate.lock();

            self.send(Job::TransferOut {
                node: node.clone(),
                barrier: barrier.clone(),
            });
            dest.send(Job::TransferIn {
                node: node.clone(),
                barrier: barrier.clone(),
            });
        }

        tracing::trace!(from = %self.cell, to = %dest.cell, "transfer enqueued");
        barrier.wait();
    }
}

impl<T> Partition<T> {
    /// Cell this partition is responsible for.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// Latest published snapshot. Never waits for queued mutations.
    pub fn read(&self) -> Snapshot<T> {
        Arc::clone(&self.snapshot.read())
    }

    /// Number of entities in the latest snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Whether the latest snapshot holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_key(&self) -> (CellId, usize) {
        (self.cell, std::ptr::from_ref(self) as usize)
    }

    fn send(&self, job: Job<T>) {
        // Only fails if the worker panicked. The job, and with it the
        // caller's wait token, is dropped so nobody blocks forever.
        if self.inbox.send(job).is_err() {
            tracing::error!(cell = %self.cell, "partition worker is gone, dropping job");
        }
    }
}

struct Worker<T> {
    cell: CellId,
    entries: Vec<Handle<T>>,
    snapshot: Arc<RwLock<Snapshot<T>>>,
}

impl<T> Worker<T> {
    fn run(mut self, jobs: Receiver<Job<T>>) {
        // Ends once the owning `Partition` (the only sender) is dropped.
        for job in jobs {
            match job {
                Job::Add { node, done } => {
                    self.entries.push(node);
                    self.publish();
                    drop(done);
                }
                Job::Remove { node, done } => {
                    self.detach(&node);
                    self.publish();
                    drop(done);
                }
                Job::TransferOut { node, barrier } => {
                    self.detach(&node);
                    self.publish();
                    barrier.wait();
                }
                Job::TransferIn { node, barrier } => {
                    self.entries.push(node);
                    self.publish();
                    barrier.wait();
                }
            }
        }
        tracing::debug!(cell = %self.cell, "partition worker stopped");
    }

    fn detach(&mut self, node: &Handle<T>) {
        match self.entries.iter().position(|e| Handle::ptr_eq(e, node)) {
            Some(index) => {
                self.entries.swap_remove(index);
            }
            None => tracing::trace!(cell = %self.cell, "remove of absent entity ignored"),
        }
    }

    fn publish(&self) {
        let snapshot: Snapshot<T> = self.entries.as_slice().into();
        *self.snapshot.write() = snapshot;
        tracing::trace!(cell = %self.cell, len = self.entries.len(), "snapshot published");
    }
}
