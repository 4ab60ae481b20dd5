use std::sync::{Arc, OnceLock};

use gridspace_common::CellId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::partition::Partition;

type PartitionMap<T> = RwLock<FxHashMap<CellId, Arc<Partition<T>>>>;

/// Lazily-populated map from cell id to its partition actor.
///
/// The backing map is allocated on first use. Writers go through
/// [`PartitionDirectory::get_or_create`], which starts at most one actor per
/// cell even when several threads race on the same id. Readers use
/// [`PartitionDirectory::get`] so that querying an empty region never
/// spawns anything.
pub struct PartitionDirectory<T> {
    partitions: OnceLock<PartitionMap<T>>,
    partition_capacity: usize,
}

impl<T> PartitionDirectory<T> {
    pub const fn new(partition_capacity: usize) -> Self {
        Self {
            partitions: OnceLock::new(),
            partition_capacity,
        }
    }

    fn map(&self) -> &PartitionMap<T> {
        self.partitions.get_or_init(Default::default)
    }

    /// Look up an existing partition without creating one.
    pub fn get(&self, cell: CellId) -> Option<Arc<Partition<T>>> {
        self.map().read().get(&cell).cloned()
    }

    /// Number of partitions created so far.
    pub fn len(&self) -> usize {
        self.partitions.get().map_or(0, |map| map.read().len())
    }

    /// Whether no partition has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live partitions, in no particular order.
    pub fn partitions(&self) -> Vec<Arc<Partition<T>>> {
        self.partitions
            .get()
            .map(|map| map.read().values().cloned().collect())
            .unwrap_or_default()
    }
}

impl<T: Send + Sync + 'static> PartitionDirectory<T> {
    /// Look up the partition for `cell`, starting it if this is the first access.
    pub fn get_or_create(&self, cell: CellId) -> Arc<Partition<T>> {
        if let Some(partition) = self.get(cell) {
            return partition;
        }

        let capacity = self.partition_capacity;
        let mut map = self.map().write();
        Arc::clone(
            map.entry(cell)
                .or_insert_with(|| Arc::new(Partition::spawn(cell, capacity))),
        )
    }
}

impl<T> Default for PartitionDirectory<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_does_not_create() {
        let dir: PartitionDirectory<()> = PartitionDirectory::default();
        assert!(dir.get(CellId::new(0, 0)).is_none());
        assert!(dir.is_empty());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let dir: PartitionDirectory<()> = PartitionDirectory::default();
        let a = dir.get_or_create(CellId::new(1, 2));
        let b = dir.get_or_create(CellId::new(1, 2));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.cell(), CellId::new(1, 2));
        assert_eq!(dir.len(), 1);

        let looked_up = dir.get(CellId::new(1, 2)).unwrap();
        assert!(Arc::ptr_eq(&a, &looked_up));
    }

    #[test]
    fn distinct_cells_get_distinct_partitions() {
        let dir: PartitionDirectory<()> = PartitionDirectory::default();
        let a = dir.get_or_create(CellId::new(0, 0));
        let b = dir.get_or_create(CellId::new(0, 1));

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.partitions().len(), 2);
    }

    #[test]
    fn concurrent_first_access_starts_one_partition() {
        let dir: PartitionDirectory<()> = PartitionDirectory::default();
        let cell = CellId::new(-4, 9);

        let created: Vec<Arc<Partition<()>>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8).map(|_| s.spawn(|| dir.get_or_create(cell))).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(dir.len(), 1);
        for partition in &created {
            assert!(Arc::ptr_eq(partition, &created[0]));
        }
    }
}
