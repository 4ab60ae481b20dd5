use std::sync::Arc;

use glam::DVec3;
use gridspace_common::{CellId, ConfigError, IndexConfig};

use crate::directory::PartitionDirectory;
use crate::node::Handle;
use crate::partition::Partition;
use crate::query::QueryStrategy;

/// Point-in-time counters for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Partitions started so far, including ones that are now empty.
    pub partitions: usize,
    /// Entities across all partitions' latest snapshots.
    pub entities: usize,
    /// Partitions currently holding at least one entity.
    pub occupied_partitions: usize,
}

/// Concurrent spatial index over a uniform grid of square cells.
///
/// Each cell is owned by a [`Partition`] actor started on first write. All
/// operations take `&self` and may be called from any number of threads.
/// Only one thread at a time may `update` a given handle.
pub struct SpatialIndex<T> {
    config: IndexConfig,
    partitions: PartitionDirectory<T>,
}

impl<T> SpatialIndex<T> {
    /// Create an index from a validated configuration.
    pub fn new(config: IndexConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            partitions: PartitionDirectory::new(config.partition_capacity),
        })
    }

    /// Create an index with default settings and the given tile size.
    pub fn with_tile_size(tile_size: f64) -> Result<Self, ConfigError> {
        Self::new(IndexConfig::with_tile_size(tile_size))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Edge length of a cell in world units.
    pub fn tile_size(&self) -> f64 {
        self.config.tile_size
    }

    /// Cell a position falls into.
    pub fn cell_for(&self, position: DVec3) -> CellId {
        CellId::from_position(position, self.config.tile_size)
    }

    /// Existing partition for a cell, if any entity was ever filed there.
    pub fn partition(&self, cell: CellId) -> Option<Arc<Partition<T>>> {
        self.partitions.get(cell)
    }

    /// Number of partitions started so far.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Total entities across all partitions' latest snapshots.
    pub fn entity_count(&self) -> usize {
        self.partitions.partitions().iter().map(|p| p.len()).sum()
    }

    pub fn stats(&self) -> IndexStats {
        let partitions = self.partitions.partitions();
        let mut stats = IndexStats {
            partitions: partitions.len(),
            ..IndexStats::default()
        };
        for partition in &partitions {
            let len = partition.len();
            stats.entities += len;
            if len > 0 {
                stats.occupied_partitions += 1;
            }
        }
        stats
    }

    /// Collect every entity inside the strategy's region into `out`.
    ///
    /// Only cells that already have a partition are read; nothing is created.
    /// Results are appended, so the buffer can be cleared and reused between
    /// queries.
    pub fn query<Q>(&self, strategy: &Q, mut out: Vec<Handle<T>>) -> Vec<Handle<T>>
    where
        Q: QueryStrategy<T> + ?Sized,
    {
        for cell in strategy.list_tiles(self.config.tile_size) {
            let Some(partition) = self.partitions.get(cell) else {
                continue;
            };
            out.extend(
                partition
                    .read()
                    .iter()
                    .filter(|node| strategy.contains(node))
                    .cloned(),
            );
        }
        out
    }
}

impl<T: Send + Sync + 'static> SpatialIndex<T> {
    /// Insert a new entity at `position` and return its handle.
    pub fn create(&self, value: T, position: DVec3) -> Handle<T> {
        let cell = self.cell_for(position);
        let handle = Handle::new(value, position, cell);
        self.partitions.get_or_create(cell).add(handle.clone());
        tracing::trace!(%cell, "entity created");
        handle
    }

    /// Move an entity.
    ///
    /// Moves within the same cell only rewrite the position. Moves across a
    /// cell boundary transfer the entity between the two partitions; the call
    /// returns once both sides have published.
    pub fn update(&self, handle: &Handle<T>, position: DVec3) {
        let from = handle.cell();
        let to = self.cell_for(position);

        if from == to {
            handle.set_position(position);
            return;
        }

        let source = self.partitions.get_or_create(from);
        let dest = self.partitions.get_or_create(to);
        source.transfer(handle, &dest);
        handle.relocate(position, to);

        tracing::debug!(%from, %to, "entity moved across cells");
    }

    /// Detach an entity from the index.
    ///
    /// Other clones of the handle remain valid references to the payload but
    /// must not be passed back to the index.
    pub fn remove(&self, handle: Handle<T>) {
        let cell = handle.cell();
        match self.partitions.get(cell) {
            Some(partition) => partition.remove(&handle),
            None => tracing::trace!(%cell, "remove for unknown partition ignored"),
        }
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        let config = IndexConfig::default();
        Self {
            config,
            partitions: PartitionDirectory::new(config.partition_capacity),
        }
    }
}
