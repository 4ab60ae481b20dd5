//! Concurrent spatial index over a uniform grid of square cells.
//!
//! # Invariants
//! - Every live entity is held by exactly one partition: the one for its recorded cell.
//! - A partition snapshot is immutable and reflects a single point in that partition's job order.
//! - A cross-cell move is applied on both partitions before either processes anything else.
//! - Queries never start partitions; empty regions stay free.

mod directory;
mod index;
mod node;
mod partition;
mod query;

pub use directory::PartitionDirectory;
pub use gridspace_common::{CellId, ConfigError, IndexConfig};
pub use index::{IndexStats, SpatialIndex};
pub use node::{Handle, Node};
pub use partition::{Partition, Snapshot};
pub use query::{Cylinder, QueryStrategy, Sphere};

pub fn crate_info() -> &'static str {
    "gridspace-index v0.1.0"
}
