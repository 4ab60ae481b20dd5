use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use glam::DVec3;
use gridspace_common::CellId;
use parking_lot::RwLock;

/// Where an entity currently is and which cell it was last filed under.
#[derive(Debug, Clone, Copy)]
struct Placement {
    position: DVec3,
    cell: CellId,
}

/// An indexed point entity carrying a payload.
///
/// Position and cell are written by [`SpatialIndex::update`](crate::SpatialIndex::update)
/// and read by queries, possibly from other threads.
pub struct Node<T> {
    placement: RwLock<Placement>,
    value: T,
}

impl<T> Node<T> {
    /// Current world position.
    pub fn position(&self) -> DVec3 {
        self.placement.read().position
    }

    /// Cell of the partition that owns this entity.
    pub fn cell(&self) -> CellId {
        self.placement.read().cell
    }

    /// The payload supplied at creation.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub(crate) fn set_position(&self, position: DVec3) {
        self.placement.write().position = position;
    }

    pub(crate) fn relocate(&self, position: DVec3, cell: CellId) {
        *self.placement.write() = Placement { position, cell };
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let placement = *self.placement.read();
        f.debug_struct("Node")
            .field("position", &placement.position)
            .field("cell", &placement.cell)
            .field("value", &self.value)
            .finish()
    }
}

/// Caller-held reference to an indexed entity.
///
/// Cloning is cheap and every clone refers to the same entity. Equality is
/// identity: two handles are equal only if they point at the same node, even
/// when their payloads compare equal.
pub struct Handle<T>(Arc<Node<T>>);

impl<T> Handle<T> {
    pub(crate) fn new(value: T, position: DVec3, cell: CellId) -> Self {
        Self(Arc::new(Node {
            placement: RwLock::new(Placement { position, cell }),
            value,
        }))
    }

    /// Whether two handles refer to the same entity.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Handle<T> {
    type Target = Node<T>;

    fn deref(&self) -> &Node<T> {
        &self.0
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> Eq for Handle<T> {}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_identity() {
        let a = Handle::new(7, DVec3::ZERO, CellId::default());
        let b = Handle::new(7, DVec3::ZERO, CellId::default());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn relocate_updates_position_and_cell() {
        let handle = Handle::new("crate", DVec3::new(1.0, 2.0, 3.0), CellId::new(0, 0));
        handle.relocate(DVec3::new(100.0, 0.0, 100.0), CellId::new(2, 2));

        assert_eq!(handle.position(), DVec3::new(100.0, 0.0, 100.0));
        assert_eq!(handle.cell(), CellId::new(2, 2));
        assert_eq!(*handle.value(), "crate");
    }

    #[test]
    fn set_position_keeps_cell() {
        let handle = Handle::new((), DVec3::ZERO, CellId::new(4, -1));
        handle.set_position(DVec3::new(1.0, 1.0, 1.0));
        assert_eq!(handle.cell(), CellId::new(4, -1));
        assert_eq!(handle.position(), DVec3::ONE);
    }
}
