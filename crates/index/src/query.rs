//! Region shapes for [`SpatialIndex::query`](crate::SpatialIndex::query).

use glam::{DVec2, DVec3};
use gridspace_common::CellId;

use crate::node::Node;

/// A queryable region.
///
/// `list_tiles` narrows the search to candidate cells; it may include cells
/// that hold nothing inside the region, but must not miss any that do.
/// `contains` is the exact per-entity test. Implementations should not
/// depend on index state so one strategy can serve concurrent queries.
pub trait QueryStrategy<T> {
    /// Candidate cells for a grid of `tile_size`, without duplicates.
    fn list_tiles(&self, tile_size: f64) -> Vec<CellId>;

    /// Whether the entity lies inside the region.
    fn contains(&self, node: &Node<T>) -> bool;
}

/// Ball of `radius` around `center`, boundary inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl<T> QueryStrategy<T> for Sphere {
    fn list_tiles(&self, tile_size: f64) -> Vec<CellId> {
        tiles_in_radius(tile_size, self.center, self.radius)
    }

    fn contains(&self, node: &Node<T>) -> bool {
        self.center.distance(node.position()) <= self.radius
    }
}

/// Vertical cylinder of `radius` around `center`.
///
/// Spans `center.y + bottom_offset ..= center.y + top_offset`. Either offset
/// may be infinite for an open end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub center: DVec3,
    pub radius: f64,
    pub top_offset: f64,
    pub bottom_offset: f64,
}

impl Cylinder {
    pub fn new(center: DVec3, radius: f64, top_offset: f64, bottom_offset: f64) -> Self {
        Self {
            center,
            radius,
            top_offset,
            bottom_offset,
        }
    }

    /// Infinite column: any height within `radius` of `center` on the (x, z) plane.
    pub fn unbounded(center: DVec3, radius: f64) -> Self {
        Self::new(center, radius, f64::INFINITY, f64::NEG_INFINITY)
    }
}

impl<T> QueryStrategy<T> for Cylinder {
    fn list_tiles(&self, tile_size: f64) -> Vec<CellId> {
        tiles_in_radius(tile_size, self.center, self.radius)
    }

    fn contains(&self, node: &Node<T>) -> bool {
        let pos = node.position();
        let axis = DVec2::new(self.center.x, self.center.z);
        let horizontal = axis.distance(DVec2::new(pos.x, pos.z));

        horizontal <= self.radius
            && pos.y <= self.center.y + self.top_offset
            && pos.y >= self.center.y + self.bottom_offset
    }
}

/// Every cell touched by the square `center ± radius` on the (x, z) plane.
///
/// Cell ids saturate at the `i32` range, so the span is measured in `i64`.
/// A negative radius touches nothing.
fn tiles_in_radius(tile_size: f64, center: DVec3, radius: f64) -> Vec<CellId> {
    let low = CellId::containing(center.x - radius, center.z - radius, tile_size);
    let high = CellId::containing(center.x + radius, center.z + radius, tile_size);

    let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0);
    let capacity = usize::try_from(span(low.x, high.x))
        .ok()
        .zip(usize::try_from(span(low.z, high.z)).ok())
        .and_then(|(width, depth)| width.checked_mul(depth))
        .unwrap_or(0);
    let mut tiles = Vec::with_capacity(capacity);

    for x in low.x..=high.x {
        for z in low.z..=high.z {
            tiles.push(CellId::new(x, z));
        }
    }
    tiles
}
