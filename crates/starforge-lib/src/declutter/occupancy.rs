//! Spatial index of reserved chart regions.
//!
//! Region centers are kept in a 2-D KD-tree. A candidate is checked against
//! every accepted region whose center lies within the sum of the two
//! circumscribed radii, then confirmed with an exact shape test.
//!
//! Regions sharing an exact center share one tree entry; the tree never
//! holds two items at the same point.

use std::collections::HashMap;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use serde::Serialize;

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Axis-aligned rectangle in pixels; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> [f64; 2] {
        [self.x + self.width / 2.0, self.y + self.height / 2.0]
    }

    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x, self.y),
            (self.right(), self.y),
            (self.x, self.bottom()),
            (self.right(), self.bottom()),
        ]
    }

    /// Whether the rectangle lies entirely within `[0, width] × [0, height]`.
    pub fn within(&self, width: f64, height: f64) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= width && self.bottom() <= height
    }

    /// Strict overlap; rectangles that only touch do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A reserved area of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum OccupancyRegion {
    /// A star marker.
    Circle { x: f64, y: f64, radius: f64 },
    /// A label box.
    Rect(Rect),
}

impl OccupancyRegion {
    pub fn center(&self) -> [f64; 2] {
        match self {
            OccupancyRegion::Circle { x, y, .. } => [*x, *y],
            OccupancyRegion::Rect(rect) => rect.center(),
        }
    }

    /// Radius of the smallest circle around the center that contains the
    /// region.
    pub fn extent(&self) -> f64 {
        match self {
            OccupancyRegion::Circle { radius, .. } => *radius,
            OccupancyRegion::Rect(rect) => rect.width.hypot(rect.height) / 2.0,
        }
    }

    pub fn intersects(&self, other: &OccupancyRegion) -> bool {
        use OccupancyRegion::{Circle, Rect as Area};
        match (self, other) {
            (Circle { x: x1, y: y1, radius: r1 }, Circle { x: x2, y: y2, radius: r2 }) => {
                (x1 - x2).hypot(y1 - y2) < r1 + r2
            }
            (Area(a), Area(b)) => a.intersects(b),
            (Circle { x, y, radius }, Area(rect)) | (Area(rect), Circle { x, y, radius }) => {
                let nearest_x = x.clamp(rect.x, rect.right());
                let nearest_y = y.clamp(rect.y, rect.bottom());
                (x - nearest_x).hypot(y - nearest_y) < *radius
            }
        }
    }
}

/// Accepted regions with a spatial index over their centers.
pub struct OccupancyMap {
    /// Items are indices into `slots`.
    tree: KdTree<f64, usize, 2, BUCKET_SIZE, u32>,
    /// Region indices per distinct center.
    slots: Vec<Vec<usize>>,
    slot_by_center: HashMap<[u64; 2], usize>,
    regions: Vec<OccupancyRegion>,
    max_extent: f64,
}

impl Default for OccupancyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl OccupancyMap {
    pub fn new() -> Self {
        Self {
            tree: KdTree::new(),
            slots: Vec::new(),
            slot_by_center: HashMap::new(),
            regions: Vec::new(),
            max_extent: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[OccupancyRegion] {
        &self.regions
    }

    /// Reserve a region unconditionally.
    pub fn insert(&mut self, region: OccupancyRegion) {
        let index = self.regions.len();
        let center = region.center();
        // Adding 0.0 folds -0.0 into 0.0 so equal points share a key.
        let key = [(center[0] + 0.0).to_bits(), (center[1] + 0.0).to_bits()];
        match self.slot_by_center.get(&key) {
            Some(&slot) => self.slots[slot].push(index),
            None => {
                let slot = self.slots.len();
                self.slots.push(vec![index]);
                self.slot_by_center.insert(key, slot);
                self.tree.add(&center, slot);
            }
        }
        self.max_extent = self.max_extent.max(region.extent());
        self.regions.push(region);
    }

    /// Whether the region overlaps any accepted region.
    pub fn collides(&self, region: &OccupancyRegion) -> bool {
        if self.regions.is_empty() {
            return false;
        }
        let reach = region.extent() + self.max_extent;
        self.tree
            .within::<SquaredEuclidean>(&region.center(), reach * reach)
            .into_iter()
            .flat_map(|neighbour| &self.slots[neighbour.item])
            .any(|&index| self.regions[index].intersects(region))
    }

    /// Reserve the region if it does not overlap any accepted region.
    pub fn try_insert(&mut self, region: OccupancyRegion) -> bool {
        if self.collides(&region) {
            return false;
        }
        self.insert(region);
        true
    }
}
