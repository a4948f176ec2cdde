//! Selection of the objects that appear on the chart.

use serde::Serialize;

use crate::catalog::{Catalog, ObjectId};
use crate::config::RenderConfig;
use crate::coords::{angular_separation, HorizontalPosition};

/// An object that passed every visibility predicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisibleObject {
    pub id: ObjectId,
    pub altitude: f64,
    pub azimuth: f64,
    pub magnitude: f64,
}

/// Counts of objects dropped by each predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityStats {
    pub considered: usize,
    pub below_horizon: usize,
    pub too_faint: usize,
    pub outside_field: usize,
    pub visible: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VisibleSet {
    pub objects: Vec<VisibleObject>,
    pub stats: VisibilityStats,
}

/// Keep the objects that are above the horizon, bright enough and inside the
/// field of view, in input order.
///
/// Predicates are applied in that order; an object is counted against the
/// first one it fails.
pub fn filter_visible(
    positions: &[HorizontalPosition],
    catalog: &Catalog,
    config: &RenderConfig,
) -> VisibleSet {
    let half_fov = config.field_of_view / 2.0;
    let center = config.view_center;
    let mut set = VisibleSet::default();

    for position in positions {
        let Some(object) = catalog.get(position.id) else {
            continue;
        };
        set.stats.considered += 1;

        if config.horizon_clipping && position.altitude <= 0.0 {
            set.stats.below_horizon += 1;
            continue;
        }
        if object.magnitude > config.magnitude_limit {
            set.stats.too_faint += 1;
            continue;
        }
        let separation = angular_separation(
            center.altitude,
            center.azimuth,
            position.altitude,
            position.azimuth,
        );
        if separation > half_fov {
            set.stats.outside_field += 1;
            continue;
        }

        set.objects.push(VisibleObject {
            id: position.id,
            altitude: position.altitude,
            azimuth: position.azimuth,
            magnitude: object.magnitude,
        });
    }

    set.stats.visible = set.objects.len();
    set
}
