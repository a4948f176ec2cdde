//! End-to-end chart rendering.
//!
//! Stages run strictly in order and hand their output to the next one by
//! value:
//!
//! ```text
//! coords → visibility → projection → crop → edges → declutter → scene → svg
//! ```
//!
//! The pipeline performs no I/O. Catalog and icon loading happen before
//! [`render`] and writing the document happens after it.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use starforge_lib::{render, Catalog, Observer, RenderConfigBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::bundled()?.catalog;
//! let instant = Utc.with_ymd_and_hms(2024, 12, 25, 22, 0, 0).unwrap();
//! let observer = Observer::new(48.8566, 2.3522, instant)?;
//! let config = RenderConfigBuilder::new().with_field_of_view(120.0).build()?;
//!
//! let output = render(&catalog, &observer, &config, None)?;
//! assert!(output.svg.starts_with("<?xml"));
//! # Ok(())
//! # }
//! ```

use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::RenderConfig;
use crate::coords::{compute_horizontal_positions, ObserverFrame};
use crate::declutter::{declutter, label_candidates, Placement};
use crate::error::Result;
use crate::events::{EventSink, RenderEvent};
use crate::icons::IconSet;
use crate::observer::Observer;
use crate::projection::{
    assign_roles, crop_points, project_all, project_edges, DrawnEdge, ProjectedPoint, Projector,
};
use crate::scene::{compose, Scene};
use crate::visibility::{filter_visible, VisibilityStats};

/// Summary of a render, suitable for logs and machine-readable output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub observer: Observer,
    pub julian_date: f64,
    pub local_sidereal_time: f64,
    pub catalog_objects: usize,
    pub rejected_objects: usize,
    pub visibility: VisibilityStats,
    pub outside_disk: usize,
    pub outside_bounds: usize,
    pub constellation_edges: usize,
    pub labels_placed: usize,
    pub labels_suppressed: usize,
    pub icon_fallbacks: usize,
    pub layers: usize,
    pub bytes: usize,
}

/// Everything produced by a render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub svg: String,
    pub scene: Scene,
    pub points: Vec<ProjectedPoint>,
    pub edges: Vec<DrawnEdge>,
    pub placement: Placement,
    pub report: RenderReport,
}

/// Render a chart with generated star markers.
pub fn render(
    catalog: &Catalog,
    observer: &Observer,
    config: &RenderConfig,
    sink: Option<&dyn EventSink>,
) -> Result<RenderOutput> {
    render_with_icons(catalog, observer, config, &IconSet::default(), sink)
}

/// Render a chart, drawing custom icons where they loaded.
///
/// Per-object catalog problems and icon failures are reported through the
/// sink and the report; only observer and projection problems fail the
/// render.
pub fn render_with_icons(
    catalog: &Catalog,
    observer: &Observer,
    config: &RenderConfig,
    icons: &IconSet,
    sink: Option<&dyn EventSink>,
) -> Result<RenderOutput> {
    let emit = |event: RenderEvent| {
        if let Some(sink) = sink {
            sink.emit(&event);
        }
    };

    emit(RenderEvent::Started {
        objects: catalog.len(),
        field_of_view: config.field_of_view,
        magnitude_limit: config.magnitude_limit,
    });

    let frame = ObserverFrame::new(observer)?;
    let batch = compute_horizontal_positions(observer, catalog)?;
    for error in &batch.rejected {
        emit(RenderEvent::ObjectRejected {
            message: error.to_string(),
        });
    }

    let visible = filter_visible(&batch.positions, catalog, config);
    emit(RenderEvent::Visibility(visible.stats));

    let projector = Projector::new(config);
    let mut points = project_all(&visible, &projector);
    let outside_bounds = crop_points(&mut points, config.bounds.as_ref());
    let outside_disk = points.iter().filter(|point| !point.inside).count();
    emit(RenderEvent::Projected {
        points: points.len(),
        outside_disk,
        outside_bounds,
    });

    let edges = project_edges(catalog, &points, &projector, config.bounds.as_ref());
    assign_roles(&mut points, &edges, &projector);

    let candidates = label_candidates(&points, &edges, catalog, config);
    let placement = declutter(&points, candidates, config);
    emit(RenderEvent::Labels {
        placed: placement.placed.len(),
        suppressed: placement.suppressed.len(),
    });

    for failure in &icons.failures {
        emit(RenderEvent::IconFallback {
            message: failure.to_string(),
        });
    }

    let scene = compose(config, &projector, &points, &edges, &placement, icons);
    let svg = scene.to_svg();
    emit(RenderEvent::Completed {
        layers: scene.layers.len(),
        bytes: svg.len(),
    });

    let report = RenderReport {
        observer: *observer,
        julian_date: frame.julian_date(),
        local_sidereal_time: frame.local_sidereal_time(),
        catalog_objects: catalog.len(),
        rejected_objects: batch.rejected.len(),
        visibility: visible.stats,
        outside_disk,
        outside_bounds,
        constellation_edges: edges.len(),
        labels_placed: placement.placed.len(),
        labels_suppressed: placement.suppressed.len(),
        icon_fallbacks: icons.failures.len(),
        layers: scene.layers.len(),
        bytes: svg.len(),
    };

    Ok(RenderOutput {
        svg,
        scene,
        points,
        edges,
        placement,
        report,
    })
}
