//! Mapping of horizontal directions onto the chart plane.
//!
//! Projection happens in three steps:
//!
//! 1. An azimuthal projection around the view center produces a normalized
//!    plane coordinate where the edge of the field of view is radius 1.
//! 2. An optional warp (sphere effect or edge bend) adjusts that coordinate.
//! 3. The result is scaled onto the pixel disk of the canvas.
//!
//! Plane coordinates follow SVG conventions: x grows right and y grows down.
//! With the default zenith view center north is up and east is left, as when
//! looking up at the sky.

use std::collections::{HashMap, HashSet};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ObjectId};
use crate::config::{CropBounds, RenderConfig};
use crate::error::Error;
use crate::visibility::VisibleSet;

/// Stereographic scale breaks down as the field approaches the full sphere.
const MAX_STEREOGRAPHIC_FOV: f64 = 358.0;

/// Radius where the edge bend starts, in normalized units.
const EDGE_BEND_START: f64 = 0.9;

/// Segments used to draw one constellation edge under a warp.
pub const EDGE_SAMPLES: usize = 12;

/// Radial law of the azimuthal projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    /// Conformal; shapes near the edge are preserved.
    #[default]
    Stereographic,
    /// Angular distance from the center is proportional to radius.
    Equidistant,
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionKind::Stereographic => write!(f, "stereographic"),
            ProjectionKind::Equidistant => write!(f, "equidistant"),
        }
    }
}

impl FromStr for ProjectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stereographic" | "stereo" => Ok(ProjectionKind::Stereographic),
            "equidistant" | "azimuthal-equidistant" => Ok(ProjectionKind::Equidistant),
            other => Err(Error::configuration(
                "projection",
                format!("unknown projection '{other}'"),
            )),
        }
    }
}

/// Drawing role of a star.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StarRole {
    /// Endpoint of a drawn constellation edge.
    Constellation,
    Field,
}

/// A visible star placed on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub id: ObjectId,
    pub magnitude: f64,
    pub role: StarRole,
    /// Normalized plane coordinate before any warp; radius 1 is the edge of
    /// the field of view.
    pub plane: [f64; 2],
    /// Pixel position after warp.
    pub x: f64,
    pub y: f64,
    /// Marker radius in pixels.
    pub radius: f64,
    /// Whether the point lies within the drawable disk.
    pub inside: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Warp {
    None,
    Sphere(f64),
    EdgeBend(f64),
}

/// Precomputed projection state for one render.
#[derive(Debug, Clone)]
pub struct Projector {
    kind: ProjectionKind,
    sin_alt0: f64,
    cos_alt0: f64,
    az0: f64,
    half_fov: f64,
    stereo_scale: f64,
    warp: Warp,
    center: (f64, f64),
    radius: f64,
    constellation_size: f64,
    field_size: f64,
}

impl Projector {
    pub fn new(config: &RenderConfig) -> Self {
        let (sin_alt0, cos_alt0) = config.view_center.altitude.to_radians().sin_cos();
        let half_fov = (config.field_of_view / 2.0).to_radians();
        let stereo_fov = config.field_of_view.min(MAX_STEREOGRAPHIC_FOV);
        let warp = if config.sphere_effect && config.sphere_strength > 0.0 {
            Warp::Sphere(config.sphere_strength)
        } else if config.edge_bend > 0.0 {
            Warp::EdgeBend(config.edge_bend)
        } else {
            Warp::None
        };

        Self {
            kind: config.projection,
            sin_alt0,
            cos_alt0,
            az0: config.view_center.azimuth,
            half_fov,
            stereo_scale: (stereo_fov / 4.0).to_radians().tan(),
            warp,
            center: (config.width as f64 / 2.0, config.height as f64 / 2.0),
            radius: config.chart_radius(),
            constellation_size: config.star_size.constellation,
            field_size: config.star_size.background,
        }
    }

    /// Pixel position of the chart center.
    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    /// Radius of the drawable disk in pixels.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Whether a warp bends straight plane segments.
    pub fn warp_active(&self) -> bool {
        self.warp != Warp::None
    }

    /// Normalized plane coordinate of a horizontal direction, before warp.
    pub fn normalized(&self, altitude: f64, azimuth: f64) -> [f64; 2] {
        let (sin_alt, cos_alt) = altitude.to_radians().sin_cos();
        let (sin_daz, cos_daz) = (azimuth - self.az0).to_radians().sin_cos();

        let cos_c = (self.sin_alt0 * sin_alt + self.cos_alt0 * cos_alt * cos_daz).clamp(-1.0, 1.0);
        let c = cos_c.acos();
        if c == 0.0 {
            return [0.0, 0.0];
        }

        let r = match self.kind {
            ProjectionKind::Stereographic => (c / 2.0).tan() / self.stereo_scale,
            ProjectionKind::Equidistant => c / self.half_fov,
        };
        let bearing = (sin_daz * cos_alt)
            .atan2(self.cos_alt0 * sin_alt - self.sin_alt0 * cos_alt * cos_daz);

        [r * bearing.sin(), -r * bearing.cos()]
    }

    /// Apply the configured warp to a normalized coordinate.
    pub fn warp(&self, point: [f64; 2]) -> [f64; 2] {
        let r = point[0].hypot(point[1]);
        if r == 0.0 {
            return point;
        }
        match self.warp {
            Warp::None => point,
            Warp::Sphere(strength) => {
                let warped = sphere_radius(r, strength);
                [point[0] * warped / r, point[1] * warped / r]
            }
            Warp::EdgeBend(bend) => {
                if r <= EDGE_BEND_START {
                    return point;
                }
                let t = (r.min(1.0) - EDGE_BEND_START) / (1.0 - EDGE_BEND_START);
                let push = bend * t * t;
                // Tangent direction, clockwise on screen.
                let (tx, ty) = (-point[1] / r, point[0] / r);
                [point[0] + tx * push, point[1] + ty * push]
            }
        }
    }

    /// Pixel position of a warped normalized coordinate.
    pub fn to_pixel(&self, point: [f64; 2]) -> (f64, f64) {
        (
            self.center.0 + point[0] * self.radius,
            self.center.1 + point[1] * self.radius,
        )
    }

    /// Project a direction to a pixel position, reporting whether it lies in
    /// the drawable disk.
    pub fn project(&self, altitude: f64, azimuth: f64) -> ((f64, f64), bool) {
        let warped = self.warp(self.normalized(altitude, azimuth));
        let inside = warped[0].hypot(warped[1]) <= 1.0 + 1e-9;
        (self.to_pixel(warped), inside)
    }

    /// Pixel polyline of the plane segment between two projected points.
    ///
    /// Without a warp the segment stays straight. Under a warp it is sampled
    /// in the plane and every sample is warped, so the edge follows the
    /// distortion.
    pub fn edge_polyline(&self, start: &ProjectedPoint, end: &ProjectedPoint) -> Vec<(f64, f64)> {
        if !self.warp_active() {
            return vec![(start.x, start.y), (end.x, end.y)];
        }
        (0..=EDGE_SAMPLES)
            .map(|i| {
                let t = i as f64 / EDGE_SAMPLES as f64;
                let plane = [
                    start.plane[0] + (end.plane[0] - start.plane[0]) * t,
                    start.plane[1] + (end.plane[1] - start.plane[1]) * t,
                ];
                self.to_pixel(self.warp(plane))
            })
            .collect()
    }

    /// Marker radius for a star of the given role and magnitude.
    pub fn marker_radius(&self, role: StarRole, magnitude: f64) -> f64 {
        let size = match role {
            StarRole::Constellation => self.constellation_size,
            StarRole::Field => self.field_size,
        };
        marker_radius(size, magnitude)
    }
}

/// Project every visible object. Points start as field stars; see
/// [`assign_roles`].
pub fn project_all(visible: &VisibleSet, projector: &Projector) -> Vec<ProjectedPoint> {
    visible
        .objects
        .iter()
        .map(|object| {
            let plane = projector.normalized(object.altitude, object.azimuth);
            let warped = projector.warp(plane);
            let (x, y) = projector.to_pixel(warped);
            ProjectedPoint {
                id: object.id,
                magnitude: object.magnitude,
                role: StarRole::Field,
                plane,
                x,
                y,
                radius: projector.marker_radius(StarRole::Field, object.magnitude),
                inside: warped[0].hypot(warped[1]) <= 1.0 + 1e-9,
            }
        })
        .collect()
}

/// Drop points outside the crop bounds, returning how many were dropped.
pub fn crop_points(points: &mut Vec<ProjectedPoint>, bounds: Option<&CropBounds>) -> usize {
    let Some(bounds) = bounds else {
        return 0;
    };
    let before = points.len();
    points.retain(|point| bounds.contains(point.x, point.y));
    before - points.len()
}

/// A constellation edge drawn on the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnEdge {
    pub constellation: String,
    pub start: ObjectId,
    pub end: ObjectId,
    /// Pixel polyline from `start` to `end`.
    pub points: Vec<(f64, f64)>,
}

/// Edges whose endpoints are both among `points`.
///
/// With crop bounds an edge is kept only when its whole polyline, every warped
/// sample included, lies inside them.
pub fn project_edges(
    catalog: &Catalog,
    points: &[ProjectedPoint],
    projector: &Projector,
    bounds: Option<&CropBounds>,
) -> Vec<DrawnEdge> {
    let by_id: HashMap<ObjectId, &ProjectedPoint> =
        points.iter().map(|point| (point.id, point)).collect();

    let mut edges = Vec::new();
    for constellation in catalog.constellations() {
        for edge in &constellation.edges {
            let (Some(start), Some(end)) = (by_id.get(&edge.start), by_id.get(&edge.end)) else {
                continue;
            };
            let polyline = projector.edge_polyline(start, end);
            if let Some(bounds) = bounds {
                if !polyline.iter().all(|&(x, y)| bounds.contains(x, y)) {
                    continue;
                }
            }
            edges.push(DrawnEdge {
                constellation: constellation.abbreviation.clone(),
                start: edge.start,
                end: edge.end,
                points: polyline,
            });
        }
    }
    edges
}

/// Endpoints of drawn edges become constellation stars and everything else
/// a field star. Marker radii follow the role.
pub fn assign_roles(points: &mut [ProjectedPoint], edges: &[DrawnEdge], projector: &Projector) {
    let endpoints: HashSet<ObjectId> = edges.iter().flat_map(|edge| [edge.start, edge.end]).collect();
    for point in points {
        point.role = if endpoints.contains(&point.id) {
            StarRole::Constellation
        } else {
            StarRole::Field
        };
        point.radius = projector.marker_radius(point.role, point.magnitude);
    }
}

/// Sphere warp of a normalized radius.
///
/// `r' = r(1 - s) + sin(r·π/2)·s`; beyond the edge the sine term saturates at
/// 1 so the mapping stays monotonic.
pub fn sphere_radius(r: f64, strength: f64) -> f64 {
    let bulge = if r >= 1.0 { 1.0 } else { (r * FRAC_PI_2).sin() };
    r * (1.0 - strength) + bulge * strength
}

/// Marker radius from the nominal marker size and magnitude. Brighter stars
/// get larger markers.
pub fn marker_radius(size: f64, magnitude: f64) -> f64 {
    let scale = (1.0 + (3.0 - magnitude) * 0.2).clamp(0.35, 2.0);
    size / 2.0 * scale
}
