//! Label placement without overlap.
//!
//! Every star marker is reserved first, so labels are placed around markers
//! and never displace them. Label candidates are then visited in priority
//! order (brightest first) and take the first anchor from the
//! [`AnchorPolicy`] whose box is fully visible and avoids every region
//! accepted so far. Candidates with no such anchor are suppressed.
//!
//! A box is fully visible when it lies on the canvas, inside the chart disk
//! when the circular mask clips the labels, and inside the crop bounds when
//! they are set.

mod occupancy;

pub use occupancy::{OccupancyMap, OccupancyRegion, Rect};

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::f64::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};

use crate::catalog::{constellation_name, Catalog};
use crate::config::{CropBounds, RenderConfig};
use crate::projection::{DrawnEdge, ProjectedPoint};

/// Width of one character relative to the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.6;

/// Position of a label box relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Center,
    Right,
    Above,
    Left,
    Below,
    AboveRight,
    BelowRight,
    AboveLeft,
    BelowLeft,
}

impl Anchor {
    /// Box of `width × height` placed around `(x, y)` at distance `gap`.
    pub fn place(self, x: f64, y: f64, gap: f64, width: f64, height: f64) -> Rect {
        let diagonal = gap * FRAC_1_SQRT_2;
        let (left, top) = match self {
            Anchor::Center => (x - width / 2.0, y - height / 2.0),
            Anchor::Right => (x + gap, y - height / 2.0),
            Anchor::Left => (x - gap - width, y - height / 2.0),
            Anchor::Above => (x - width / 2.0, y - gap - height),
            Anchor::Below => (x - width / 2.0, y + gap),
            Anchor::AboveRight => (x + diagonal, y - diagonal - height),
            Anchor::BelowRight => (x + diagonal, y + diagonal),
            Anchor::AboveLeft => (x - diagonal - width, y - diagonal - height),
            Anchor::BelowLeft => (x - diagonal - width, y + diagonal),
        };
        Rect {
            x: left,
            y: top,
            width,
            height,
        }
    }
}

/// Ordered anchors tried for each kind of label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorPolicy {
    pub star: Vec<Anchor>,
    pub constellation: Vec<Anchor>,
    /// Extra distance between a marker's edge and its label, in pixels.
    pub padding: f64,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        let star = vec![
            Anchor::Right,
            Anchor::Above,
            Anchor::Left,
            Anchor::Below,
            Anchor::AboveRight,
            Anchor::BelowRight,
            Anchor::AboveLeft,
            Anchor::BelowLeft,
        ];
        let mut constellation = vec![Anchor::Center];
        constellation.extend(star.iter().copied());
        Self {
            star,
            constellation,
            padding: 3.0,
        }
    }
}

impl AnchorPolicy {
    pub fn anchors(&self, kind: LabelKind) -> &[Anchor] {
        match kind {
            LabelKind::Constellation => &self.constellation,
            LabelKind::Star => &self.star,
        }
    }
}

/// What a label names. Constellations sort ahead of stars of equal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Constellation,
    Star,
}

/// A label that wants a place on the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCandidate {
    /// Stable identifier used to break priority ties.
    pub identifier: String,
    pub text: String,
    pub kind: LabelKind,
    /// Anchor point in pixels.
    pub x: f64,
    pub y: f64,
    /// Distance between the anchor point and the label box.
    pub gap: f64,
    /// Priority; lower is placed first.
    pub magnitude: f64,
}

impl LabelCandidate {
    fn priority(&self, other: &Self) -> Ordering {
        self.magnitude
            .total_cmp(&other.magnitude)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.identifier.cmp(&other.identifier))
    }
}

/// A label with its accepted box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub candidate: LabelCandidate,
    pub anchor: Anchor,
    pub bounds: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Placement {
    pub placed: Vec<PlacedLabel>,
    pub suppressed: Vec<LabelCandidate>,
}

/// Estimated size of a rendered label.
pub fn text_box(text: &str, font_size: f64) -> (f64, f64) {
    let chars = text.chars().count() as f64;
    (chars * font_size * CHAR_WIDTH_FACTOR, font_size)
}

/// Region where a label box is fully visible.
#[derive(Debug, Clone, Copy)]
struct LabelArea {
    width: f64,
    height: f64,
    /// Center and radius of the chart disk when the mask clips labels.
    disk: Option<(f64, f64, f64)>,
    crop: Option<CropBounds>,
}

impl LabelArea {
    fn new(config: &RenderConfig) -> Self {
        let width = f64::from(config.width);
        let height = f64::from(config.height);
        Self {
            width,
            height,
            disk: config
                .circular_mask
                .then(|| (width / 2.0, height / 2.0, config.chart_radius())),
            crop: config.bounds,
        }
    }

    fn admits(&self, rect: &Rect) -> bool {
        if !rect.within(self.width, self.height) {
            return false;
        }
        let corners = rect.corners();
        if let Some((cx, cy, r)) = self.disk {
            if corners.iter().any(|&(x, y)| (x - cx).hypot(y - cy) > r + 1e-9) {
                return false;
            }
        }
        match &self.crop {
            Some(crop) => corners.iter().all(|&(x, y)| crop.contains(x, y)),
            None => true,
        }
    }
}

/// Build label candidates for the projected stars.
///
/// Star labels are proper names of stars within the label magnitude limit.
/// Each constellation with at least one drawn edge between stars inside the
/// disk gets one label at the centroid of those stars, ranked by its
/// brightest member.
pub fn label_candidates(
    points: &[ProjectedPoint],
    edges: &[DrawnEdge],
    catalog: &Catalog,
    config: &RenderConfig,
) -> Vec<LabelCandidate> {
    if !config.labels {
        return Vec::new();
    }
    let padding = config.anchors.padding;
    let drawn: BTreeMap<_, _> = points
        .iter()
        .filter(|point| point.inside)
        .map(|point| (point.id, point))
        .collect();

    let mut figures: BTreeMap<&str, BTreeMap<_, &ProjectedPoint>> = BTreeMap::new();
    for edge in edges {
        if let (Some(start), Some(end)) = (drawn.get(&edge.start), drawn.get(&edge.end)) {
            let members = figures.entry(edge.constellation.as_str()).or_default();
            members.insert(edge.start, *start);
            members.insert(edge.end, *end);
        }
    }

    let mut candidates = Vec::new();

    for (abbreviation, members) in figures {
        let count = members.len() as f64;
        let x = members.values().map(|p| p.x).sum::<f64>() / count;
        let y = members.values().map(|p| p.y).sum::<f64>() / count;
        let magnitude = members
            .values()
            .map(|p| p.magnitude)
            .fold(f64::INFINITY, f64::min);
        candidates.push(LabelCandidate {
            identifier: abbreviation.to_string(),
            text: constellation_name(abbreviation)
                .unwrap_or(abbreviation)
                .to_string(),
            kind: LabelKind::Constellation,
            x,
            y,
            gap: padding,
            magnitude,
        });
    }

    for point in drawn.values() {
        if point.magnitude > config.label_magnitude_limit {
            continue;
        }
        let Some(name) = catalog.get(point.id).and_then(|object| object.name.as_deref()) else {
            continue;
        };
        candidates.push(LabelCandidate {
            identifier: format!("HIP {:010}", point.id),
            text: name.to_string(),
            kind: LabelKind::Star,
            x: point.x,
            y: point.y,
            gap: point.radius + padding,
            magnitude: point.magnitude,
        });
    }

    candidates
}

/// Place labels around the projected stars.
///
/// Markers are reserved before any label. The result satisfies
/// `placed.len() + suppressed.len() == candidates.len()`.
pub fn declutter(
    points: &[ProjectedPoint],
    mut candidates: Vec<LabelCandidate>,
    config: &RenderConfig,
) -> Placement {
    let mut map = OccupancyMap::new();
    for point in points {
        map.insert(OccupancyRegion::Circle {
            x: point.x,
            y: point.y,
            radius: point.radius,
        });
    }

    candidates.sort_by(|a, b| a.priority(b));

    let area = LabelArea::new(config);
    let font_size = config.label_style.font_size;
    let mut placement = Placement::default();

    for candidate in candidates {
        let (width, height) = text_box(&candidate.text, font_size);
        let accepted = config
            .anchors
            .anchors(candidate.kind)
            .iter()
            .find_map(|&anchor| {
                let bounds = anchor.place(candidate.x, candidate.y, candidate.gap, width, height);
                (area.admits(&bounds) && map.try_insert(OccupancyRegion::Rect(bounds)))
                .then_some((anchor, bounds))
            });

        match accepted {
            Some((anchor, bounds)) => placement.placed.push(PlacedLabel {
                candidate,
                anchor,
                bounds,
            }),
            None => placement.suppressed.push(candidate),
        }
    }

    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfigBuilder;
    use crate::projection::StarRole;

    fn point(id: u32, x: f64, y: f64) -> ProjectedPoint {
        ProjectedPoint {
            id,
            magnitude: 1.0,
            role: StarRole::Field,
            plane: [0.0, 0.0],
            x,
            y,
            radius: 3.0,
            inside: true,
        }
    }

    fn candidate(identifier: &str, x: f64, y: f64, magnitude: f64) -> LabelCandidate {
        LabelCandidate {
            identifier: identifier.to_string(),
            text: "Label".to_string(),
            kind: LabelKind::Star,
            x,
            y,
            gap: 6.0,
            magnitude,
        }
    }

    #[test]
    fn default_policy_prefers_right_then_above() {
        let policy = AnchorPolicy::default();
        assert_eq!(&policy.star[..2], &[Anchor::Right, Anchor::Above]);
        assert_eq!(policy.constellation[0], Anchor::Center);
        assert_eq!(policy.constellation.len(), policy.star.len() + 1);
    }

    #[test]
    fn anchors_clear_the_gap() {
        let right = Anchor::Right.place(100.0, 100.0, 10.0, 30.0, 12.0);
        assert_eq!(right.x, 110.0);
        assert_eq!(right.center()[1], 100.0);
        let above = Anchor::Above.place(100.0, 100.0, 10.0, 30.0, 12.0);
        assert_eq!(above.bottom(), 90.0);
    }

    #[test]
    fn brighter_label_wins_the_contested_spot() {
        let config = RenderConfigBuilder::new().build().unwrap();
        let points = [point(1, 500.0, 500.0), point(2, 500.0, 500.5)];
        let candidates = vec![
            candidate("faint", 500.0, 500.5, 3.0),
            candidate("bright", 500.0, 500.0, 0.5),
        ];
        let placement = declutter(&points, candidates, &config);
        assert_eq!(placement.placed[0].candidate.identifier, "bright");
        assert_eq!(placement.placed[0].anchor, Anchor::Right);
        assert_ne!(placement.placed.get(1).map(|p| p.anchor), Some(Anchor::Right));
    }

    #[test]
    fn label_off_canvas_is_suppressed() {
        let config = RenderConfigBuilder::new()
            .with_size(40, 40)
            .build()
            .unwrap();
        let mut wide = candidate("wide", 20.0, 20.0, 1.0);
        wide.text = "An extremely long label".to_string();
        let placement = declutter(&[point(1, 20.0, 20.0)], vec![wide], &config);
        assert!(placement.placed.is_empty());
        assert_eq!(placement.suppressed.len(), 1);
    }

    #[test]
    fn masked_labels_stay_inside_the_disk() {
        // Right and Above leave the disk near the upper right rim; Left fits.
        let star = || point(1, 840.0, 160.0);
        let label = || candidate("rim", 840.0, 160.0, 1.0);

        let square = RenderConfigBuilder::new().build().unwrap();
        let placement = declutter(&[star()], vec![label()], &square);
        assert_eq!(placement.placed[0].anchor, Anchor::Right);

        let masked = RenderConfigBuilder::new().with_circular_mask(true).build().unwrap();
        let placement = declutter(&[star()], vec![label()], &masked);
        assert_eq!(placement.placed[0].anchor, Anchor::Left);
        for (x, y) in placement.placed[0].bounds.corners() {
            assert!((x - 500.0).hypot(y - 500.0) <= masked.chart_radius());
        }
    }

    #[test]
    fn labels_respect_crop_bounds() {
        let config = RenderConfigBuilder::new()
            .with_bounds(0.0, 0.0, 880.0, 1000.0)
            .build()
            .unwrap();
        let placement = declutter(
            &[point(1, 840.0, 500.0)],
            vec![candidate("crop", 840.0, 500.0, 1.0)],
            &config,
        );
        // Right would end at x = 882.
        assert_eq!(placement.placed[0].anchor, Anchor::Above);
    }

    #[test]
    fn ties_break_on_kind_then_identifier() {
        let mut a = candidate("b", 0.0, 0.0, 1.0);
        let b = candidate("a", 0.0, 0.0, 1.0);
        assert_eq!(a.priority(&b), Ordering::Greater);
        a.kind = LabelKind::Constellation;
        assert_eq!(a.priority(&b), Ordering::Less);
    }
}
