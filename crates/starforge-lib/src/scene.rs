//! Scene graph of a rendered chart.
//!
//! A [`Scene`] is an ordered list of named layers. Layer order is fixed:
//!
//! | # | layer | content |
//! |---|-------|---------|
//! | 1 | `background` | canvas fill |
//! | 2 | `procedural-stars` | decorative scatter (optional) |
//! | 3 | `field-stars` | stars with no drawn figure edge |
//! | 4 | `constellation-lines` | drawn figure edges |
//! | 5 | `constellation-stars` | endpoints of drawn edges |
//! | 6 | `labels` | placed labels |
//! | 7 | `mask` | border ring (circular charts only) |
//!
//! Layers 2 to 6 are clipped to the chart disk when the circular mask is on.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::RenderConfig;
use crate::declutter::{LabelKind, Placement};
use crate::icons::{IconSet, IconShape, StarIcon};
use crate::projection::{DrawnEdge, ProjectedPoint, Projector, StarRole};

pub const BACKGROUND: &str = "background";
pub const PROCEDURAL_STARS: &str = "procedural-stars";
pub const FIELD_STARS: &str = "field-stars";
pub const CONSTELLATION_LINES: &str = "constellation-lines";
pub const CONSTELLATION_STARS: &str = "constellation-stars";
pub const LABELS: &str = "labels";
pub const MASK: &str = "mask";

pub const CONSTELLATION_ICON_ID: &str = "constellation-icon";
pub const BACKGROUND_ICON_ID: &str = "background-icon";
pub const CLIP_ID: &str = "chart-clip";

const PROCEDURAL_OPACITY: f64 = 0.65;

/// A drawable shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Primitive {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    /// Ring drawn with a stroke and no fill.
    Ring {
        cx: f64,
        cy: f64,
        r: f64,
        stroke: String,
        width: f64,
    },
    Polyline {
        points: Vec<(f64, f64)>,
    },
    /// Instance of a symbol from [`Scene::symbols`], centered on `(x, y)`.
    Icon {
        symbol: String,
        x: f64,
        y: f64,
        size: f64,
    },
    Text {
        x: f64,
        y: f64,
        class: String,
        content: String,
    },
}

/// A named group of primitives sharing presentation attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLayer {
    pub name: &'static str,
    /// SVG presentation attributes applied to the whole group.
    pub style: Vec<(&'static str, String)>,
    /// Whether the layer is inside the chart clip.
    pub clipped: bool,
    pub primitives: Vec<Primitive>,
}

impl SceneLayer {
    fn new(name: &'static str, clipped: bool) -> Self {
        Self {
            name,
            style: Vec::new(),
            clipped,
            primitives: Vec::new(),
        }
    }

    fn style(mut self, attribute: &'static str, value: impl ToString) -> Self {
        self.style.push((attribute, value.to_string()));
        self
    }
}

/// Reusable icon definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: &'static str,
    pub view_box: [f64; 4],
    pub shapes: Vec<IconShape>,
}

/// Circular clip region in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Clip {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

/// Fully composed chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub clip: Option<Clip>,
    pub symbols: Vec<Symbol>,
    pub layers: Vec<SceneLayer>,
}

impl Scene {
    pub fn layer(&self, name: &str) -> Option<&SceneLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// Serialize to an SVG document.
    pub fn to_svg(&self) -> String {
        crate::document::write_svg(self)
    }
}

/// Assemble the scene from the outputs of the earlier stages.
pub fn compose(
    config: &RenderConfig,
    projector: &Projector,
    points: &[ProjectedPoint],
    edges: &[DrawnEdge],
    placement: &Placement,
    icons: &IconSet,
) -> Scene {
    let clipped = config.circular_mask;
    let mut symbols = Vec::new();
    let constellation_icon = register(&mut symbols, CONSTELLATION_ICON_ID, icons.constellation.as_ref());
    let background_icon = register(&mut symbols, BACKGROUND_ICON_ID, icons.background.as_ref());

    let mut background = SceneLayer::new(BACKGROUND, false);
    background.primitives.push(Primitive::Rect {
        x: 0.0,
        y: 0.0,
        width: f64::from(config.width),
        height: f64::from(config.height),
        fill: config.palette.background.clone(),
    });

    let mut layers = vec![
        background,
        procedural_layer(config, projector, clipped),
        star_layer(FIELD_STARS, StarRole::Field, points, background_icon, config, clipped),
        line_layer(config, edges, clipped),
        star_layer(
            CONSTELLATION_STARS,
            StarRole::Constellation,
            points,
            constellation_icon,
            config,
            clipped,
        ),
        label_layer(config, placement, clipped),
    ];

    let clip = clipped.then(|| {
        let (cx, cy) = projector.center();
        Clip {
            cx,
            cy,
            r: projector.radius(),
        }
    });

    if let Some(clip) = clip {
        let mut mask = SceneLayer::new(MASK, false);
        if config.border_width > 0.0 {
            mask.primitives.push(Primitive::Ring {
                cx: clip.cx,
                cy: clip.cy,
                r: clip.r + config.border_width / 2.0,
                stroke: config.palette.border.clone(),
                width: config.border_width,
            });
        }
        layers.push(mask);
    }

    Scene {
        width: config.width,
        height: config.height,
        clip,
        symbols,
        layers,
    }
}

fn register(symbols: &mut Vec<Symbol>, id: &'static str, icon: Option<&StarIcon>) -> Option<&'static str> {
    let icon = icon?;
    symbols.push(Symbol {
        id,
        view_box: icon.view_box,
        shapes: icon.shapes.clone(),
    });
    Some(id)
}

fn procedural_layer(config: &RenderConfig, projector: &Projector, clipped: bool) -> SceneLayer {
    let mut layer = SceneLayer::new(PROCEDURAL_STARS, clipped)
        .style("fill", &config.palette.stars)
        .style("opacity", PROCEDURAL_OPACITY);
    if !config.procedural.enabled {
        return layer;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed());
    for _ in 0..config.procedural.count {
        // sqrt keeps the scatter uniform over the disk area.
        let r = rng.random::<f64>().sqrt();
        let theta = rng.random::<f64>() * TAU;
        let scale = 0.7 + 0.6 * rng.random::<f64>();
        let (cx, cy) = projector.to_pixel([r * theta.cos(), r * theta.sin()]);
        if config.bounds.is_some_and(|bounds| !bounds.contains(cx, cy)) {
            continue;
        }
        layer.primitives.push(Primitive::Circle {
            cx,
            cy,
            r: config.procedural.size * scale,
        });
    }
    layer
}

fn star_layer(
    name: &'static str,
    role: StarRole,
    points: &[ProjectedPoint],
    icon: Option<&'static str>,
    config: &RenderConfig,
    clipped: bool,
) -> SceneLayer {
    let mut layer = SceneLayer::new(name, clipped).style("fill", &config.palette.stars);
    layer.primitives = points
        .iter()
        .filter(|point| point.role == role)
        .map(|point| match icon {
            Some(symbol) => Primitive::Icon {
                symbol: symbol.to_string(),
                x: point.x,
                y: point.y,
                size: point.radius * 2.0,
            },
            None => Primitive::Circle {
                cx: point.x,
                cy: point.y,
                r: point.radius,
            },
        })
        .collect();
    layer
}

fn line_layer(config: &RenderConfig, edges: &[DrawnEdge], clipped: bool) -> SceneLayer {
    let mut layer = SceneLayer::new(CONSTELLATION_LINES, clipped)
        .style("fill", "none")
        .style("stroke", &config.palette.lines)
        .style("stroke-width", config.line_style.width)
        .style("stroke-opacity", config.line_style.opacity)
        .style("stroke-linecap", "round");
    layer.primitives = edges
        .iter()
        .map(|edge| Primitive::Polyline {
            points: edge.points.clone(),
        })
        .collect();
    layer
}

fn label_layer(config: &RenderConfig, placement: &Placement, clipped: bool) -> SceneLayer {
    let style = &config.label_style;
    let mut layer = SceneLayer::new(LABELS, clipped)
        .style("fill", &config.palette.labels)
        .style("font-family", &style.font_family)
        .style("font-size", style.font_size)
        .style("opacity", style.opacity);

    // Baseline sits at 80% of the box height.
    let baseline = style.font_size * 0.8;
    layer.primitives = placement
        .placed
        .iter()
        .map(|label| Primitive::Text {
            x: label.bounds.x,
            y: label.bounds.y + baseline,
            class: match label.candidate.kind {
                LabelKind::Constellation => "constellation".to_string(),
                LabelKind::Star => "star".to_string(),
            },
            content: label.candidate.text.clone(),
        })
        .collect();
    layer
}
