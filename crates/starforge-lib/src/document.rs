//! SVG serialization of a [`Scene`].
//!
//! The document is assembled with the `svg` crate. Coordinates are written
//! with two decimals and trailing zeros trimmed, so identical scenes always
//! serialize to identical bytes.

use svg::node::element::{
    Circle, ClipPath, Definitions, Ellipse, Group, Path, Polygon, Polyline, Rectangle, Symbol,
    Text, Use,
};
use svg::{Document, Node};

use crate::icons::{IconShape, ShapeKind};
use crate::scene::{Primitive, Scene, SceneLayer, CLIP_ID};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize a scene to a standalone SVG document.
pub fn write_svg(scene: &Scene) -> String {
    let mut document = Document::new()
        .set("xmlns", "http://www.w3.org/2000/svg")
        .set("width", scene.width.to_string())
        .set("height", scene.height.to_string())
        .set("viewBox", format!("0 0 {} {}", scene.width, scene.height));

    if scene.clip.is_some() || !scene.symbols.is_empty() {
        let mut defs = Definitions::new();
        if let Some(clip) = &scene.clip {
            let disk = Circle::new()
                .set("cx", num(clip.cx))
                .set("cy", num(clip.cy))
                .set("r", num(clip.r));
            defs = defs.add(ClipPath::new().set("id", CLIP_ID).add(disk));
        }
        for symbol in &scene.symbols {
            let [x, y, w, h] = symbol.view_box;
            let view_box = format!("{} {} {} {}", num(x), num(y), num(w), num(h));
            let mut element = Symbol::new().set("id", symbol.id).set("viewBox", view_box);
            for shape in &symbol.shapes {
                element = element.add(icon_shape(shape));
            }
            defs = defs.add(element);
        }
        document = document.add(defs);
    }

    // Consecutive clipped layers share one clip group.
    let mut clipped: Option<Group> = None;
    for layer in &scene.layers {
        let group = layer_group(layer);
        if layer.clipped && scene.clip.is_some() {
            let open = clipped
                .take()
                .unwrap_or_else(|| Group::new().set("clip-path", format!("url(#{CLIP_ID})")));
            clipped = Some(open.add(group));
        } else {
            if let Some(open) = clipped.take() {
                document = document.add(open);
            }
            document = document.add(group);
        }
    }
    if let Some(open) = clipped {
        document = document.add(open);
    }

    format!("{XML_DECLARATION}\n{document}\n")
}

fn layer_group(layer: &SceneLayer) -> Group {
    let mut group = Group::new().set("id", layer.name);
    for (attribute, value) in &layer.style {
        group = group.set(*attribute, value.clone());
    }
    for primitive in &layer.primitives {
        group = add_primitive(group, primitive);
    }
    group
}

fn add_primitive(group: Group, primitive: &Primitive) -> Group {
    match primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            fill,
        } => group.add(
            Rectangle::new()
                .set("x", num(*x))
                .set("y", num(*y))
                .set("width", num(*width))
                .set("height", num(*height))
                .set("fill", fill.clone()),
        ),
        Primitive::Circle { cx, cy, r } => group.add(
            Circle::new()
                .set("cx", num(*cx))
                .set("cy", num(*cy))
                .set("r", num(*r)),
        ),
        Primitive::Ring {
            cx,
            cy,
            r,
            stroke,
            width,
        } => group.add(
            Circle::new()
                .set("cx", num(*cx))
                .set("cy", num(*cy))
                .set("r", num(*r))
                .set("fill", "none")
                .set("stroke", stroke.clone())
                .set("stroke-width", num(*width)),
        ),
        Primitive::Polyline { points } => {
            let coords = points
                .iter()
                .map(|(x, y)| format!("{},{}", num(*x), num(*y)))
                .collect::<Vec<_>>()
                .join(" ");
            group.add(Polyline::new().set("points", coords))
        }
        Primitive::Icon { symbol, x, y, size } => group.add(
            Use::new()
                .set("href", format!("#{symbol}"))
                .set("x", num(x - size / 2.0))
                .set("y", num(y - size / 2.0))
                .set("width", num(*size))
                .set("height", num(*size)),
        ),
        Primitive::Text {
            x,
            y,
            class,
            content,
        } => group.add(
            Text::new(content.clone())
                .set("x", num(*x))
                .set("y", num(*y))
                .set("class", class.clone()),
        ),
    }
}

fn icon_shape(shape: &IconShape) -> Box<dyn Node> {
    fn with_attributes<T: Node>(mut node: T, shape: &IconShape) -> T {
        for (attribute, value) in &shape.attributes {
            node.assign(*attribute, value.clone());
        }
        node
    }

    match shape.kind {
        ShapeKind::Path => Box::new(with_attributes(Path::new(), shape)),
        ShapeKind::Circle => Box::new(with_attributes(Circle::new(), shape)),
        ShapeKind::Ellipse => Box::new(with_attributes(Ellipse::new(), shape)),
        ShapeKind::Rect => Box::new(with_attributes(Rectangle::new(), shape)),
        ShapeKind::Polygon => Box::new(with_attributes(Polygon::new(), shape)),
        ShapeKind::Polyline => Box::new(with_attributes(Polyline::new(), shape)),
    }
}

/// Fixed-precision number with trailing zeros removed.
pub(crate) fn num(value: f64) -> String {
    let mut text = format!("{value:.2}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Clip;

    fn layer(name: &'static str, clipped: bool) -> SceneLayer {
        SceneLayer {
            name,
            style: vec![("fill", "#fff".to_string())],
            clipped,
            primitives: vec![Primitive::Circle { cx: 1.0, cy: 2.0, r: 3.0 }],
        }
    }

    #[test]
    fn numbers_are_fixed_precision() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(0.1234), "0.12");
        assert_eq!(num(3.10), "3.1");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(-2.5), "-2.5");
    }

    #[test]
    fn label_text_is_escaped() {
        let mut labels = layer("labels", false);
        labels.primitives = vec![Primitive::Text {
            x: 1.0,
            y: 2.0,
            class: "star".to_string(),
            content: "Alpha <1>".to_string(),
        }];
        let scene = Scene {
            width: 10,
            height: 10,
            clip: None,
            symbols: Vec::new(),
            layers: vec![labels],
        };
        let svg = write_svg(&scene);
        assert!(svg.contains("Alpha &lt;1&gt;"));
        assert!(!svg.contains("<1>"));
    }

    #[test]
    fn clipped_layers_share_one_group() {
        let scene = Scene {
            width: 10,
            height: 10,
            clip: Some(Clip { cx: 5.0, cy: 5.0, r: 4.0 }),
            symbols: Vec::new(),
            layers: vec![layer("a", false), layer("b", true), layer("c", true), layer("d", false)],
        };
        let svg = write_svg(&scene);
        assert!(svg.starts_with(XML_DECLARATION));
        assert_eq!(svg.matches("clip-path=").count(), 1);
        let clip_start = svg.find("clip-path=").unwrap();
        assert!(svg.find(r#"id="a""#).unwrap() < clip_start);
        assert!(svg.find(r#"id="b""#).unwrap() > clip_start);
        assert!(svg.contains(r#"<circle cx="1" cy="2" r="3"/>"#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn symbols_carry_icon_shapes() {
        let symbol = crate::scene::Symbol {
            id: "constellation-icon",
            view_box: [0.0, 0.0, 24.0, 24.0],
            shapes: vec![IconShape {
                kind: ShapeKind::Circle,
                attributes: vec![("r", "4".to_string()), ("transform", "translate(12 12)".to_string())],
            }],
        };
        let scene = Scene {
            width: 10,
            height: 10,
            clip: None,
            symbols: vec![symbol],
            layers: Vec::new(),
        };
        let svg = write_svg(&scene);
        assert!(svg.contains(r#"viewBox="0 0 24 24""#));
        assert!(svg.contains(r#"r="4""#));
        assert!(svg.contains(r#"transform="translate(12 12)""#));
        assert!(svg.contains("<symbol"));
    }
}
