//! Custom SVG marker icons.
//!
//! Icon files are parsed as XML. Basic shapes are kept with their geometry
//! and the transforms of the groups around them; the chart applies its own
//! fill color. Anything else that would draw (text, images, references,
//! nested documents) makes the icon unusable, so a partly supported icon is
//! never drawn half-empty.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, warn};

use crate::config::IconRefs;
use crate::error::{Error, Result};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Elements that never draw anything themselves.
const NON_RENDERING: &[&str] = &["title", "desc", "metadata", "defs", "style"];

/// Geometry and transform values: numbers, path commands and transform
/// functions. Rejects anything that could break out of an attribute.
static SAFE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z.,+\-\s()%]*$").expect("valid attribute regex"));

/// Drawable element kinds an icon may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Path,
    Circle,
    Ellipse,
    Rect,
    Polygon,
    Polyline,
}

impl ShapeKind {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "path" => ShapeKind::Path,
            "circle" => ShapeKind::Circle,
            "ellipse" => ShapeKind::Ellipse,
            "rect" => ShapeKind::Rect,
            "polygon" => ShapeKind::Polygon,
            "polyline" => ShapeKind::Polyline,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            ShapeKind::Path => "path",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Rect => "rect",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Polyline => "polyline",
        }
    }

    fn geometry(self) -> &'static [&'static str] {
        match self {
            ShapeKind::Path => &["d"],
            ShapeKind::Circle => &["cx", "cy", "r"],
            ShapeKind::Ellipse => &["cx", "cy", "rx", "ry"],
            ShapeKind::Rect => &["x", "y", "width", "height", "rx", "ry"],
            ShapeKind::Polygon | ShapeKind::Polyline => &["points"],
        }
    }

    /// Attributes without which the element draws nothing.
    fn required(self) -> &'static [&'static str] {
        match self {
            ShapeKind::Path => &["d"],
            ShapeKind::Circle => &["r"],
            ShapeKind::Ellipse => &["rx", "ry"],
            ShapeKind::Rect => &["width", "height"],
            ShapeKind::Polygon | ShapeKind::Polyline => &["points"],
        }
    }
}

/// One drawable element of an icon.
#[derive(Debug, Clone, PartialEq)]
pub struct IconShape {
    pub kind: ShapeKind,
    /// Geometry attributes followed by the composed `transform`, if any.
    pub attributes: Vec<(&'static str, String)>,
}

/// Vector shape drawn in place of a generated star marker.
#[derive(Debug, Clone, PartialEq)]
pub struct StarIcon {
    pub source: PathBuf,
    /// `min-x min-y width height`.
    pub view_box: [f64; 4],
    pub shapes: Vec<IconShape>,
}

fn composition(path: &Path, reason: impl Into<String>) -> Error {
    Error::Composition {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

impl StarIcon {
    /// Read an icon from an SVG file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|err| composition(path, err.to_string()))?;
        let icon = Self::parse(&source, path)?;
        debug!(path = %path.display(), shapes = icon.shapes.len(), "loaded icon");
        Ok(icon)
    }

    /// Parse an SVG document into its drawable shapes.
    pub fn parse(svg: &str, path: &Path) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(svg, options)
            .map_err(|err| composition(path, format!("invalid XML: {err}")))?;
        let root = document.root_element();
        if root.tag_name().name() != "svg" {
            return Err(composition(
                path,
                format!("root element is <{}>, not <svg>", root.tag_name().name()),
            ));
        }

        let view_box = match root.attribute("viewBox") {
            Some(raw) => parse_view_box(raw).ok_or_else(|| composition(path, "malformed viewBox"))?,
            None => match (length(root.attribute("width")), length(root.attribute("height"))) {
                (Some(w), Some(h)) if w > 0.0 && h > 0.0 => [0.0, 0.0, w, h],
                _ => return Err(composition(path, "missing viewBox and size attributes")),
            },
        };

        let mut shapes = Vec::new();
        collect_shapes(root, None, &mut shapes, path)?;
        if shapes.is_empty() {
            return Err(composition(path, "no drawable shapes"));
        }

        Ok(Self {
            source: path.to_path_buf(),
            view_box,
            shapes,
        })
    }
}

fn collect_shapes(
    parent: Node<'_, '_>,
    transform: Option<&str>,
    shapes: &mut Vec<IconShape>,
    path: &Path,
) -> Result<()> {
    for node in parent.children().filter(|node| node.is_element()) {
        let name = node.tag_name();
        // Editor metadata (Inkscape, Sodipodi) lives in foreign namespaces.
        if name.namespace().is_some_and(|ns| ns != SVG_NAMESPACE) {
            continue;
        }
        let tag = name.name();
        if NON_RENDERING.contains(&tag) {
            continue;
        }

        let own = match node.attribute("transform") {
            Some(value) => Some(safe_value(value, tag, "transform", path)?),
            None => None,
        };
        let composed = match (transform, own) {
            (Some(outer), Some(inner)) => Some(format!("{outer} {inner}")),
            (outer, inner) => inner.or_else(|| outer.map(str::to_string)),
        };

        if tag == "g" {
            collect_shapes(node, composed.as_deref(), shapes, path)?;
            continue;
        }
        let Some(kind) = ShapeKind::from_tag(tag) else {
            return Err(composition(path, format!("unsupported element <{tag}>")));
        };

        for required in kind.required() {
            let present = node
                .attribute(*required)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(composition(path, format!("<{tag}> without {required}")));
            }
        }
        let mut attributes = Vec::with_capacity(kind.geometry().len() + 1);
        for &attribute in kind.geometry() {
            if let Some(value) = node.attribute(attribute) {
                attributes.push((attribute, safe_value(value, tag, attribute, path)?));
            }
        }
        if let Some(transform) = composed {
            attributes.push(("transform", transform));
        }
        shapes.push(IconShape { kind, attributes });
    }
    Ok(())
}

fn safe_value(value: &str, tag: &str, attribute: &str, path: &Path) -> Result<String> {
    let value = value.trim();
    if SAFE_VALUE.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(composition(path, format!("unsupported {attribute} on <{tag}>")))
    }
}

fn length(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    raw.strip_suffix("px").unwrap_or(raw).trim().parse().ok()
}

fn parse_view_box(raw: &str) -> Option<[f64; 4]> {
    let values: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match values.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Some([*x, *y, *w, *h]),
        _ => None,
    }
}

/// Icons configured for a render, with any that failed to load.
#[derive(Debug, Default)]
pub struct IconSet {
    pub constellation: Option<StarIcon>,
    pub background: Option<StarIcon>,
    /// Icons that could not be used; the generated marker is drawn instead.
    pub failures: Vec<Error>,
}

impl IconSet {
    /// Load every configured icon. Failures never abort; they are kept for
    /// reporting.
    pub fn load(refs: &IconRefs) -> Self {
        let mut set = IconSet::default();
        let mut load = |path: &Option<PathBuf>| match path {
            Some(path) => match StarIcon::load(path) {
                Ok(icon) => Some(icon),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "icon unavailable");
                    set.failures.push(err);
                    None
                }
            },
            None => None,
        };
        let constellation = load(&refs.constellation);
        let background = load(&refs.background);
        set.constellation = constellation;
        set.background = background;
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STAR: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24">
  <path d="M12 2 L15 9 L22 9 L16 14 L18 21 L12 17 L6 21 L8 14 L2 9 L9 9 Z"/>
</svg>"#;

    fn parse(svg: &str) -> Result<StarIcon> {
        StarIcon::parse(svg, Path::new("icon.svg"))
    }

    fn reason(err: Error) -> String {
        match err {
            Error::Composition { reason, .. } => reason,
            other => panic!("expected a composition error, got {other:?}"),
        }
    }

    #[test]
    fn parses_view_box_and_paths() {
        let icon = parse(STAR).unwrap();
        assert_eq!(icon.view_box, [0.0, 0.0, 24.0, 24.0]);
        assert_eq!(icon.shapes.len(), 1);
        assert_eq!(icon.shapes[0].kind, ShapeKind::Path);
        assert!(icon.shapes[0].attributes[0].1.starts_with("M12 2"));
    }

    #[test]
    fn falls_back_to_size_attributes() {
        let icon = parse(r#"<svg width="32" height="16px"><path d="M0 0 L1 1"/></svg>"#).unwrap();
        assert_eq!(icon.view_box, [0.0, 0.0, 32.0, 16.0]);
    }

    #[test]
    fn keeps_basic_shapes_with_group_transforms() {
        let icon = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <g transform="translate(5 5)">
    <circle r="2"/>
    <rect x="-1" y="-1" width="2" height="2" transform="rotate(45)"/>
  </g>
  <polygon points="0,0 2,0 1,2"/>
</svg>"#,
        )
        .unwrap();

        let kinds: Vec<_> = icon.shapes.iter().map(|shape| shape.kind).collect();
        assert_eq!(kinds, vec![ShapeKind::Circle, ShapeKind::Rect, ShapeKind::Polygon]);
        assert_eq!(
            icon.shapes[0].attributes,
            vec![("r", "2".to_string()), ("transform", "translate(5 5)".to_string())]
        );
        assert_eq!(
            icon.shapes[1].attributes.last(),
            Some(&("transform", "translate(5 5) rotate(45)".to_string()))
        );
        assert_eq!(icon.shapes[2].attributes, vec![("points", "0,0 2,0 1,2".to_string())]);
    }

    #[test]
    fn ignores_comments_cdata_and_editor_metadata() {
        let icon = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"
     xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd"
     viewBox="0 0 4 4">
  <!-- <path d="M0 0 L4 4"/> -->
  <title>star</title>
  <style><![CDATA[ path { fill: red } ]]></style>
  <sodipodi:namedview/>
  <circle cx="2" cy="2" r="1"/>
</svg>"#,
        )
        .unwrap();
        assert_eq!(icon.shapes.len(), 1);
        assert_eq!(icon.shapes[0].kind, ShapeKind::Circle);
    }

    #[test]
    fn unsupported_content_is_rejected() {
        let text = parse(r#"<svg viewBox="0 0 4 4"><circle r="1"/><text>*</text></svg>"#);
        assert_eq!(reason(text.unwrap_err()), "unsupported element <text>");

        let reference = parse(r##"<svg viewBox="0 0 4 4"><use href="#a"/></svg>"##);
        assert_eq!(reason(reference.unwrap_err()), "unsupported element <use>");

        let radiusless = parse(r#"<svg viewBox="0 0 4 4"><circle cx="1"/></svg>"#);
        assert_eq!(reason(radiusless.unwrap_err()), "<circle> without r");
    }

    #[test]
    fn rejects_icons_without_shapes() {
        let err = parse(r#"<svg viewBox="0 0 1 1"><title>empty</title></svg>"#).unwrap_err();
        assert_eq!(reason(err), "no drawable shapes");
        assert!(parse("<svg viewBox=").is_err());
        assert!(parse(r#"<html><path d="M0 0"/></html>"#).is_err());
    }

    #[test]
    fn icon_set_records_failures() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STAR.as_bytes()).unwrap();
        let refs = IconRefs {
            constellation: Some(file.path().to_path_buf()),
            background: Some(PathBuf::from("/definitely/missing/icon.svg")),
        };
        let set = IconSet::load(&refs);
        assert!(set.constellation.is_some());
        assert!(set.background.is_none());
        assert_eq!(set.failures.len(), 1);
        assert!(set.failures[0].is_recoverable());
    }
}
