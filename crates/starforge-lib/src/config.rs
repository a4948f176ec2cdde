//! Chart configuration.
//!
//! [`ChartSettings`] is the plain, serializable option set. It is edited
//! through [`RenderConfigBuilder`] and frozen by [`RenderConfigBuilder::build`],
//! which validates every option and returns a read-only [`RenderConfig`].
//! Nothing downstream of `build` re-validates.

use std::ops::Deref;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::declutter::AnchorPolicy;
use crate::error::{Error, Result};
use crate::projection::ProjectionKind;

/// Hex colors (`#rgb`, `#rrggbb`) or a plain CSS color keyword.
static COLOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}|[a-zA-Z]+)$").expect("valid color regex")
});

/// Colors of the chart elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: String,
    pub stars: String,
    pub lines: String,
    pub labels: String,
    pub border: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            stars: "#ffffff".to_string(),
            lines: "#ffffff".to_string(),
            labels: "#ffcc00".to_string(),
            border: "#ffffff".to_string(),
        }
    }
}

/// Nominal marker sizes in pixels (diameter of a magnitude 3 star).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarSizes {
    pub constellation: f64,
    pub background: f64,
}

impl Default for StarSizes {
    fn default() -> Self {
        Self {
            constellation: 14.0,
            background: 7.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    pub width: f64,
    pub opacity: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 0.8,
            opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub font_size: f64,
    pub font_family: String,
    pub opacity: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_family: "Arial, sans-serif".to_string(),
            opacity: 0.9,
        }
    }
}

/// Decorative scatter of small stars that are not in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralStars {
    pub enabled: bool,
    pub count: u32,
    /// Nominal marker diameter in pixels.
    pub size: f64,
}

impl Default for ProceduralStars {
    fn default() -> Self {
        Self {
            enabled: false,
            count: 300,
            size: 0.8,
        }
    }
}

/// Custom SVG icons replacing the generated markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconRefs {
    pub constellation: Option<PathBuf>,
    pub background: Option<PathBuf>,
}

/// Direction at the center of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewCenter {
    pub altitude: f64,
    pub azimuth: f64,
}

impl Default for ViewCenter {
    fn default() -> Self {
        Self {
            altitude: 90.0,
            azimuth: 180.0,
        }
    }
}

/// Crop rectangle in pixels, corners inclusive. Stars, edges, procedural
/// stars and labels outside it are not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropBounds {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CropBounds {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x1..=self.x2).contains(&x) && (self.y1..=self.y2).contains(&y)
    }
}

/// Every chart option, unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Angular diameter of the chart in degrees.
    pub field_of_view: f64,
    /// Faintest magnitude drawn.
    pub magnitude_limit: f64,
    pub labels: bool,
    /// Faintest magnitude that gets a name label.
    pub label_magnitude_limit: f64,
    pub circular_mask: bool,
    pub sphere_effect: bool,
    pub sphere_strength: f64,
    pub edge_bend: f64,
    pub width: u32,
    pub height: u32,
    pub border_width: f64,
    pub palette: Palette,
    pub star_size: StarSizes,
    pub line_style: LineStyle,
    pub label_style: LabelStyle,
    pub procedural: ProceduralStars,
    pub icons: IconRefs,
    /// Drop objects below the horizon.
    pub horizon_clipping: bool,
    pub projection: ProjectionKind,
    pub view_center: ViewCenter,
    pub anchors: AnchorPolicy,
    /// Cropped render; the whole canvas when absent.
    pub bounds: Option<CropBounds>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            field_of_view: 90.0,
            magnitude_limit: 6.0,
            labels: true,
            label_magnitude_limit: 2.0,
            circular_mask: false,
            sphere_effect: false,
            sphere_strength: 0.0,
            edge_bend: 0.0,
            width: 1000,
            height: 1000,
            border_width: 2.0,
            palette: Palette::default(),
            star_size: StarSizes::default(),
            line_style: LineStyle::default(),
            label_style: LabelStyle::default(),
            procedural: ProceduralStars::default(),
            icons: IconRefs::default(),
            horizon_clipping: true,
            projection: ProjectionKind::default(),
            view_center: ViewCenter::default(),
            anchors: AnchorPolicy::default(),
            bounds: None,
        }
    }
}

impl ChartSettings {
    /// Check every option, reporting the first one out of range.
    pub fn validate(&self) -> Result<()> {
        range("field_of_view", self.field_of_view, |v| v > 0.0 && v <= 360.0, "(0, 360]")?;
        range("magnitude_limit", self.magnitude_limit, |v| v > 0.0, "> 0")?;
        finite("label_magnitude_limit", self.label_magnitude_limit)?;
        range("sphere_strength", self.sphere_strength, |v| (0.0..=1.0).contains(&v), "[0, 1]")?;
        range("edge_bend", self.edge_bend, |v| (0.0..=0.2).contains(&v), "[0, 0.2]")?;

        if self.width == 0 || self.height == 0 {
            return Err(Error::configuration(
                "size",
                format!("{}x{} must be positive in both dimensions", self.width, self.height),
            ));
        }
        let half_side = f64::from(self.width.min(self.height)) / 2.0;
        range("border_width", self.border_width, |v| v >= 0.0 && v < half_side, "[0, half the shorter side)")?;

        for (option, color) in [
            ("palette.background", &self.palette.background),
            ("palette.stars", &self.palette.stars),
            ("palette.lines", &self.palette.lines),
            ("palette.labels", &self.palette.labels),
            ("palette.border", &self.palette.border),
        ] {
            if !COLOR_PATTERN.is_match(color) {
                return Err(Error::configuration(
                    option,
                    format!("'{color}' is not a hex color or color name"),
                ));
            }
        }

        range("star_size.constellation", self.star_size.constellation, |v| v > 0.0, "> 0")?;
        range("star_size.background", self.star_size.background, |v| v > 0.0, "> 0")?;
        range("line_style.width", self.line_style.width, |v| v >= 0.0, ">= 0")?;
        range("line_style.opacity", self.line_style.opacity, unit, "[0, 1]")?;
        range("label_style.font_size", self.label_style.font_size, |v| v > 0.0, "> 0")?;
        range("label_style.opacity", self.label_style.opacity, unit, "[0, 1]")?;
        if self.label_style.font_family.contains(['<', '>', '"', '&']) {
            return Err(Error::configuration(
                "label_style.font_family",
                "must not contain markup characters",
            ));
        }
        range("procedural.size", self.procedural.size, |v| v > 0.0, "> 0")?;
        range("view_center.altitude", self.view_center.altitude, |v| (-90.0..=90.0).contains(&v), "[-90, 90]")?;
        range("view_center.azimuth", self.view_center.azimuth, |v| (0.0..360.0).contains(&v), "[0, 360)")?;

        if self.anchors.star.is_empty() || self.anchors.constellation.is_empty() {
            return Err(Error::configuration("anchors", "anchor lists must not be empty"));
        }
        range("anchors.padding", self.anchors.padding, |v| v >= 0.0, ">= 0")?;

        if let Some(bounds) = &self.bounds {
            for value in [bounds.x1, bounds.y1, bounds.x2, bounds.y2] {
                finite("bounds", value)?;
            }
            if bounds.x1 >= bounds.x2 || bounds.y1 >= bounds.y2 {
                return Err(Error::configuration(
                    "bounds",
                    format!(
                        "({}, {}) must be above and left of ({}, {})",
                        bounds.x1, bounds.y1, bounds.x2, bounds.y2
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn finite(option: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::configuration(option, format!("{value} is not finite")))
    }
}

fn range(option: &str, value: f64, accept: impl Fn(f64) -> bool, expected: &str) -> Result<()> {
    finite(option, value)?;
    if accept(value) {
        Ok(())
    } else {
        Err(Error::configuration(
            option,
            format!("{value} outside {expected}"),
        ))
    }
}

/// Mutable configuration under construction.
#[derive(Debug, Clone, Default)]
pub struct RenderConfigBuilder {
    settings: ChartSettings,
}

impl RenderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing settings, e.g. loaded from a JSON file.
    pub fn from_settings(settings: ChartSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }

    pub fn with_field_of_view(mut self, degrees: f64) -> Self {
        self.settings.field_of_view = degrees;
        self
    }

    pub fn with_magnitude_limit(mut self, magnitude: f64) -> Self {
        self.settings.magnitude_limit = magnitude;
        self
    }

    pub fn with_labels(mut self, enabled: bool) -> Self {
        self.settings.labels = enabled;
        self
    }

    pub fn with_label_magnitude_limit(mut self, magnitude: f64) -> Self {
        self.settings.label_magnitude_limit = magnitude;
        self
    }

    pub fn with_circular_mask(mut self, enabled: bool) -> Self {
        self.settings.circular_mask = enabled;
        self
    }

    /// Enable the sphere effect at the given strength.
    pub fn with_sphere_effect(mut self, strength: f64) -> Self {
        self.settings.sphere_effect = true;
        self.settings.sphere_strength = strength;
        self
    }

    pub fn with_edge_bend(mut self, bend: f64) -> Self {
        self.settings.edge_bend = bend;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.settings.width = width;
        self.settings.height = height;
        self
    }

    pub fn with_border_width(mut self, width: f64) -> Self {
        self.settings.border_width = width;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.settings.palette = palette;
        self
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.settings.palette.background = color.into();
        self
    }

    pub fn with_star_color(mut self, color: impl Into<String>) -> Self {
        self.settings.palette.stars = color.into();
        self
    }

    pub fn with_line_color(mut self, color: impl Into<String>) -> Self {
        self.settings.palette.lines = color.into();
        self
    }

    pub fn with_label_color(mut self, color: impl Into<String>) -> Self {
        self.settings.palette.labels = color.into();
        self
    }

    pub fn with_star_sizes(mut self, sizes: StarSizes) -> Self {
        self.settings.star_size = sizes;
        self
    }

    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.settings.line_style = style;
        self
    }

    pub fn with_label_style(mut self, style: LabelStyle) -> Self {
        self.settings.label_style = style;
        self
    }

    /// Enable procedural background stars.
    pub fn with_procedural_stars(mut self, count: u32) -> Self {
        self.settings.procedural.enabled = true;
        self.settings.procedural.count = count;
        self
    }

    pub fn with_constellation_icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.icons.constellation = Some(path.into());
        self
    }

    pub fn with_background_icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.icons.background = Some(path.into());
        self
    }

    pub fn with_horizon_clipping(mut self, enabled: bool) -> Self {
        self.settings.horizon_clipping = enabled;
        self
    }

    pub fn with_projection(mut self, kind: ProjectionKind) -> Self {
        self.settings.projection = kind;
        self
    }

    pub fn with_view_center(mut self, altitude: f64, azimuth: f64) -> Self {
        self.settings.view_center = ViewCenter { altitude, azimuth };
        self
    }

    /// Only draw content inside the rectangle `(x1, y1)`–`(x2, y2)`.
    pub fn with_bounds(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.settings.bounds = Some(CropBounds { x1, y1, x2, y2 });
        self
    }

    pub fn with_anchor_policy(mut self, policy: AnchorPolicy) -> Self {
        self.settings.anchors = policy;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<RenderConfig> {
        self.settings.validate()?;
        let digest = Sha256::digest(serde_json::to_vec(&self.settings)?);
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        Ok(RenderConfig {
            settings: self.settings,
            seed: u64::from_le_bytes(seed_bytes),
        })
    }
}

/// Validated, read-only configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    settings: ChartSettings,
    seed: u64,
}

impl RenderConfig {
    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }

    /// Seed for procedural content, derived from a SHA-256 digest of the
    /// serialized settings. Identical settings give identical seeds.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Radius of the drawable chart disk in pixels.
    pub fn chart_radius(&self) -> f64 {
        f64::from(self.settings.width.min(self.settings.height)) / 2.0 - self.settings.border_width
    }

    /// Start a new builder from these settings.
    pub fn to_builder(&self) -> RenderConfigBuilder {
        RenderConfigBuilder::from_settings(self.settings.clone())
    }
}

impl Deref for RenderConfig {
    type Target = ChartSettings;

    fn deref(&self) -> &Self::Target {
        &self.settings
    }
}
