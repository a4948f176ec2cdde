//! The render command: resolve inputs, render, write the document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use starforge_lib::{
    parse_instant, render_with_icons, resolve_location, Catalog, ChartSettings, IconSet,
    ProjectionKind, RenderConfig, RenderConfigBuilder, RenderReport, ResolvedLocation, TracingSink,
};

/// Options of a single chart render.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// City name ("Paris", "Paris, FR") or coordinates ("48.8566, 2.3522").
    pub location: String,

    /// Output SVG path; `.svg` is appended when missing.
    pub output: PathBuf,

    /// Observation date or date-time, UTC. Defaults to now.
    #[arg(short, long)]
    pub date: Option<String>,

    /// Faintest magnitude drawn.
    #[arg(short, long)]
    pub magnitude: Option<f64>,

    /// Angular diameter of the chart in degrees.
    #[arg(short, long)]
    pub fov: Option<f64>,

    /// Do not draw star or constellation names.
    #[arg(long)]
    pub no_labels: bool,

    /// Clip the chart to a disk with a border ring.
    #[arg(long)]
    pub circular: bool,

    /// Bulge the chart like a sphere, strength in [0, 1].
    #[arg(long, value_name = "STRENGTH")]
    pub sphere: Option<f64>,

    /// Canvas size in pixels, either `N` or `WxH`.
    #[arg(long, value_name = "N|WxH", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    #[arg(long, value_name = "COLOR")]
    pub bg_color: Option<String>,

    #[arg(long, value_name = "COLOR")]
    pub star_color: Option<String>,

    #[arg(long, value_name = "COLOR")]
    pub line_color: Option<String>,

    #[arg(long, value_name = "COLOR")]
    pub label_color: Option<String>,

    /// Scatter this many decorative stars over the chart.
    #[arg(long, value_name = "COUNT")]
    pub procedural_stars: Option<u32>,

    /// Crop to the canvas rectangle `X1,Y1,X2,Y2` in pixels.
    #[arg(long, value_name = "X1,Y1,X2,Y2", value_parser = parse_bounds)]
    pub bounds: Option<(f64, f64, f64, f64)>,

    /// stereographic or equidistant.
    #[arg(long)]
    pub projection: Option<ProjectionKind>,

    /// SVG drawn in place of constellation star markers.
    #[arg(long, value_name = "SVG")]
    pub constellation_icon: Option<PathBuf>,

    /// SVG drawn in place of field star markers.
    #[arg(long, value_name = "SVG")]
    pub background_icon: Option<PathBuf>,

    /// Star catalog CSV; the bundled bright-star catalog when absent.
    #[arg(long, value_name = "CSV")]
    pub catalog: Option<PathBuf>,

    /// Constellation lines in constellationship.fab format; bundled when absent.
    #[arg(long, value_name = "FAB")]
    pub lines: Option<PathBuf>,

    /// JSON chart settings used as the base; flags override them.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

/// What a successful render produced.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub path: PathBuf,
    pub location: ResolvedLocation,
    pub instant: DateTime<Utc>,
    /// Records skipped while loading the catalog and figures.
    pub load_rejections: usize,
    pub report: RenderReport,
}

pub fn run(args: &RenderArgs) -> Result<RenderOutcome> {
    let instant = match args.date.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };
    let location = resolve_location(&args.location)?;
    let observer = location.observer(instant)?;
    info!(location = %location.label, %instant, "resolved observer");

    let config = build_config(args)?;

    let loaded = Catalog::load(args.catalog.as_deref(), args.lines.as_deref())
        .context("failed to load star catalog")?;
    for rejection in &loaded.rejected {
        warn!(error = %rejection, "skipped catalog record");
    }
    let icons = IconSet::load(&config.icons);

    let output = render_with_icons(&loaded.catalog, &observer, &config, &icons, Some(&TracingSink))
        .context("failed to render chart")?;

    let path = svg_path(&args.output);
    write_document(&path, output.svg.as_bytes())?;
    info!(path = %path.display(), bytes = output.svg.len(), "wrote chart");

    Ok(RenderOutcome {
        path,
        location,
        instant,
        load_rejections: loaded.rejected.len(),
        report: output.report,
    })
}

/// Merge the base settings file with command-line overrides.
pub fn build_config(args: &RenderArgs) -> Result<RenderConfig> {
    let base = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            serde_json::from_str::<ChartSettings>(&raw)
                .with_context(|| format!("failed to parse settings in {}", path.display()))?
        }
        None => ChartSettings::default(),
    };

    let mut builder = RenderConfigBuilder::from_settings(base);
    if let Some(fov) = args.fov {
        builder = builder.with_field_of_view(fov);
    }
    if let Some(magnitude) = args.magnitude {
        builder = builder.with_magnitude_limit(magnitude);
    }
    if args.no_labels {
        builder = builder.with_labels(false);
    }
    if args.circular {
        builder = builder.with_circular_mask(true);
    }
    if let Some(strength) = args.sphere {
        builder = builder.with_sphere_effect(strength);
    }
    if let Some((width, height)) = args.size {
        builder = builder.with_size(width, height);
    }
    if let Some(color) = &args.bg_color {
        builder = builder.with_background_color(color.as_str());
    }
    if let Some(color) = &args.star_color {
        builder = builder.with_star_color(color.as_str());
    }
    if let Some(color) = &args.line_color {
        builder = builder.with_line_color(color.as_str());
    }
    if let Some(color) = &args.label_color {
        builder = builder.with_label_color(color.as_str());
    }
    if let Some(count) = args.procedural_stars {
        builder = builder.with_procedural_stars(count);
    }
    if let Some((x1, y1, x2, y2)) = args.bounds {
        builder = builder.with_bounds(x1, y1, x2, y2);
    }
    if let Some(kind) = args.projection {
        builder = builder.with_projection(kind);
    }
    if let Some(path) = &args.constellation_icon {
        builder = builder.with_constellation_icon(path.clone());
    }
    if let Some(path) = &args.background_icon {
        builder = builder.with_background_icon(path.clone());
    }

    let config = builder.build().context("invalid chart settings")?;
    debug!(seed = config.seed(), "chart settings validated");
    Ok(config)
}

/// `path` with `.svg` appended unless it already ends in `.svg`.
pub fn svg_path(path: &Path) -> PathBuf {
    let has_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if has_svg {
        path.to_path_buf()
    } else {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(".svg");
        PathBuf::from(raw)
    }
}

/// Parse `N` (square) or `WxH`.
pub fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let raw = raw.trim();
    let (width, height) = match raw.split_once(['x', 'X']) {
        Some((w, h)) => (w.trim(), h.trim()),
        None => (raw, raw),
    };
    let width: u32 = width
        .parse()
        .with_context(|| format!("invalid width in size '{raw}'"))?;
    let height: u32 = height
        .parse()
        .with_context(|| format!("invalid height in size '{raw}'"))?;
    if width == 0 || height == 0 {
        bail!("size '{raw}' must be positive");
    }
    Ok((width, height))
}

/// Parse `X1,Y1,X2,Y2`. Ordering is checked when the settings are validated.
pub fn parse_bounds(raw: &str) -> Result<(f64, f64, f64, f64)> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid coordinate '{}' in bounds '{raw}'", part.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    match values[..] {
        [x1, y1, x2, y2] => Ok((x1, y1, x2, y2)),
        _ => bail!("bounds '{raw}' needs four comma-separated values"),
    }
}

/// Write through a temporary file in the target directory so a failed write
/// never leaves a partial document behind.
fn write_document(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    Ok(())
}
