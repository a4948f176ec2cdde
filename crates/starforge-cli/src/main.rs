use std::io;
use std::time::Instant;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing::level_filters::LevelFilter;

use starforge_cli::commands::render::{self, RenderArgs};
use starforge_cli::logging::{init_logging, level_for};
use starforge_cli::output::{write_summary, OutputFormat, RenderSummary};
use starforge_cli::terminal::ColorPalette;

#[derive(Parser, Debug)]
#[command(
    name = "starforge",
    author,
    version,
    about = "Render sky-accurate star charts as SVG",
    after_help = "Examples:\n  starforge Paris chart.svg\n  starforge \"26.9124, 75.7873\" jaipur --date 2024-06-15 --fov 60\n  starforge \"New York\" nyc.svg --magnitude 5 --no-labels --circular"
)]
struct Cli {
    #[command(flatten)]
    render: RenderArgs,

    /// Summary format on stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only report errors; no text summary.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// More log output; repeat for trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let logging = init_logging(LevelFilter::WARN);
    let cli = Cli::parse();
    logging.set_level(level_for(cli.quiet, cli.verbose))?;

    let started = Instant::now();
    let outcome = render::run(&cli.render)?;
    let summary = RenderSummary::new(outcome, started.elapsed());

    if cli.quiet && cli.format == OutputFormat::Text {
        return Ok(());
    }
    write_summary(&mut io::stdout().lock(), &summary, cli.format, ColorPalette::detect())
}
