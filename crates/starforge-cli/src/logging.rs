//! Logging setup for the CLI.
//!
//! Logs go to stderr so stdout stays reserved for the render summary. When
//! `RUST_LOG` is set it decides the filter and the `--quiet`/`--verbose`
//! flags are ignored.

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::terminal::supports_color;

/// Handle to the installed subscriber's filter.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Replace the active level. No-op when `RUST_LOG` configured the filter.
    pub fn set_level(&self, level: LevelFilter) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        self.filter
            .reload(filter_for(level))
            .context("failed to update log level")
    }
}

/// Install the global subscriber at `initial` level.
///
/// A second call leaves the first subscriber in place; the returned handle
/// then controls a filter nobody listens to.
pub fn init_logging(initial: LevelFilter) -> LogHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (filter_for(initial), false),
    };
    let (filter_layer, filter) = reload::Layer::new(filter);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(supports_color())
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();

    LogHandle { filter, from_env }
}

/// Level selected by the `--quiet` and `--verbose` flags.
pub fn level_for(quiet: bool, verbose: u8) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn filter_for(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(level_for(true, 2), LevelFilter::ERROR);
    }

    #[test]
    fn verbosity_steps() {
        assert_eq!(level_for(false, 0), LevelFilter::INFO);
        assert_eq!(level_for(false, 1), LevelFilter::DEBUG);
        assert_eq!(level_for(false, 5), LevelFilter::TRACE);
    }
}
