//! Terminal styling for the summary printed after a render.

/// ANSI escape codes.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    /// Bright bold white for headings and the output path.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    pub const GRAY: &str = "\x1b[90m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
}

/// Resolved color codes, either ANSI sequences or empty strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub heading: &'static str,
    pub muted: &'static str,
    pub value: &'static str,
    pub ok: &'static str,
    pub warn: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            heading: colors::WHITE_BOLD,
            muted: colors::GRAY,
            value: colors::CYAN,
            ok: colors::GREEN,
            warn: colors::YELLOW,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            heading: "",
            muted: "",
            value: "",
            ok: "",
            warn: "",
        }
    }

    /// `colored()` when the terminal accepts ANSI codes, `plain()` otherwise.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Whether ANSI colors should be used.
///
/// Respects `NO_COLOR` (<https://no-color.org/>) and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.eq_ignore_ascii_case("dumb") {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_palette_is_empty() {
        let palette = ColorPalette::plain();
        for code in [
            palette.reset,
            palette.heading,
            palette.muted,
            palette.value,
            palette.ok,
            palette.warn,
        ] {
            assert!(code.is_empty());
        }
    }

    #[test]
    fn colored_palette_uses_escape_codes() {
        let palette = ColorPalette::colored();
        assert!(palette.heading.starts_with("\x1b["));
        assert_eq!(palette.reset, colors::RESET);
    }
}
