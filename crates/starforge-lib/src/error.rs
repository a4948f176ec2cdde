use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the Starforge library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A catalog record has malformed coordinates or magnitude. The object is
    /// excluded from the render; the render itself continues.
    #[error("catalog object {id} rejected: {reason}")]
    Catalog { id: u32, reason: String },

    /// A line of a catalog or constellation file could not be parsed.
    #[error("malformed catalog record on line {line}: {message}")]
    CatalogFormat { line: usize, message: String },

    /// A configuration option is out of range. Raised before any pipeline
    /// stage runs.
    #[error("invalid configuration option {option}: {reason}")]
    Configuration { option: String, reason: String },

    /// The projection is numerically degenerate for the requested observer.
    #[error("degenerate projection: {reason}")]
    Projection { reason: String },

    /// A custom icon could not be used; the generated marker is drawn instead.
    #[error("icon {path} unavailable: {reason}")]
    Composition { path: PathBuf, reason: String },

    /// Raised when a location string matches neither coordinates nor a city.
    #[error("unknown location: {query}{}", format_suggestions(.suggestions))]
    UnknownLocation {
        query: String,
        suggestions: Vec<String>,
    },

    /// Raised when a date string matches none of the supported formats.
    #[error("could not parse date '{input}'")]
    InvalidDate { input: String },

    /// Raised when observer coordinates are out of range.
    #[error("invalid observer: {reason}")]
    InvalidObserver { reason: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for CSV parsing errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn configuration(option: &str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            option: option.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error only affects a single object and must not abort a
    /// render.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Catalog { .. } | Error::CatalogFormat { .. } | Error::Composition { .. }
        )
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_location_lists_suggestions() {
        let err = Error::UnknownLocation {
            query: "Pari".to_string(),
            suggestions: vec!["Paris, FR".to_string(), "Parma, IT".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Did you mean one of"));
        assert!(message.contains("'Paris, FR'"));
    }

    #[test]
    fn single_suggestion_is_phrased_directly() {
        let err = Error::UnknownLocation {
            query: "Tokio".to_string(),
            suggestions: vec!["Tokyo, JP".to_string()],
        };
        assert!(err.to_string().ends_with("Did you mean 'Tokyo, JP'?"));
    }

    #[test]
    fn recoverable_classification() {
        assert!(Error::Catalog {
            id: 1,
            reason: "bad".into()
        }
        .is_recoverable());
        assert!(!Error::configuration("field_of_view", "negative").is_recoverable());
    }
}
