//! Error types for cardfeed.
//!
//! Library crates use [`CardfeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all cardfeed operations.
#[derive(Debug, thiserror::Error)]
pub enum CardfeedError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure talking to the automation endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// The automation endpoint answered with an error or a malformed envelope.
    #[error("AnkiConnect error for action={action}: {message}")]
    Protocol { action: String, message: String },

    /// Front-matter or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad id, refused overwrite, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A note is missing a required metadata key.
    #[error("missing required '{key}' in {path:?}")]
    MissingField { key: String, path: PathBuf },

    /// A TSV input lacks required columns.
    #[error("missing required TSV columns {columns:?} in {path:?}")]
    MissingColumns { columns: Vec<String>, path: PathBuf },

    /// None of the input paths or globs resolved to a file.
    #[error("no input files found")]
    NoInputs,

    /// TSV reading or writing error.
    #[error("TSV error: {0}")]
    Csv(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CardfeedError>;

impl CardfeedError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a protocol error for a named action.
    pub fn protocol(action: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Protocol {
            action: action.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error comes from bad input (metadata, columns, paths, values).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::MissingColumns { .. }
                | Self::NoInputs
                | Self::Io { .. }
                | Self::Validation { .. }
                | Self::Parse { .. }
                | Self::Csv(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CardfeedError::config("bad url");
        assert_eq!(err.to_string(), "config error: bad url");

        let err = CardfeedError::MissingField {
            key: "anki.deck".into(),
            path: PathBuf::from("notes/a.md"),
        };
        assert!(err.to_string().contains("'anki.deck'"));
        assert!(err.to_string().contains("notes/a.md"));
    }

    #[test]
    fn protocol_error_names_action() {
        let err = CardfeedError::protocol("findNotes", "collection is not available");
        assert_eq!(
            err.to_string(),
            "AnkiConnect error for action=findNotes: collection is not available"
        );
    }

    #[test]
    fn input_error_classification() {
        assert!(CardfeedError::NoInputs.is_input_error());
        assert!(
            CardfeedError::MissingColumns {
                columns: vec!["noteId".into()],
                path: PathBuf::from("x.tsv"),
            }
            .is_input_error()
        );
        assert!(!CardfeedError::Network("timeout".into()).is_input_error());
    }
}
