//! Error types for the viewer core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, exporting or configuring the viewer.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Failed to read or write a file.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but does not have the expected top-level shape.
    #[error("Invalid results file: {0}")]
    Validation(String),

    /// The configuration document could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// The ontology definitions file could not be parsed.
    #[error("Ontology parse error at line {line}: {message}")]
    Ontology { line: usize, message: String },

    /// Writing an export failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A cell overlay could not be constructed.
    #[error("Widget construction failed for row {row}, column {column}: {message}")]
    Widget {
        row: usize,
        column: usize,
        message: String,
    },
}

impl ViewerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ViewerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for ViewerError {
    fn from(e: csv::Error) -> Self {
        ViewerError::Export(e.to_string())
    }
}

/// Result type alias for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
