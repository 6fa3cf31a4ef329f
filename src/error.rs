//! Error taxonomy for the movies ETL run.
//!
//! Every failure is fatal for the run. The variants exist so callers (and the
//! logs) can tell *where* the run died:
//!
//! ```
//! use movies_etl::error::EtlError;
//!
//! fn describe(err: &EtlError) -> &'static str {
//!     match err {
//!         EtlError::SourceUnavailable { .. } | EtlError::SchemaMismatch { .. } => "load",
//!         EtlError::UnknownDirector(_) => "crew resolution",
//!         EtlError::SinkWrite { .. } => "output",
//!         _ => "other",
//!     }
//! }
//! ```
//!
//! `From` conversions let `?` lift polars, I/O and JSON errors, and the
//! [`ResultExt`] trait prefixes a message onto any of them:
//!
//! ```no_run
//! use movies_etl::error::ResultExt as _;
//!
//! fn read_settings() -> movies_etl::error::Result<String> {
//!     std::fs::read_to_string("etl.json").context("Failed to read settings")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for ETL operations.
#[derive(Debug)]
pub enum EtlError {
    /// A configured source could not be opened, downloaded or decoded.
    SourceUnavailable { source: String, detail: String },

    /// A required column is missing from a loaded source.
    SchemaMismatch { source: String, column: String },

    /// A director id from the crew data has no entry in the name lookup.
    UnknownDirector(String),

    /// The output file could not be written.
    SinkWrite { path: PathBuf, detail: String },

    /// Invalid or unreadable configuration
    Config(String),

    /// Polars failures inside a transform
    DataProcessing(String),

    /// I/O errors not attributable to a source or the sink
    Io(std::io::Error),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { source, detail } => {
                write!(f, "Source '{source}' unavailable: {detail}")
            }
            Self::SchemaMismatch { source, column } => {
                write!(f, "Source '{source}' is missing required column '{column}'")
            }
            Self::UnknownDirector(id) => write!(f, "Unknown director id: {id}"),
            Self::SinkWrite { path, detail } => {
                write!(f, "Failed to write output {}: {detail}", path.display())
            }
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for EtlError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EtlError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap(msg.into(), e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(f(), e.into()))
    }
}

// Typed variants keep their identity so callers can still match on them.
fn wrap(msg: String, err: EtlError) -> EtlError {
    match err {
        EtlError::DataProcessing(inner) => EtlError::DataProcessing(format!("{msg}: {inner}")),
        EtlError::Config(inner) => EtlError::Config(format!("{msg}: {inner}")),
        EtlError::Io(inner) => EtlError::Other(format!("{msg}: I/O error: {inner}")),
        EtlError::Other(inner) => EtlError::Other(format!("{msg}: {inner}")),
        typed => typed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EtlError::SchemaMismatch {
            source: "title.basics".to_owned(),
            column: "genres".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Source 'title.basics' is missing required column 'genres'"
        );
        assert_eq!(
            EtlError::UnknownDirector("nm0000001".to_owned()).to_string(),
            "Unknown director id: nm0000001"
        );
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.txt",
        ));

        let result: Result<()> = result.context("Failed to read file");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
        assert!(err.to_string().contains("file.txt"));
    }

    #[test]
    fn test_context_keeps_typed_variants() {
        let result: Result<()> = Err(EtlError::UnknownDirector("nm1".to_owned()));
        let err = result.context("Resolving top directors").unwrap_err();
        assert!(matches!(err, EtlError::UnknownDirector(id) if id == "nm1"));
    }
}
