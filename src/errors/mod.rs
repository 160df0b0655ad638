//! Unified error type for CSV import, classification, and scan description.

/// Fixed message surfaced to the host when a report fails header validation.
pub const INVALID_CSV_MESSAGE: &str = "Invalid Black Duck Hub CSV report";

/// Import error type distinguishing invalid input from I/O and parse failures.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Header missing or column count does not match the active schema.
    #[error("Invalid Black Duck Hub CSV report")]
    InvalidCsv,

    #[error("CSV parse error at line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vulnerability handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// Check if this error represents a rejected input file.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidCsv)
    }

    /// Check if this error came from reading the underlying stream.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        if matches!(err.kind(), csv::ErrorKind::Io(_)) {
            return match err.into_kind() {
                csv::ErrorKind::Io(io) => Self::Io(io),
                other => Self::Io(std::io::Error::other(format!("{other:?}"))),
            };
        }
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        Self::Parse { line, source: err }
    }
}
