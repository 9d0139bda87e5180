//! Result and error types for appium-pom.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for appium-pom operations
pub type PomResult<T> = Result<T, PomError>;

/// Broad classification of a [`PomError`], used by callers that only care
/// about the category of failure (e.g. the CLI exit path and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or ambiguous platform, config file, or test-case mapping
    Configuration,
    /// Missing data file or test case
    NotFound,
    /// Malformed JSON or malformed document structure
    Parse,
    /// A wait condition was never satisfied
    Timeout,
    /// The WebDriver client reported an error
    Driver,
    /// Filesystem error outside of config/data loading
    Io,
}

/// Errors that can occur in appium-pom
#[derive(Debug, Error)]
pub enum PomError {
    /// Configuration error (platform, config file, settings)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// No rule mapped a test function to an existing test case
    #[error("Configuration error: no test case for `{test_name}` in {file} (tried: {})", .candidates.join(", "))]
    UnresolvedTestCase {
        /// Test function name
        test_name: String,
        /// Data file searched
        file: String,
        /// Candidate case names, in the order they were tried
        candidates: Vec<String>,
    },

    /// Data or config file does not exist
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Test case missing from a data file
    #[error("Test case '{case}' not found in {file}")]
    CaseNotFound {
        /// Case name
        case: String,
        /// Data file name
        file: String,
    },

    /// File content is not valid JSON or not a valid document
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Driver error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error outside of file loading
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PomError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } | Self::UnresolvedTestCase { .. } => {
                ErrorKind::Configuration
            }
            Self::FileNotFound { .. } | Self::CaseNotFound { .. } => ErrorKind::NotFound,
            Self::Parse { .. } | Self::Json(_) => ErrorKind::Parse,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Driver { .. } => ErrorKind::Driver,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
