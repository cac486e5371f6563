//! Error types for scraping runs
//!
//! Failures are split by the level they happen at. Fetch, parse and
//! normalization failures stay local to a page or record and are counted;
//! export failures and misconfiguration abort the run.

use crate::models::PageDescriptor;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Outcome of a single fetch attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Network errors, timeouts, 5xx and 429 are transient. Other statuses and
    /// malformed bodies fail immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Why a raw record could not become a canonical one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizationFailure {
    MissingName,
}

impl std::fmt::Display for NormalizationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationFailure::MissingName => f.write_str("missing company name"),
        }
    }
}

/// Main error type for scraping runs
#[derive(Error, Debug, Clone)]
pub enum IngestError {
    /// Fetch gave up, either after exhausting retries or on a permanent error
    #[error("fetch failed after {attempts} attempt(s): {cause}")]
    FetchFailed { attempts: u32, cause: FetchError },

    /// Page content did not have the expected structure
    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("normalization failed: {0}")]
    NormalizationFailed(NormalizationFailure),

    /// Writing an output file failed; fatal to the run
    #[error("export to '{}' failed: {cause}. Check directory permissions and disk space.", path.display())]
    ExportFailed { path: PathBuf, cause: String },

    #[error("unknown source '{0}'. Known sources: {known}", known = crate::sources::SOURCE_NAMES.join(", "))]
    UnknownSource(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("run cancelled")]
    Cancelled,
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailed(msg.into())
    }

    /// Create an export error for `path`
    pub fn export(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::ExportFailed {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Errors that abort the whole run rather than a page or record
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::ExportFailed { .. } | IngestError::UnknownSource(_) | IngestError::Config(_)
        )
    }
}

/// A non-fatal failure attributed to one source (and page, when known)
#[derive(Debug, Clone)]
pub struct SourceError {
    pub source: String,
    pub descriptor: Option<PageDescriptor>,
    pub cause: IngestError,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.descriptor {
            Some(page) => write!(f, "{} [{}]: {}", self.source, page, self.cause),
            None => write!(f, "{}: {}", self.source, self.cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Network("connection reset".into()).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Status(403).is_transient());
        assert!(!FetchError::Malformed("bad utf-8".into()).is_transient());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(IngestError::export("/tmp/out.csv", "disk full").is_fatal());
        assert!(IngestError::UnknownSource("myspace".into()).is_fatal());
        assert!(!IngestError::parse("no cards").is_fatal());
        assert!(!IngestError::FetchFailed {
            attempts: 4,
            cause: FetchError::Timeout
        }
        .is_fatal());
    }

    #[test]
    fn test_unknown_source_lists_known_names() {
        let msg = IngestError::UnknownSource("myspace".into()).to_string();
        assert!(msg.contains("myspace"));
        assert!(msg.contains("techcrunch"));
    }
}
