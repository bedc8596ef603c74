///! Error taxonomy for the ingestion pipeline
///!
///! Failures are contained at the smallest unit that keeps the run moving:
///! a bad observation line is skipped inside the parser, a bad bulletin is
///! logged and skipped by the pipeline, and a half-month ends on a fetch miss.

use mpec_common::DesignationError;
use thiserror::Error;

/// Fetch outcome other than a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The requested number has not been published; stop walking this half-month.
    #[error("{bulletin} is not published")]
    EndOfSequence { bulletin: String },

    /// Transport fault that survived every retry.
    #[error("failed to fetch {bulletin} after {attempts} attempts: {message}")]
    Transient {
        bulletin: String,
        attempts: u32,
        message: String,
    },

    #[error("cannot build bulletin url: {0}")]
    Designation(#[from] DesignationError),
}

/// Structural expectation violated while reading one bulletin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{bulletin}: {message}{}", describe_line(.line))]
pub struct PageParseError {
    pub bulletin: String,
    /// 1-based line number and text of the offending line, when there is one
    pub line: Option<(usize, String)>,
    pub message: String,
}

impl PageParseError {
    pub fn new(bulletin: &str, message: impl Into<String>) -> Self {
        Self {
            bulletin: bulletin.to_string(),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(bulletin: &str, index: usize, text: &str, message: impl Into<String>) -> Self {
        Self {
            bulletin: bulletin.to_string(),
            line: Some((index + 1, text.to_string())),
            message: message.into(),
        }
    }

    pub fn line_number(&self) -> Option<usize> {
        self.line.as_ref().map(|(n, _)| *n)
    }
}

fn describe_line(line: &Option<(usize, String)>) -> String {
    match line {
        Some((n, text)) => format!(" (line {n}: {text:?})"),
        None => String::new(),
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },

    #[error("invalid station code '{0}'")]
    InvalidStation(String),

    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Uniqueness / constraint violation on a single row.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

/// Per-bulletin failure, caught and logged by the pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] PageParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Pipeline step that failed, recorded as `function` on error events.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "process_page",
            Self::Store(_) => "store",
        }
    }
}
