//! Error taxonomy shared by every stage of a sync run.
//!
//! Structural errors ([`ParseError`], [`ConfigError`]) abort the whole run.
//! Per-file errors ([`JobError`], wrapping [`ProviderError`] or I/O) are scoped
//! to a single entry and collected into the run report. An
//! [`UnsupportedOperationError`] is recorded against its entry and always marks
//! the run as failed.

use std::path::PathBuf;
use thiserror::Error;

/// A change-list record that does not match the grammar or the root invariant.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: malformed record `{text}`")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unknown status `{status}` in `{text}`")]
    UnknownStatus {
        line: usize,
        status: String,
        text: String,
    },

    #[error("line {line}: similarity score `{score}` is out of range 0-100 in `{text}`")]
    ScoreOutOfRange {
        line: usize,
        score: String,
        text: String,
    },

    #[error("line {line}: status `{status}` expects {expected} path(s), found {found} in `{text}`")]
    PathCount {
        line: usize,
        status: char,
        expected: usize,
        found: usize,
        text: String,
    },

    #[error("line {line}: path `{path}` is outside the `{prefix}` root in `{text}`")]
    OutsideRoot {
        line: usize,
        path: String,
        prefix: String,
        text: String,
    },

    #[error("invalid change-list envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

impl ParseError {
    /// 1-based line of the offending record, `None` for envelope-level failures.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Malformed { line, .. }
            | ParseError::UnknownStatus { line, .. }
            | ParseError::ScoreOutOfRange { line, .. }
            | ParseError::PathCount { line, .. }
            | ParseError::OutsideRoot { line, .. } => Some(*line),
            ParseError::Envelope(_) => None,
        }
    }
}

/// An opaque diff status reached the planner; the mapping for it is unknown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no file operation is defined for diff status `{status}` (raw: `{raw}`)")]
pub struct UnsupportedOperationError {
    pub status: String,
    pub raw: String,
}

/// Failure of a single generation conversation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("generation stopped with finish reason `{0}`")]
    UnexpectedFinish(String),

    #[error("response still truncated after {max_turns} provider turns")]
    ContinuationLimit { max_turns: usize },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(String),
}

/// Per-file failure. Always names the path it happened on.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("translation of {} failed: {source}", .path.display())]
    Provider {
        path: PathBuf,
        #[source]
        source: ProviderError,
    },

    #[error("cannot translate {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperationError),
}

impl JobError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JobError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Invalid configuration detected while building a component.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("provider max_turns must be at least 1")]
    ZeroTurns,

    #[error("no instruction document for language `{0}`")]
    MissingInstructions(String),

    #[error("failed to read instruction document {}: {source}", .path.display())]
    Instructions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid link rule pattern `{pattern}`: {source}")]
    LinkPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors that abort a whole run before or outside per-entry processing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write revision record {}: {source}", .path.display())]
    Revision {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
