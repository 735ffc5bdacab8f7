//! Error types for schema tree construction, argument validation and
//! returned-field projection.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while building a schema tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("schema lookup failed: no element named '{element}'")]
    SchemaLookupFailure { element: String },
}

impl TreeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Structural mismatches between supplied arguments and a schema tree.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("positional argument #{index} not supported: pass arguments by name")]
    UnsupportedPositionalArgument { index: usize },

    #[error("unknown field '{field}' at {path}: expected one of {}", accepted.join(", "))]
    UnknownField {
        path: String,
        field: String,
        accepted: Vec<String>,
    },

    #[error("{path} needs nested values, not a scalar: expected {}", accepted.join(", "))]
    DrillDownRequired { path: String, accepted: Vec<String> },

    #[error("{path} is a scalar field and cannot take nested values")]
    ScalarExpected { path: String },

    #[error("ambiguous choice at {path}: supply exactly one of {}", options.join(", "))]
    AmbiguousChoice { path: String, options: Vec<String> },
}

impl ArgumentError {
    /// Dotted path of the offending position, when the error has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::UnsupportedPositionalArgument { .. } => None,
            Self::UnknownField { path, .. }
            | Self::DrillDownRequired { path, .. }
            | Self::ScalarExpected { path }
            | Self::AmbiguousChoice { path, .. } => Some(path),
        }
    }
}

/// Errors while projecting requested tags into a returned-fields mapping.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("unknown tag '{tag}' at {path}: valid tags are {}", valid.join(", "))]
    UnknownTag {
        tag: String,
        path: String,
        valid: Vec<String>,
    },

    #[error("tags {} at {path} belong to different branches of one choice", tags.join(", "))]
    ChoiceTagConflict { path: String, tags: Vec<String> },

    #[error("drill-down '{hop}' not found under {path}")]
    DrillDownMissing { hop: String, path: String },

    #[error("{element} has no returnable fields")]
    NoReturnableFields { element: String },
}

/// Errors while loading a schema snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot: {} problem(s), first: {}", issues.len(), first_issue(issues))]
    InvalidSnapshot { issues: Vec<SnapshotIssue> },
}

fn first_issue(issues: &[SnapshotIssue]) -> String {
    issues.first().map(ToString::to_string).unwrap_or_default()
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Single structural problem in a snapshot, with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SnapshotIssue {
    /// JSON Pointer (RFC 6901) to the offending node.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SnapshotIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Any failure while preparing a call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl CallError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CallError::Tree(e) => e.exit_code(),
            CallError::Arguments(_) | CallError::Projection(_) => 1,
        }
    }
}
