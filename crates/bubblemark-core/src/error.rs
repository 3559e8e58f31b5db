//! Error types for session setup, detection, and per-student processing.
//!
//! Detection errors are defined here rather than in `bubblemark-detect` so the
//! batch orchestrator can classify failures into an [`ErrorKind`] without
//! string matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A malformed answer key, concept map, or marking setup.
///
/// These are fatal to session setup: no student is processed when one is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("answer key has no usable entries")]
    EmptyKey,

    #[error("blank line {line} in answer key (position would be ambiguous)")]
    BlankLine { line: usize },

    #[error("line {line} is not a `label,value` pair: {content:?}")]
    MalformedPair { line: usize, content: String },

    #[error("answer for question {label} is empty")]
    EmptyAnswer { label: String },

    #[error("unexpected label {label} (expected {expected})")]
    UnexpectedLabel { label: String, expected: String },

    #[error("duplicate label {label} in answer key")]
    DuplicateLabel { label: String },

    #[error("concept map is not valid JSON: {0}")]
    MalformedConceptMap(String),

    #[error("concept map must be a JSON object of subjects")]
    ConceptMapNotObject,

    #[error("subject '{subject}' must map to an object of learning areas")]
    SubjectNotObject { subject: String },

    #[error("area '{area}' in subject '{subject}' must be a list of question labels")]
    AreaNotList { subject: String, area: String },

    #[error("area '{area}' in subject '{subject}' contains an invalid question label")]
    InvalidQuestionLabel { subject: String, area: String },

    #[error(
        "question {label} in subject '{subject}' is mapped to both '{first_area}' and '{second_area}'"
    )]
    DuplicateQuestionMapping {
        subject: String,
        label: String,
        first_area: String,
        second_area: String,
    },

    #[error("area '{area}' appears more than once in subject '{subject}'")]
    DuplicateArea { subject: String, area: String },

    #[error("subject '{0}' appears more than once in the concept map")]
    DuplicateConceptSubject(String),

    #[error("subject '{0}' is configured more than once")]
    DuplicateSubject(String),

    #[error("label prefix '{prefix}' is used by more than one subject on the {sheet} sheet")]
    DuplicatePrefix { prefix: String, sheet: String },

    #[error("subject '{0}' has an empty label prefix")]
    EmptyPrefix(String),
}

/// Failures reported by a detection collaborator.
#[derive(Debug, Clone, Error)]
pub enum DetectionError {
    /// The engine could not read the image as a bubble sheet.
    #[error("could not decode sheet: {0}")]
    Decode(String),

    /// The engine does not know the requested template.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// The engine could not be reached or answered with an error.
    #[error("detection engine unavailable: {0}")]
    Unavailable(String),

    /// The engine did not answer in time.
    #[error("detection timed out after {0}s")]
    Timeout(u64),
}

/// Classification of a failed student in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingInput,
    DecodeFailure,
    EvaluationError,
    RenderFailure,
    Timeout,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MissingInput => "MissingInput",
            ErrorKind::DecodeFailure => "DecodeFailure",
            ErrorKind::EvaluationError => "EvaluationError",
            ErrorKind::RenderFailure => "RenderFailure",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// An error raised while marking a single student.
#[derive(Debug, Error)]
pub enum StudentError {
    #[error("input '{0}' is not in the sheet bundle")]
    MissingInput(String),

    #[error("{sheet} sheet: {source}")]
    Detection {
        sheet: String,
        #[source]
        source: DetectionError,
    },

    #[error(
        "subject '{subject}': detected label {label} is outside the {key_len}-question answer key"
    )]
    ResponseCountMismatch {
        subject: String,
        label: String,
        key_len: usize,
    },

    #[error("subject '{subject}': inconsistent totals ({detail})")]
    InconsistentTotals { subject: String, detail: String },

    #[error("artifact rendering failed: {0:#}")]
    Render(anyhow::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("batch was cancelled before this student started")]
    Cancelled,
}

impl StudentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudentError::MissingInput(_) => ErrorKind::MissingInput,
            StudentError::Detection {
                source: DetectionError::Timeout(_),
                ..
            } => ErrorKind::Timeout,
            StudentError::Detection { .. } => ErrorKind::DecodeFailure,
            StudentError::ResponseCountMismatch { .. }
            | StudentError::InconsistentTotals { .. } => ErrorKind::EvaluationError,
            StudentError::Render(_) => ErrorKind::RenderFailure,
            StudentError::Timeout(_) => ErrorKind::Timeout,
            StudentError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Structural problems with a manifest. These stop a batch before it starts.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("manifest must include a non-empty list of students")]
    Empty,

    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// The sheet bundle could not be opened.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("failed to read bundle entry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
