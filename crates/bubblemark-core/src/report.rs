//! Per-student batch outcomes and the batch summary.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, StudentError};
use crate::model::FullAnalysis;

/// Whether a student made it through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// The authoritative record for one manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// 1-based manifest position.
    pub index: usize,
    pub student_name: String,
    /// Output folder assigned to this student, whether or not it was written.
    pub folder: String,
    pub writing_score: u32,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FullAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BatchOutcome {
    pub fn success(
        index: usize,
        student_name: &str,
        folder: &str,
        writing_score: u32,
        analysis: FullAnalysis,
    ) -> Self {
        Self {
            index,
            student_name: student_name.to_string(),
            folder: folder.to_string(),
            writing_score,
            status: OutcomeStatus::Success,
            analysis: Some(analysis),
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failure(
        index: usize,
        student_name: &str,
        folder: &str,
        writing_score: u32,
        error: &StudentError,
    ) -> Self {
        Self {
            index,
            student_name: student_name.to_string(),
            folder: folder.to_string(),
            writing_score,
            status: OutcomeStatus::Failure,
            analysis: None,
            error_kind: Some(error.kind()),
            error_message: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Outcomes in manifest order. Counts are derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchSummary {
    pub fn new(outcomes: Vec<BatchOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn successes(&self) -> impl Iterator<Item = &FullAnalysis> {
        self.outcomes.iter().filter_map(|o| o.analysis.as_ref())
    }
}
