//! The single-student pipeline: detect, evaluate, analyse.
//!
//! Errors propagate to the caller unchanged. The batch orchestrator is the
//! only place that turns them into per-student outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::compile;
use crate::answer_key::MarkingKeys;
use crate::concept_map::ConceptMap;
use crate::error::StudentError;
use crate::evaluator::{evaluate, verify};
use crate::model::{DetectedResponses, FullAnalysis, SheetKind, SubjectResult};
use crate::traits::{DetectRequest, Detector};

/// Sheet images for one student, keyed by sheet.
pub type SheetImages = BTreeMap<SheetKind, Vec<u8>>;

/// Everything known about one marked student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentMarking {
    /// One result per configured subject, in configuration order.
    pub subject_results: Vec<SubjectResult>,
    pub analysis: FullAnalysis,
}

impl StudentMarking {
    pub fn subjects_on(&self, sheet: SheetKind) -> impl Iterator<Item = &SubjectResult> {
        self.subject_results.iter().filter(move |r| r.sheet == sheet)
    }
}

/// Mark one student end to end.
pub async fn mark_student(
    detector: &dyn Detector,
    keys: &MarkingKeys,
    concepts: &ConceptMap,
    student_name: &str,
    writing_score: u32,
    sheets: &SheetImages,
) -> Result<StudentMarking, StudentError> {
    let mut detected: BTreeMap<SheetKind, DetectedResponses> = BTreeMap::new();

    for sheet in keys.sheets() {
        let image = sheets
            .get(&sheet)
            .ok_or_else(|| StudentError::MissingInput(format!("{sheet} sheet")))?;
        let request = DetectRequest {
            image: image.clone(),
            template: keys.templates().for_sheet(sheet).to_string(),
        };
        tracing::debug!(student = student_name, %sheet, detector = detector.name(), "detecting");
        let responses = detector
            .detect(&request)
            .await
            .map_err(|source| StudentError::Detection {
                sheet: sheet.to_string(),
                source,
            })?;
        detected.insert(sheet, responses);
    }

    let empty = DetectedResponses::new();
    let mut subject_results = Vec::with_capacity(keys.subjects().len());
    for subject in keys.subjects() {
        let responses = detected.get(&subject.sheet).unwrap_or(&empty);
        let result = evaluate(subject, responses)?;
        verify(&result)?;
        tracing::debug!(
            student = student_name,
            subject = %subject.name,
            correct = result.correct,
            total = result.total,
            "subject marked"
        );
        subject_results.push(result);
    }

    let analysis = compile(student_name, writing_score, &subject_results, concepts);
    Ok(StudentMarking {
        subject_results,
        analysis,
    })
}
