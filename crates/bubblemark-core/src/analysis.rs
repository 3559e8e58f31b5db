//! Learning-area analysis and per-student compilation.

use std::collections::{HashMap, HashSet};

use crate::concept_map::{ConceptMap, SubjectConcepts};
use crate::model::{
    percentage, FullAnalysis, LearningAreaResult, ScoreTotals, SheetKind, SubjectAnalysis,
    SubjectResult,
};

/// An area is a strength at or above this percentage (inclusive).
pub const STRENGTH_THRESHOLD: usize = 51;

/// `correct / total >= 51%`, compared on the exact ratio.
///
/// Integer cross-multiplication keeps 51/100 a strength and 50.99...% an
/// improvement area without any float rounding at the boundary.
pub fn is_strength(correct: usize, total: usize) -> bool {
    total > 0 && correct * 100 >= STRENGTH_THRESHOLD * total
}

/// Group one subject's verdicts by learning area.
///
/// A subject with no concept-map entry analyses as all-unmapped.
pub fn analyze(result: &SubjectResult, concepts: Option<&SubjectConcepts>) -> SubjectAnalysis {
    let lookup: HashMap<&str, bool> = result
        .questions
        .iter()
        .map(|q| (q.label.as_str(), q.is_correct))
        .collect();

    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut area_details = Vec::new();
    let mut mapped: HashSet<&str> = HashSet::new();

    for area in concepts.map(|c| c.areas.as_slice()).unwrap_or_default() {
        let correct = area
            .questions
            .iter()
            .filter(|q| lookup.get(q.as_str()).copied().unwrap_or(false))
            .count();
        let total = area.questions.len();
        let strength = is_strength(correct, total);
        mapped.extend(area.questions.iter().map(String::as_str));

        if strength {
            strengths.push(area.name.clone());
        } else {
            improvements.push(area.name.clone());
        }
        area_details.push(LearningAreaResult {
            area: area.name.clone(),
            correct,
            total,
            percentage: percentage(correct, total),
            is_strength: strength,
        });
    }

    let unmapped_questions = result
        .questions
        .iter()
        .filter(|q| !mapped.contains(q.label.as_str()))
        .map(|q| q.label.clone())
        .collect();

    SubjectAnalysis {
        subject: result.subject_name.clone(),
        score: ScoreTotals::from_results([result]),
        strengths,
        improvements,
        area_details,
        unmapped_questions,
    }
}

/// Merge every subject's analysis and the manual writing score into one record.
///
/// Deterministic: the same inputs always produce the same analysis.
pub fn compile(
    student_name: &str,
    writing_score: u32,
    subject_results: &[SubjectResult],
    concepts: &ConceptMap,
) -> FullAnalysis {
    let per_subject = subject_results
        .iter()
        .map(|r| {
            let subject = concepts.subject(&r.subject_name);
            if subject.is_none() {
                tracing::debug!(
                    subject = %r.subject_name,
                    "no concept mapping, all questions unmapped"
                );
            }
            analyze(r, subject)
        })
        .collect();

    FullAnalysis {
        student_name: student_name.to_string(),
        writing_score,
        per_subject,
        reading_totals: ScoreTotals::from_results(
            subject_results.iter().filter(|r| r.sheet == SheetKind::Reading),
        ),
        qr_ar_totals: ScoreTotals::from_results(
            subject_results.iter().filter(|r| r.sheet == SheetKind::QrAr),
        ),
    }
}
