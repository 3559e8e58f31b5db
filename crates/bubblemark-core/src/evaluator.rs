//! Compares one subject's detected marks against its answer key.

use crate::answer_key::SubjectKey;
use crate::error::StudentError;
use crate::model::{percentage, DetectedMark, DetectedResponses, QuestionResult, SubjectResult};

/// Mark one subject.
///
/// The answer key decides how many questions exist; the detected responses
/// decide what was scanned. A question the engine did not report counts as
/// unmarked. A detected label carrying this subject's prefix but numbered
/// outside the key means the sheet template and the key disagree, which is
/// reported instead of being silently dropped.
pub fn evaluate(
    subject: &SubjectKey,
    detected: &DetectedResponses,
) -> Result<SubjectResult, StudentError> {
    let key_len = subject.key.len();
    if let Some(label) = detected.labels().find(|label| {
        subject
            .position_of(label)
            .is_some_and(|n| n == 0 || n > key_len)
    }) {
        return Err(StudentError::ResponseCountMismatch {
            subject: subject.name.clone(),
            label: label.to_string(),
            key_len,
        });
    }

    let mut questions = Vec::with_capacity(key_len);
    let mut correct = 0;
    let mut unmarked = 0;

    for (i, expected) in subject.key.answers().iter().enumerate() {
        let label = subject.label(i + 1);
        let mark = detected.get(&label);

        let (is_correct, is_unmarked, is_multi_marked) = match mark {
            DetectedMark::Unmarked => (false, true, false),
            DetectedMark::Answer(answer) => (answer == expected, false, false),
            DetectedMark::MultiMarked(_) => (false, false, true),
        };
        if is_correct {
            correct += 1;
        }
        if is_unmarked {
            unmarked += 1;
        }

        questions.push(QuestionResult {
            label,
            detected: mark.display(),
            expected: expected.clone(),
            is_correct,
            is_unmarked,
            is_multi_marked,
        });
    }

    let total = questions.len();
    Ok(SubjectResult {
        subject_name: subject.name.clone(),
        sheet: subject.sheet,
        correct,
        incorrect: total - correct - unmarked,
        unmarked,
        total,
        percentage: percentage(correct, total),
        questions,
    })
}

/// Check the counting invariants of a subject result.
pub fn verify(result: &SubjectResult) -> Result<(), StudentError> {
    let fail = |detail: String| {
        Err(StudentError::InconsistentTotals {
            subject: result.subject_name.clone(),
            detail,
        })
    };

    if result.correct + result.incorrect + result.unmarked != result.total {
        return fail(format!(
            "{} correct + {} incorrect + {} unmarked != {} total",
            result.correct, result.incorrect, result.unmarked, result.total
        ));
    }
    if result.total != result.questions.len() {
        return fail(format!(
            "total {} but {} questions",
            result.total,
            result.questions.len()
        ));
    }
    if let Some(q) = result
        .questions
        .iter()
        .find(|q| (q.is_correct && q.is_unmarked) || (q.is_unmarked && !q.detected.is_empty()))
    {
        return fail(format!("question {} has contradictory flags", q.label));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer_key::AnswerKey;
    use crate::model::SheetKind;

    fn subject(answers: &[&str]) -> SubjectKey {
        SubjectKey::new(
            "Reading",
            SheetKind::Reading,
            "q",
            AnswerKey::from_answers(answers).unwrap(),
        )
    }

    fn answer(s: &str) -> DetectedMark {
        DetectedMark::from_marks([s])
    }

    #[test]
    fn mixed_sheet_scenario() {
        let key = subject(&["A", "B", "C", "D"]);
        let detected: DetectedResponses = [
            ("q1", answer("A")),
            ("q2", answer("B")),
            ("q3", DetectedMark::Unmarked),
            ("q4", answer("E")),
        ]
        .into_iter()
        .collect();

        let result = evaluate(&key, &detected).unwrap();
        assert_eq!(result.correct, 2);
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.unmarked, 1);
        assert_eq!(result.total, 4);
        assert_eq!(result.percentage, 50.0);

        let q = &result.questions;
        assert!(q[0].is_correct && q[1].is_correct);
        assert!(q[2].is_unmarked && !q[2].is_correct);
        assert_eq!(q[2].detected, "");
        assert!(!q[3].is_correct && !q[3].is_unmarked);
        assert_eq!(q[3].expected, "D");
        verify(&result).unwrap();
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let answers = ["A", "B", "C", "D", "A", "B", "C"];
        let key = subject(&answers);
        let detected: DetectedResponses = answers
            .iter()
            .enumerate()
            .map(|(i, a)| (format!("q{}", i + 1), answer(a)))
            .collect();

        let result = evaluate(&key, &detected).unwrap();
        assert_eq!(result.correct, answers.len());
        assert_eq!(result.incorrect, 0);
        assert_eq!(result.unmarked, 0);
        assert_eq!(result.percentage, 100.0);
    }

    #[test]
    fn missing_labels_count_as_unmarked() {
        let key = subject(&["A", "B"]);
        let result = evaluate(&key, &DetectedResponses::new()).unwrap();
        assert_eq!(result.unmarked, 2);
        assert_eq!(result.correct, 0);
        assert_eq!(result.percentage, 0.0);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let key = subject(&["b"]);
        let detected: DetectedResponses = [("q1", answer(" B"))].into_iter().collect();
        assert_eq!(evaluate(&key, &detected).unwrap().correct, 1);
    }

    #[test]
    fn multi_mark_is_incorrect_not_unmarked() {
        let key = subject(&["A"]);
        let detected: DetectedResponses = [(
            "q1",
            DetectedMark::MultiMarked(vec!["A".into(), "B".into()]),
        )]
        .into_iter()
        .collect();

        let result = evaluate(&key, &detected).unwrap();
        assert_eq!(result.correct, 0);
        assert_eq!(result.unmarked, 0);
        assert_eq!(result.incorrect, 1);
        assert!(result.questions[0].is_multi_marked);
        assert_eq!(result.questions[0].detected, "A/B");
    }

    #[test]
    fn multi_mark_never_matches_concatenated_key() {
        let key = subject(&["AB"]);
        let detected: DetectedResponses = [(
            "q1",
            DetectedMark::MultiMarked(vec!["A".into(), "B".into()]),
        )]
        .into_iter()
        .collect();
        assert_eq!(evaluate(&key, &detected).unwrap().correct, 0);
    }

    #[test]
    fn label_beyond_key_is_a_mismatch() {
        let key = subject(&["A", "B"]);
        let detected: DetectedResponses = [("q1", answer("A")), ("q3", answer("C"))]
            .into_iter()
            .collect();
        let err = evaluate(&key, &detected).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::EvaluationError);
        assert!(err.to_string().contains("q3"));
    }

    #[test]
    fn other_subjects_labels_are_ignored() {
        let key = SubjectKey::new(
            "Abstract Reasoning",
            SheetKind::QrAr,
            "AR",
            AnswerKey::from_answers(["C"]).unwrap(),
        );
        let detected: DetectedResponses = [("QR1", answer("A")), ("QR40", answer("B")), ("AR1", answer("C"))]
            .into_iter()
            .collect();
        let result = evaluate(&key, &detected).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.correct, 1);
    }

    #[test]
    fn verify_flags_broken_totals() {
        let key = subject(&["A"]);
        let mut result = evaluate(&key, &DetectedResponses::new()).unwrap();
        result.total = 2;
        assert!(verify(&result).is_err());
    }
}
