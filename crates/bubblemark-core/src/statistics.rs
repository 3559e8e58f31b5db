//! Cohort statistics across the successful students of a batch.

use serde::{Deserialize, Serialize};

use crate::model::FullAnalysis;
use crate::report::BatchSummary;

/// Aggregates for one subject across the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectCohort {
    pub subject: String,
    /// Students with a result for this subject.
    pub students: usize,
    pub mean_percentage: f64,
    pub areas: Vec<AreaCohort>,
}

/// How many students have an area as a strength or an improvement area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaCohort {
    pub area: String,
    pub strength_count: usize,
    pub improvement_count: usize,
}

/// Batch-wide view over successful students only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    pub students: usize,
    pub mean_writing_score: f64,
    pub mean_reading_percentage: f64,
    pub mean_qr_ar_percentage: f64,
    /// Subjects in first-seen order.
    pub subjects: Vec<SubjectCohort>,
}

impl CohortStats {
    pub fn from_summary(summary: &BatchSummary) -> Self {
        Self::from_analyses(summary.successes())
    }

    pub fn from_analyses<'a>(analyses: impl IntoIterator<Item = &'a FullAnalysis>) -> Self {
        let analyses: Vec<&FullAnalysis> = analyses.into_iter().collect();
        if analyses.is_empty() {
            return Self::default();
        }

        let mut subjects: Vec<SubjectCohort> = Vec::new();
        let mut percentage_sums: Vec<f64> = Vec::new();

        for analysis in &analyses {
            for subject in &analysis.per_subject {
                let idx = match subjects.iter().position(|s| s.subject == subject.subject) {
                    Some(idx) => idx,
                    None => {
                        subjects.push(SubjectCohort {
                            subject: subject.subject.clone(),
                            students: 0,
                            mean_percentage: 0.0,
                            areas: Vec::new(),
                        });
                        percentage_sums.push(0.0);
                        subjects.len() - 1
                    }
                };

                let cohort = &mut subjects[idx];
                cohort.students += 1;
                percentage_sums[idx] += subject.score.percentage;

                for detail in &subject.area_details {
                    let pos = match cohort.areas.iter().position(|a| a.area == detail.area) {
                        Some(pos) => pos,
                        None => {
                            cohort.areas.push(AreaCohort {
                                area: detail.area.clone(),
                                strength_count: 0,
                                improvement_count: 0,
                            });
                            cohort.areas.len() - 1
                        }
                    };
                    let area = &mut cohort.areas[pos];
                    if detail.is_strength {
                        area.strength_count += 1;
                    } else {
                        area.improvement_count += 1;
                    }
                }
            }
        }

        for (cohort, sum) in subjects.iter_mut().zip(&percentage_sums) {
            cohort.mean_percentage = sum / cohort.students as f64;
        }

        let n = analyses.len() as f64;
        Self {
            students: analyses.len(),
            mean_writing_score: analyses.iter().map(|a| a.writing_score as f64).sum::<f64>() / n,
            mean_reading_percentage: analyses
                .iter()
                .map(|a| a.reading_totals.percentage)
                .sum::<f64>()
                / n,
            mean_qr_ar_percentage: analyses
                .iter()
                .map(|a| a.qr_ar_totals.percentage)
                .sum::<f64>()
                / n,
            subjects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compile;
    use crate::concept_map::ConceptMap;
    use crate::model::{percentage, QuestionResult, SheetKind, SubjectResult};

    fn reading(verdicts: &[bool]) -> SubjectResult {
        let questions: Vec<QuestionResult> = verdicts
            .iter()
            .enumerate()
            .map(|(i, ok)| QuestionResult {
                label: format!("RC{}", i + 1),
                detected: "A".into(),
                expected: if *ok { "A".into() } else { "B".into() },
                is_correct: *ok,
                is_unmarked: false,
                is_multi_marked: false,
            })
            .collect();
        let correct = verdicts.iter().filter(|ok| **ok).count();
        SubjectResult {
            subject_name: "Reading".into(),
            sheet: SheetKind::Reading,
            correct,
            incorrect: verdicts.len() - correct,
            unmarked: 0,
            total: verdicts.len(),
            percentage: percentage(correct, verdicts.len()),
            questions,
        }
    }

    #[test]
    fn empty_cohort() {
        let stats = CohortStats::from_analyses([]);
        assert_eq!(stats.students, 0);
        assert!(stats.subjects.is_empty());
    }

    #[test]
    fn means_and_area_counts() {
        let map = ConceptMap::parse(r#"{"Reading": {"Main": ["RC1", "RC2"], "Vocab": ["RC3"]}}"#)
            .unwrap();
        let a = compile("Ada", 40, &[reading(&[true, true, false])], &map);
        let b = compile("Sam", 20, &[reading(&[true, false, true])], &map);

        let stats = CohortStats::from_analyses([&a, &b]);
        assert_eq!(stats.students, 2);
        assert_eq!(stats.mean_writing_score, 30.0);

        let subject = &stats.subjects[0];
        assert_eq!(subject.subject, "Reading");
        assert_eq!(subject.students, 2);
        assert!((subject.mean_percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            subject.areas,
            vec![
                AreaCohort {
                    area: "Main".into(),
                    strength_count: 1,
                    improvement_count: 1,
                },
                AreaCohort {
                    area: "Vocab".into(),
                    strength_count: 1,
                    improvement_count: 1,
                },
            ]
        );
    }
}
