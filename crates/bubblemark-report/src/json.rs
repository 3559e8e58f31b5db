//! Machine-readable per-student results and batch summary.

use anyhow::{Context, Result};

use bubblemark_core::pipeline::StudentMarking;
use bubblemark_core::report::BatchSummary;

/// The student's full analysis as pretty-printed JSON.
pub fn generate_results_json(marking: &StudentMarking) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(&marking.analysis).context("failed to serialize analysis")
}

/// Every batch outcome, successes with their analysis, as pretty-printed JSON.
pub fn generate_summary_json(summary: &BatchSummary) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(summary).context("failed to serialize summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_marking;
    use bubblemark_core::error::{ErrorKind, StudentError};
    use bubblemark_core::model::FullAnalysis;
    use bubblemark_core::report::BatchOutcome;

    #[test]
    fn results_json_is_the_full_analysis() {
        let marking = sample_marking();
        let bytes = generate_results_json(&marking).unwrap();
        let parsed: FullAnalysis = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.student_name, marking.analysis.student_name);
        assert_eq!(parsed.per_subject.len(), 2);

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["writing_score"], 25);
        assert_eq!(value["per_subject"][0]["subject"], "Reading");
    }

    #[test]
    fn summary_json_keeps_failures_and_analyses() {
        let marking = sample_marking();
        let summary = BatchSummary::new(vec![
            BatchOutcome::success(1, "Ada <Lovelace>", "Ada_<Lovelace>", 25, marking.analysis),
            BatchOutcome::failure(2, "Sam", "Sam", 30, &StudentError::MissingInput("sam.png".into())),
        ]);

        let bytes = generate_summary_json(&summary).unwrap();
        let parsed: BatchSummary = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.success_count(), 1);
        assert_eq!(parsed.outcomes[1].error_kind, Some(ErrorKind::MissingInput));

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["outcomes"][0]["analysis"]["writing_score"], 25);
        assert!(value["outcomes"][1].get("analysis").is_none());
    }
}
