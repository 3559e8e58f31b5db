//! Marked-sheet CSV: one row per question on a physical sheet.

use anyhow::{Context, Result};

use bubblemark_core::model::{QuestionResult, SheetKind};
use bubblemark_core::pipeline::StudentMarking;

fn verdict(q: &QuestionResult) -> &'static str {
    if q.is_correct {
        "Correct"
    } else if q.is_unmarked {
        "Unmarked"
    } else if q.is_multi_marked {
        "Multi-marked"
    } else {
        "Incorrect"
    }
}

/// Render the questions of every subject printed on `sheet`, followed by a
/// score line per subject.
pub fn generate_marked_csv(marking: &StudentMarking, sheet: SheetKind) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Subject", "Question", "Detected", "Expected", "Result"])?;

    for result in marking.subjects_on(sheet) {
        for q in &result.questions {
            writer.write_record([
                result.subject_name.as_str(),
                q.label.as_str(),
                q.detected.as_str(),
                q.expected.as_str(),
                verdict(q),
            ])?;
        }
    }
    for result in marking.subjects_on(sheet) {
        let score = format!("{}/{}", result.correct, result.total);
        let pct = format!("{:.1}%", result.percentage);
        writer.write_record([
            result.subject_name.as_str(),
            "Score",
            score.as_str(),
            pct.as_str(),
            "",
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("{}", e.error()))
        .with_context(|| format!("failed to finish {sheet} sheet CSV"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_marking;

    fn rows(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::Reader::from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn reading_sheet_rows() {
        let bytes = generate_marked_csv(&sample_marking(), SheetKind::Reading).unwrap();
        let rows = rows(&bytes);

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], vec!["Reading", "RC1", "A", "A", "Correct"]);
        assert_eq!(rows[2], vec!["Reading", "RC3", "C/D", "C", "Multi-marked"]);
        assert_eq!(rows[3], vec!["Reading", "RC4", "", "D", "Unmarked"]);
        assert_eq!(rows[5], vec!["Reading", "Score", "3/5", "60.0%", ""]);
    }

    #[test]
    fn qrar_sheet_only_has_its_subjects() {
        let bytes = generate_marked_csv(&sample_marking(), SheetKind::QrAr).unwrap();
        let rows = rows(&bytes);
        assert!(rows.iter().all(|r| r[0] == "Quantitative Reasoning"));
        assert_eq!(rows[1][4], "Incorrect");
    }
}
