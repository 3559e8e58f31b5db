//! bubblemark-report: files produced for each marked student and for a batch.
//!
//! [`StandardRenderer`] is the [`ArtifactRenderer`] used by the CLI. Each
//! student gets one marked-sheet CSV per physical sheet, an HTML report, and
//! the raw analysis as JSON. A batch additionally gets `batch_summary.csv`,
//! `batch_summary.json` and `summary.txt` at its root.

pub mod html;
pub mod json;
pub mod sheet;
pub mod summary;

use anyhow::Result;

use bubblemark_core::model::SheetKind;
use bubblemark_core::pipeline::StudentMarking;
use bubblemark_core::report::BatchSummary;
use bubblemark_core::traits::{Artifact, ArtifactRenderer};

/// Root files of a batch bundle as `(kind, extension)`.
const SUMMARY_FILES: [(&str, &str); 3] = [
    ("batch_summary", "csv"),
    ("batch_summary", "json"),
    ("summary", "txt"),
];

/// Renders every artifact bubblemark knows how to produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRenderer;

impl ArtifactRenderer for StandardRenderer {
    fn render(&self, marking: &StudentMarking) -> Result<Vec<Artifact>> {
        let mut artifacts = Vec::new();

        for sheet in [SheetKind::Reading, SheetKind::QrAr] {
            if marking.subjects_on(sheet).next().is_none() {
                continue;
            }
            artifacts.push(Artifact::new(
                format!("{}_Marked", sheet.artifact_label()),
                "csv",
                sheet::generate_marked_csv(marking, sheet)?,
            ));
        }

        artifacts.push(Artifact::new(
            "Report",
            "html",
            html::generate_html(marking).into_bytes(),
        ));
        artifacts.push(Artifact::new(
            "results",
            "json",
            json::generate_results_json(marking)?,
        ));
        Ok(artifacts)
    }

    fn render_summary(&self, summary: &BatchSummary) -> Result<Vec<Artifact>> {
        let [csv, json, text] = SUMMARY_FILES;
        Ok(vec![
            Artifact::new(csv.0, csv.1, summary::generate_batch_csv(summary)?),
            Artifact::new(json.0, json.1, json::generate_summary_json(summary)?),
            Artifact::new(
                text.0,
                text.1,
                summary::generate_summary_text(summary).into_bytes(),
            ),
        ])
    }

    fn summary_names(&self) -> Vec<String> {
        SUMMARY_FILES
            .iter()
            .map(|(kind, ext)| format!("{kind}.{ext}"))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bubblemark_core::analysis::compile;
    use bubblemark_core::answer_key::{AnswerKey, SubjectKey};
    use bubblemark_core::concept_map::ConceptMap;
    use bubblemark_core::evaluator::evaluate;
    use bubblemark_core::model::{DetectedMark, DetectedResponses};

    fn answer(s: &str) -> DetectedMark {
        DetectedMark::Answer(s.into())
    }

    /// Reading 3/5 (Inference 2/3, Vocabulary 0/1, RC5 unmapped), QR 1/2
    /// with no area mapping, writing 25.
    pub(crate) fn sample_marking() -> StudentMarking {
        let reading = SubjectKey::new(
            "Reading",
            SheetKind::Reading,
            "RC",
            AnswerKey::from_answers(["A", "B", "C", "D", "A"]).unwrap(),
        );
        let qr = SubjectKey::new(
            "Quantitative Reasoning",
            SheetKind::QrAr,
            "QR",
            AnswerKey::from_answers(["C", "D"]).unwrap(),
        );

        let reading_marks: DetectedResponses = [
            ("RC1", answer("A")),
            ("RC2", answer("B")),
            ("RC3", DetectedMark::MultiMarked(vec!["C".into(), "D".into()])),
            ("RC5", answer("A")),
        ]
        .into_iter()
        .collect();
        let qr_marks: DetectedResponses = [("QR1", answer("C")), ("QR2", answer("A"))]
            .into_iter()
            .collect();

        let concepts = ConceptMap::parse(
            r#"{"Reading": {"Inference": ["RC1", "RC2", "RC3"], "Vocabulary": ["RC4"]}}"#,
        )
        .unwrap();

        let subject_results = vec![
            evaluate(&reading, &reading_marks).unwrap(),
            evaluate(&qr, &qr_marks).unwrap(),
        ];
        let analysis = compile("Ada <Lovelace>", 25, &subject_results, &concepts);
        StudentMarking {
            subject_results,
            analysis,
        }
    }

    #[test]
    fn renders_per_sheet_csv_report_and_json() {
        let artifacts = StandardRenderer.render(&sample_marking()).unwrap();
        let names: Vec<String> = artifacts.iter().map(|a| a.file_name("Ada")).collect();
        assert_eq!(
            names,
            vec![
                "Ada_Reading_Marked.csv",
                "Ada_QRAR_Marked.csv",
                "Ada_Report.html",
                "Ada_results.json",
            ]
        );
    }

    #[test]
    fn sheet_without_subjects_gets_no_csv() {
        let mut marking = sample_marking();
        marking
            .subject_results
            .retain(|r| r.sheet == SheetKind::Reading);
        let artifacts = StandardRenderer.render(&marking).unwrap();
        assert!(artifacts.iter().all(|a| a.kind != "QRAR_Marked"));
    }

    #[test]
    fn summary_artifacts_live_at_the_root() {
        let summary = BatchSummary::new(Vec::new());
        let names: Vec<String> = StandardRenderer
            .render_summary(&summary)
            .unwrap()
            .iter()
            .map(Artifact::root_name)
            .collect();
        assert_eq!(
            names,
            vec!["batch_summary.csv", "batch_summary.json", "summary.txt"]
        );
        assert_eq!(names, StandardRenderer.summary_names());
    }
}
