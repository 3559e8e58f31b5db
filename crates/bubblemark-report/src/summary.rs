//! Batch-level artifacts: the per-student CSV table and a plain-text summary.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use bubblemark_core::model::ScoreTotals;
use bubblemark_core::report::{BatchOutcome, BatchSummary};

fn score_cell(totals: &ScoreTotals) -> String {
    format!("{}/{}", totals.correct, totals.total)
}

fn status_cell(outcome: &BatchOutcome) -> &'static str {
    if outcome.is_success() {
        "Success"
    } else {
        "Failed"
    }
}

/// One row per manifest entry, in manifest order.
pub fn generate_batch_csv(summary: &BatchSummary) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Student Name",
        "Folder",
        "Status",
        "Writing Score",
        "Reading Score",
        "QR/AR Score",
        "Error Kind",
        "Notes",
    ])?;

    for outcome in &summary.outcomes {
        let (reading, qr_ar) = match &outcome.analysis {
            Some(a) => (score_cell(&a.reading_totals), score_cell(&a.qr_ar_totals)),
            None => (String::new(), String::new()),
        };
        let kind = outcome
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_default();
        let writing = outcome.writing_score.to_string();
        writer.write_record([
            outcome.student_name.as_str(),
            outcome.folder.as_str(),
            status_cell(outcome),
            writing.as_str(),
            reading.as_str(),
            qr_ar.as_str(),
            kind.as_str(),
            outcome.error_message.as_deref().unwrap_or(""),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("{}", e.error()))
        .context("failed to finish batch summary CSV")
}

/// Human-readable counts plus one line per failed student.
pub fn generate_summary_text(summary: &BatchSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Batch processing summary");
    let _ = writeln!(out, "Students:   {}", summary.outcomes.len());
    let _ = writeln!(out, "Successful: {}", summary.success_count());
    let _ = writeln!(out, "Failed:     {}", summary.failure_count());

    if summary.failure_count() > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Failures:");
        for outcome in summary.failures() {
            let kind = outcome
                .error_kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "Unknown".into());
            let _ = writeln!(
                out,
                "  {}. {} [{kind}] {}",
                outcome.index,
                outcome.student_name,
                outcome.error_message.as_deref().unwrap_or("")
            );
        }
    }
    out
}
