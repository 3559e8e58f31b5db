//! The `bubblemark batch` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use bubblemark_core::bundle::InputBundle;
use bubblemark_core::engine::{BatchOrchestrator, CancelToken, ProgressReporter};
use bubblemark_core::manifest::Manifest;
use bubblemark_core::report::{BatchOutcome, BatchSummary};
use bubblemark_core::statistics::CohortStats;
use bubblemark_detect::{create_detector, load_config_from};
use bubblemark_report::StandardRenderer;

/// Console progress reporter.
struct ConsoleReporter {
    total: usize,
}

impl ProgressReporter for ConsoleReporter {
    fn on_student_start(&self, index: usize, student: &str) {
        eprintln!("  [{index}/{}] Marking: {student}", self.total);
    }

    fn on_student_complete(&self, outcome: &BatchOutcome) {
        match (&outcome.analysis, &outcome.error_kind) {
            (Some(a), _) => eprintln!(
                "  Done: {} reading {}/{} qr/ar {}/{}",
                outcome.student_name,
                a.reading_totals.correct,
                a.reading_totals.total,
                a.qr_ar_totals.correct,
                a.qr_ar_totals.total,
            ),
            (None, kind) => eprintln!(
                "  FAILED: {} [{}] {}",
                outcome.student_name,
                kind.map(|k| k.to_string()).unwrap_or_default(),
                outcome.error_message.as_deref().unwrap_or(""),
            ),
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary, elapsed: Duration) {
        eprintln!(
            "\nComplete: {}/{} succeeded, {} failed ({:.1}s)",
            summary.success_count(),
            summary.outcomes.len(),
            summary.failure_count(),
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    manifest_path: PathBuf,
    sheets_dir: PathBuf,
    output: Option<PathBuf>,
    parallelism: Option<usize>,
    timeout_secs: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(p) = parallelism {
        anyhow::ensure!(p >= 1, "parallelism must be at least 1");
    }
    if let Some(t) = timeout_secs {
        anyhow::ensure!(t >= 1, "timeout must be at least 1 second");
    }

    let config = load_config_from(config_path.as_deref())?;
    let keys = config.load_keys()?;
    let concepts = config.load_concept_map()?;
    let manifest = Manifest::load(&manifest_path)?;
    let inputs = InputBundle::load_dir(&sheets_dir)?;
    let detector = create_detector(&config.detector)?;

    let mut batch_config = config.batch_config();
    if let Some(p) = parallelism {
        batch_config.parallelism = p;
    }
    if let Some(t) = timeout_secs {
        batch_config.student_timeout = Duration::from_secs(t);
    }

    eprintln!(
        "bubblemark v{} - Marking {} students ({} at a time)",
        env!("CARGO_PKG_VERSION"),
        manifest.len(),
        batch_config.parallelism
    );
    eprintln!();

    let orchestrator = BatchOrchestrator::new(
        Arc::from(detector),
        Arc::new(StandardRenderer),
        Arc::new(keys),
        Arc::new(concepts),
        batch_config,
    );

    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted: finishing in-flight students");
                cancel.cancel();
            }
        })
    };

    let reporter = ConsoleReporter {
        total: manifest.len(),
    };
    let run = orchestrator
        .run(&manifest, &inputs, &cancel, &reporter)
        .await;
    ctrl_c.abort();
    let run = run?;

    print_summary(&run.summary);
    print_cohort(&CohortStats::from_summary(&run.summary));

    let output = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        config.output_dir.join(format!("batch-{timestamp}"))
    });
    run.bundle.write_to_dir(&output)?;
    eprintln!(
        "Results saved to: {} ({} files)",
        output.display(),
        run.bundle.len()
    );

    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    let mut table = Table::new();
    table.set_header(vec![
        "#", "Student", "Status", "Reading", "QR/AR", "Writing", "Error",
    ]);

    for outcome in &summary.outcomes {
        let (reading, qr_ar) = match &outcome.analysis {
            Some(a) => (
                format!("{:.1}%", a.reading_totals.percentage),
                format!("{:.1}%", a.qr_ar_totals.percentage),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        let status = if outcome.is_success() { "OK" } else { "FAIL" };
        table.add_row(vec![
            Cell::new(outcome.index),
            Cell::new(&outcome.student_name),
            Cell::new(status),
            Cell::new(reading),
            Cell::new(qr_ar),
            Cell::new(outcome.writing_score),
            Cell::new(
                outcome
                    .error_kind
                    .map(|k| k.to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }

    eprintln!("\n{table}");
}

fn print_cohort(stats: &CohortStats) {
    if stats.students == 0 {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Students", "Mean %", "Area", "Strength", "Improve"]);
    for subject in &stats.subjects {
        table.add_row(vec![
            Cell::new(&subject.subject),
            Cell::new(subject.students),
            Cell::new(format!("{:.1}%", subject.mean_percentage)),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
        ]);
        for area in &subject.areas {
            table.add_row(vec![
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(&area.area),
                Cell::new(area.strength_count),
                Cell::new(area.improvement_count),
            ]);
        }
    }

    eprintln!(
        "\nCohort of {}: mean writing {:.1}, reading {:.1}%, QR/AR {:.1}%",
        stats.students,
        stats.mean_writing_score,
        stats.mean_reading_percentage,
        stats.mean_qr_ar_percentage
    );
    eprintln!("{table}");
}
