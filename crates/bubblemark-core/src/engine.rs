//! Batch orchestrator.
//!
//! Runs the single-student pipeline for every manifest entry with bounded
//! parallelism. Per-student failures are recorded as outcomes and never abort
//! the run; outcomes land in a slot per manifest position so completion order
//! has no effect on the summary or the output bundle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::answer_key::MarkingKeys;
use crate::bundle::{assign_folders, InputBundle, OutputBundle};
use crate::concept_map::ConceptMap;
use crate::error::{ErrorKind, StudentError};
use crate::manifest::{Manifest, ManifestEntry};
use crate::model::SheetKind;
use crate::pipeline::{mark_student, SheetImages, StudentMarking};
use crate::report::{BatchOutcome, BatchSummary};
use crate::traits::{Artifact, ArtifactRenderer, Detector};

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum students processed at once.
    pub parallelism: usize,
    /// Upper bound on one student's pipeline, detection included.
    pub student_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            student_timeout: Duration::from_secs(60),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    /// `index` is the 1-based manifest position.
    fn on_student_start(&self, index: usize, student: &str);
    fn on_student_complete(&self, outcome: &BatchOutcome);
    fn on_batch_complete(&self, summary: &BatchSummary, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_student_start(&self, _: usize, _: &str) {}
    fn on_student_complete(&self, _: &BatchOutcome) {}
    fn on_batch_complete(&self, _: &BatchSummary, _: Duration) {}
}

/// Stops a run from dispatching further students.
///
/// Students already past dispatch finish normally; the rest are recorded as
/// [`ErrorKind::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub summary: BatchSummary,
    pub bundle: OutputBundle,
    pub elapsed: Duration,
}

type StudentWork = Result<(StudentMarking, Vec<Artifact>), StudentError>;

/// Drives the pipeline across a manifest.
///
/// Answer keys and the concept map are built once per session and shared
/// read-only by every student in every run.
pub struct BatchOrchestrator {
    detector: Arc<dyn Detector>,
    renderer: Arc<dyn ArtifactRenderer>,
    keys: Arc<MarkingKeys>,
    concepts: Arc<ConceptMap>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(
        detector: Arc<dyn Detector>,
        renderer: Arc<dyn ArtifactRenderer>,
        keys: Arc<MarkingKeys>,
        concepts: Arc<ConceptMap>,
        config: BatchConfig,
    ) -> Self {
        Self {
            detector,
            renderer,
            keys,
            concepts,
            config,
        }
    }

    /// Mark every student in `manifest`.
    ///
    /// Only a failure to render the root summary files fails the run; every
    /// per-student problem becomes a [`BatchOutcome`].
    pub async fn run(
        &self,
        manifest: &Manifest,
        inputs: &InputBundle,
        cancel: &CancelToken,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchRun> {
        let start = Instant::now();
        let entries = manifest.entries();
        let folders = assign_folders(
            entries.iter().map(|e| e.student_name.as_str()),
            &self.renderer.summary_names(),
        );
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

        tracing::info!(
            students = entries.len(),
            parallelism = self.config.parallelism,
            detector = self.detector.name(),
            "batch started"
        );

        let mut futures = FuturesUnordered::new();
        for (slot, entry) in entries.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (slot, Err(StudentError::Cancelled));
                };
                if cancel.is_cancelled() {
                    return (slot, Err(StudentError::Cancelled));
                }
                progress.on_student_start(slot + 1, &entry.student_name);
                let timeout = self.config.student_timeout;
                let work = tokio::time::timeout(timeout, self.process(entry, inputs))
                    .await
                    .unwrap_or_else(|_| Err(StudentError::Timeout(timeout)));
                (slot, work)
            });
        }

        let mut slots: Vec<Option<(BatchOutcome, Vec<Artifact>)>> =
            (0..entries.len()).map(|_| None).collect();

        while let Some((slot, work)) = futures.next().await {
            let entry = &entries[slot];
            let folder = &folders[slot];
            let filled = match work {
                Ok((marking, artifacts)) => {
                    tracing::debug!(student = %entry.student_name, %folder, "student marked");
                    let outcome = BatchOutcome::success(
                        slot + 1,
                        &entry.student_name,
                        folder,
                        entry.writing_score,
                        marking.analysis,
                    );
                    (outcome, artifacts)
                }
                Err(e) => {
                    log_failure(entry, &e);
                    let outcome = BatchOutcome::failure(
                        slot + 1,
                        &entry.student_name,
                        folder,
                        entry.writing_score,
                        &e,
                    );
                    (outcome, Vec::new())
                }
            };
            progress.on_student_complete(&filled.0);
            slots[slot] = Some(filled);
        }

        let mut bundle = OutputBundle::new();
        let mut outcomes = Vec::with_capacity(entries.len());
        for (slot, filled) in slots.into_iter().enumerate() {
            let (outcome, artifacts) = filled.unwrap_or_else(|| {
                let entry = &entries[slot];
                let outcome = BatchOutcome::failure(
                    slot + 1,
                    &entry.student_name,
                    &folders[slot],
                    entry.writing_score,
                    &StudentError::Cancelled,
                );
                (outcome, Vec::new())
            });
            for artifact in artifacts {
                let path = format!(
                    "{}/{}",
                    outcome.folder,
                    artifact.file_name(&outcome.folder)
                );
                bundle.insert(path, artifact.bytes);
            }
            outcomes.push(outcome);
        }

        let summary = BatchSummary::new(outcomes);
        let root_files = self
            .renderer
            .render_summary(&summary)
            .context("failed to render batch summary")?;
        for artifact in root_files {
            bundle.insert(artifact.root_name(), artifact.bytes);
        }

        let elapsed = start.elapsed();
        tracing::info!(
            succeeded = summary.success_count(),
            failed = summary.failure_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "batch complete"
        );
        progress.on_batch_complete(&summary, elapsed);

        Ok(BatchRun {
            summary,
            bundle,
            elapsed,
        })
    }

    async fn process(&self, entry: &ManifestEntry, inputs: &InputBundle) -> StudentWork {
        let mut sheets = SheetImages::new();
        for (sheet, key) in [
            (SheetKind::Reading, &entry.reading_file_key),
            (SheetKind::QrAr, &entry.qrar_file_key),
        ] {
            let bytes = inputs
                .get(key)
                .ok_or_else(|| StudentError::MissingInput(key.clone()))?;
            sheets.insert(sheet, bytes.to_vec());
        }

        let marking = mark_student(
            self.detector.as_ref(),
            &self.keys,
            &self.concepts,
            &entry.student_name,
            entry.writing_score,
            &sheets,
        )
        .await?;

        let artifacts = self
            .renderer
            .render(&marking)
            .map_err(StudentError::Render)?;
        Ok((marking, artifacts))
    }
}

fn log_failure(entry: &ManifestEntry, error: &StudentError) {
    let student = entry.student_name.as_str();
    match error.kind() {
        ErrorKind::EvaluationError => {
            tracing::error!(student, error = %error, "evaluation contract violated")
        }
        ErrorKind::Cancelled => tracing::debug!(student, "cancelled before dispatch"),
        kind => tracing::warn!(student, %kind, error = %error, "student failed"),
    }
}
