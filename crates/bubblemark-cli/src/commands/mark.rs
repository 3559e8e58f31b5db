//! The `bubblemark mark` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use bubblemark_core::bundle::sanitize_name;
use bubblemark_core::model::SheetKind;
use bubblemark_core::pipeline::{mark_student, SheetImages};
use bubblemark_core::traits::ArtifactRenderer;
use bubblemark_detect::{create_detector, load_config_from};
use bubblemark_report::StandardRenderer;

fn read_sheet(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read sheet: {}", path.display()))
}

pub async fn execute(
    name: String,
    writing_score: u32,
    reading: PathBuf,
    qrar: PathBuf,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!name.trim().is_empty(), "student name must not be empty");

    let config = load_config_from(config_path.as_deref())?;
    let keys = config.load_keys()?;
    let concepts = config.load_concept_map()?;
    let detector = create_detector(&config.detector)?;

    let mut sheets = SheetImages::new();
    sheets.insert(SheetKind::Reading, read_sheet(&reading)?);
    sheets.insert(SheetKind::QrAr, read_sheet(&qrar)?);

    let marking = mark_student(
        detector.as_ref(),
        &keys,
        &concepts,
        &name,
        writing_score,
        &sheets,
    )
    .await
    .with_context(|| format!("failed to mark {name}"))?;

    for result in &marking.subject_results {
        println!(
            "{}: {}/{} ({:.1}%)",
            result.subject_name, result.correct, result.total, result.percentage
        );
    }
    println!("Writing: {}", marking.analysis.writing_score);

    let folder = sanitize_name(&name);
    let dir = output.unwrap_or(config.output_dir).join(&folder);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;

    for artifact in StandardRenderer.render(&marking)? {
        let path = dir.join(artifact.file_name(&folder));
        std::fs::write(&path, &artifact.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    eprintln!("Artifacts saved to: {}", dir.display());

    Ok(())
}
