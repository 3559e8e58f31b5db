//! The `bubblemark validate` command.

use std::path::PathBuf;

use anyhow::Result;

use bubblemark_core::model::SheetKind;
use bubblemark_detect::load_config_from;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let keys = config.load_keys()?;
    let concepts = config.load_concept_map()?;

    for subject in keys.subjects() {
        let mapped = match concepts.subject(&subject.name) {
            Some(c) => format!("{} learning areas", c.areas.len()),
            None => "no learning areas".to_string(),
        };
        println!(
            "{} ({} sheet, {}1..{}{}): {} questions, {mapped}",
            subject.name,
            subject.sheet,
            subject.label_prefix,
            subject.label_prefix,
            subject.key.len(),
            subject.key.len(),
        );
    }

    for sheet in [SheetKind::Reading, SheetKind::QrAr] {
        let count = keys.question_count(sheet);
        if count > 0 {
            println!(
                "{sheet} sheet: {count} questions, template {}",
                keys.templates().for_sheet(sheet)
            );
        }
    }

    for subject in concepts.subjects() {
        if keys.subjects().iter().all(|k| k.name != subject.subject) {
            println!(
                "WARNING: concept map subject '{}' has no answer key",
                subject.subject
            );
        }
    }

    println!("Marking setup valid.");
    Ok(())
}
