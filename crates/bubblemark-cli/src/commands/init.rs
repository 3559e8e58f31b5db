//! The `bubblemark init` command.

use std::path::Path;

use anyhow::{Context, Result};

const FILES: &[(&str, &str)] = &[
    ("bubblemark.toml", SAMPLE_CONFIG),
    ("keys/reading.txt", READING_KEY),
    ("keys/qr.txt", QR_KEY),
    ("keys/ar.txt", AR_KEY),
    ("concepts.json", SAMPLE_CONCEPTS),
];

pub fn execute() -> Result<()> {
    let existing: Vec<&str> = FILES
        .iter()
        .map(|(path, _)| *path)
        .filter(|path| Path::new(path).exists())
        .collect();
    anyhow::ensure!(
        existing.is_empty(),
        "refusing to overwrite existing files: {}",
        existing.join(", ")
    );

    std::fs::create_dir_all("keys").context("failed to create keys/")?;
    for (path, content) in FILES {
        std::fs::write(path, content).with_context(|| format!("failed to write {path}"))?;
        println!("Created {path}");
    }

    println!("\nNext steps:");
    println!("  1. Replace the sample answer keys in keys/ with your exam's keys");
    println!("  2. Point [detector] at your OMR engine");
    println!("  3. Run: bubblemark validate");
    println!("  4. Run: bubblemark batch --manifest students.json --sheets scans/");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# bubblemark configuration

concept_map = "concepts.json"
parallelism = 4
student_timeout_secs = 60
output_dir = "./bubblemark-results"

[detector]
type = "http"
base_url = "http://localhost:8700"
api_key = "${BUBBLEMARK_API_KEY}"
timeout_secs = 30

# Sheets that are already detected response maps (JSON) instead of images:
# [detector]
# type = "json"

[templates]
reading = "aset_reading_template.json"
qrar = "aset_qrar_template.json"

[[subjects]]
name = "Reading"
sheet = "reading"
label_prefix = "RC"
answer_key = "keys/reading.txt"

[[subjects]]
name = "Quantitative Reasoning"
sheet = "qrar"
label_prefix = "QR"
answer_key = "keys/qr.txt"

[[subjects]]
name = "Abstract Reasoning"
sheet = "qrar"
label_prefix = "AR"
answer_key = "keys/ar.txt"
format = "pairs"
"#;

const READING_KEY: &str = "A\nC\nB\nD\nA\nB\nC\nD\n";

const QR_KEY: &str = "B\nB\nA\nD\nC\nA\n";

const AR_KEY: &str = "AR1,C\nAR2,A\nAR3,D\nAR4,B\n";

const SAMPLE_CONCEPTS: &str = r#"{
  "_comment": "Learning areas per subject; each question label may appear in one area only.",
  "Reading": {
    "Main idea": ["RC1", "RC2", "RC3"],
    "Inference": ["RC4", "RC5", "RC6"],
    "Vocabulary in context": ["RC7", "RC8"]
  },
  "Quantitative Reasoning": {
    "Number and algebra": ["QR1", "QR2", "QR3"],
    "Data interpretation": ["QR4", "QR5", "QR6"]
  },
  "Abstract Reasoning": {
    "Patterns": ["AR1", "AR2"],
    "Spatial reasoning": ["AR3", "AR4"]
  }
}
"#;
