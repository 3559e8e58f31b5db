//! Batch manifest loading and validation.
//!
//! A manifest is an ordered list of students, either as a bare JSON array or
//! wrapped as `{"students": [...]}`. Every entry problem is collected so the
//! operator sees all of them at once.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ManifestError;

/// Highest accepted manual writing score.
pub const MAX_WRITING_SCORE: u32 = 100;

/// One student in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "name")]
    pub student_name: String,
    pub writing_score: u32,
    #[serde(rename = "reading_file")]
    pub reading_file_key: String,
    #[serde(rename = "qrar_file")]
    pub qrar_file_key: String,
}

/// Ordered, validated list of students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawManifest {
    List(Vec<Value>),
    Wrapped { students: Vec<Value> },
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, ManifestError> {
        if entries.is_empty() {
            return Err(ManifestError::Empty);
        }
        let mut errors = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            check_entry(i + 1, entry, &mut errors);
        }
        if !errors.is_empty() {
            return Err(ManifestError::Invalid(errors));
        }
        Ok(Self { entries })
    }

    /// Parse and validate a manifest from JSON text.
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        let students = match serde_json::from_str::<RawManifest>(raw)? {
            RawManifest::List(v) | RawManifest::Wrapped { students: v } => v,
        };
        if students.is_empty() {
            return Err(ManifestError::Empty);
        }

        let mut errors = Vec::new();
        let mut entries = Vec::with_capacity(students.len());
        for (i, student) in students.iter().enumerate() {
            if let Some(entry) = parse_entry(i + 1, student, &mut errors) {
                entries.push(entry);
            }
        }

        if !errors.is_empty() {
            return Err(ManifestError::Invalid(errors));
        }
        Ok(Self { entries })
    }

    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid manifest: {}", path.display()))
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(index: usize, value: &Value, errors: &mut Vec<String>) -> Option<ManifestEntry> {
    let Value::Object(obj) = value else {
        errors.push(format!("Student entry #{index} must be an object."));
        return None;
    };

    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let name = text("name");
    let who = name.clone().unwrap_or_else(|| format!("#{index}"));
    if name.is_none() {
        errors.push(format!("Student #{index} is missing a valid name."));
    }

    let writing_score = obj
        .get("writing_score")
        .and_then(Value::as_u64)
        .and_then(|s| u32::try_from(s).ok())
        .filter(|s| *s <= MAX_WRITING_SCORE);
    if writing_score.is_none() {
        errors.push(format!(
            "Student '{who}' has an invalid writing score (0-{MAX_WRITING_SCORE})."
        ));
    }

    let reading = text("reading_file");
    if reading.is_none() {
        errors.push(format!("Student '{who}' must specify 'reading_file'."));
    }
    let qrar = text("qrar_file");
    if qrar.is_none() {
        errors.push(format!("Student '{who}' must specify 'qrar_file'."));
    }

    Some(ManifestEntry {
        student_name: name?,
        writing_score: writing_score?,
        reading_file_key: reading?,
        qrar_file_key: qrar?,
    })
}

fn check_entry(index: usize, entry: &ManifestEntry, errors: &mut Vec<String>) {
    if entry.student_name.trim().is_empty() {
        errors.push(format!("Student #{index} is missing a valid name."));
    }
    if entry.writing_score > MAX_WRITING_SCORE {
        errors.push(format!(
            "Student '{}' has an invalid writing score (0-{MAX_WRITING_SCORE}).",
            entry.student_name
        ));
    }
    if entry.reading_file_key.trim().is_empty() {
        errors.push(format!(
            "Student '{}' must specify 'reading_file'.",
            entry.student_name
        ));
    }
    if entry.qrar_file_key.trim().is_empty() {
        errors.push(format!(
            "Student '{}' must specify 'qrar_file'.",
            entry.student_name
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "students": [
            {"name": "Ada Lovelace", "writing_score": 40, "reading_file": "ada_reading.png", "qrar_file": "ada_qrar.png"},
            {"name": "Alan Turing", "writing_score": 0, "reading_file": "scans/alan_r.png", "qrar_file": "scans/alan_q.png"}
        ]
    }"#;

    #[test]
    fn parse_wrapped_manifest() {
        let manifest = Manifest::parse(VALID).unwrap();
        assert_eq!(manifest.len(), 2);
        let first = &manifest.entries()[0];
        assert_eq!(first.student_name, "Ada Lovelace");
        assert_eq!(first.writing_score, 40);
        assert_eq!(first.reading_file_key, "ada_reading.png");
        assert_eq!(manifest.entries()[1].qrar_file_key, "scans/alan_q.png");
    }

    #[test]
    fn parse_bare_list() {
        let json = r#"[{"name": "Sam", "writing_score": 10, "reading_file": "r.png", "qrar_file": "q.png"}]"#;
        assert_eq!(Manifest::parse(json).unwrap().len(), 1);
    }

    #[test]
    fn empty_manifest_is_structural_error() {
        assert!(matches!(
            Manifest::parse(r#"{"students": []}"#),
            Err(ManifestError::Empty)
        ));
        assert!(matches!(Manifest::parse("[]"), Err(ManifestError::Empty)));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            Manifest::parse("{students"),
            Err(ManifestError::Malformed(_))
        ));
    }

    #[test]
    fn collects_every_problem() {
        let json = r#"[
            {"name": " ", "writing_score": 10, "reading_file": "r.png", "qrar_file": "q.png"},
            {"name": "Sam", "writing_score": 101, "reading_file": "", "qrar_file": "q.png"},
            "not an object"
        ]"#;
        let Err(ManifestError::Invalid(errors)) = Manifest::parse(json) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("#1 is missing a valid name"));
        assert!(errors[1].contains("'Sam' has an invalid writing score"));
        assert!(errors[2].contains("'Sam' must specify 'reading_file'"));
        assert!(errors[3].contains("#3 must be an object"));
    }

    #[test]
    fn negative_writing_score_is_rejected() {
        let json = r#"[{"name": "Sam", "writing_score": -1, "reading_file": "r", "qrar_file": "q"}]"#;
        assert!(matches!(
            Manifest::parse(json),
            Err(ManifestError::Invalid(_))
        ));
    }

    #[test]
    fn new_validates_entries() {
        let entry = ManifestEntry {
            student_name: "Sam".into(),
            writing_score: 200,
            reading_file_key: "r".into(),
            qrar_file_key: "q".into(),
        };
        assert!(Manifest::new(vec![entry]).is_err());
        assert!(matches!(Manifest::new(vec![]), Err(ManifestError::Empty)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, VALID).unwrap();
        assert_eq!(Manifest::load(&path).unwrap().len(), 2);
        assert!(Manifest::load(&dir.path().join("missing.json")).is_err());
    }
}
