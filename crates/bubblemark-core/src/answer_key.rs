//! Answer-key parsing and the per-session marking keys.
//!
//! Two text encodings are accepted: `line` (one answer per line, position is
//! the line number) and `pairs` (`label,value` per line, labels numbered
//! from 1 without gaps).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{normalize_token, SheetKind};

/// Text encoding of an answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    Line,
    Pairs,
}

impl KeyFormat {
    /// Guess the format: anything containing a comma is `pairs`.
    pub fn detect(raw: &str) -> Self {
        if raw.contains(',') {
            KeyFormat::Pairs
        } else {
            KeyFormat::Line
        }
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFormat::Line => write!(f, "line"),
            KeyFormat::Pairs => write!(f, "pairs"),
        }
    }
}

impl FromStr for KeyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" | "lines" => Ok(KeyFormat::Line),
            "pairs" | "csv" => Ok(KeyFormat::Pairs),
            other => Err(format!("unknown answer key format: {other}")),
        }
    }
}

/// Ordered expected answers for one subject, 1-indexed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    answers: Vec<String>,
}

impl AnswerKey {
    /// Parse an answer key from its text encoding.
    ///
    /// In `pairs` form the label prefix is whatever the first line uses.
    /// Use [`AnswerKey::parse_for`] when the subject's prefix is known.
    pub fn parse(raw: &str, format: KeyFormat) -> Result<Self, ValidationError> {
        Self::parse_with(raw, format, None)
    }

    /// Parse a key whose `pairs` labels must carry exactly `prefix`.
    pub fn parse_for(raw: &str, format: KeyFormat, prefix: &str) -> Result<Self, ValidationError> {
        Self::parse_with(raw, format, Some(prefix))
    }

    fn parse_with(
        raw: &str,
        format: KeyFormat,
        prefix: Option<&str>,
    ) -> Result<Self, ValidationError> {
        // Spreadsheet exports often lead with a UTF-8 byte order mark.
        let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        // Trailing newlines carry no position.
        let text = text.trim_end();
        let answers = match format {
            KeyFormat::Line => parse_lines(text)?,
            KeyFormat::Pairs => parse_pairs(text, prefix)?,
        };
        if answers.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        Ok(Self { answers })
    }

    /// Build a key directly from answer tokens (normalized on the way in).
    pub fn from_answers<I, S>(answers: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let answers: Vec<String> = answers
            .into_iter()
            .map(|a| normalize_token(a.as_ref()))
            .collect();
        if answers.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        if let Some(pos) = answers.iter().position(String::is_empty) {
            return Err(ValidationError::EmptyAnswer {
                label: (pos + 1).to_string(),
            });
        }
        Ok(Self { answers })
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Expected answer at 1-based `position`.
    pub fn get(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.answers.get(i))
            .map(String::as_str)
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }
}

fn parse_lines(text: &str) -> Result<Vec<String>, ValidationError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let token = normalize_token(line);
            if token.is_empty() {
                Err(ValidationError::BlankLine { line: i + 1 })
            } else {
                Ok(token)
            }
        })
        .collect()
}

/// Split a label into its non-numeric prefix and trailing number.
fn split_label(label: &str) -> (&str, Option<usize>) {
    let digits_at = label
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);
    match digits_at {
        Some(i) => (&label[..i], label[i..].parse().ok()),
        None => (label, None),
    }
}

fn parse_pairs(text: &str, fixed_prefix: Option<&str>) -> Result<Vec<String>, ValidationError> {
    let mut answers = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut prefix: Option<String> = fixed_prefix.map(str::to_string);

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((label, value)) = line.split_once(',') else {
            return Err(ValidationError::MalformedPair {
                line: i + 1,
                content: line.to_string(),
            });
        };
        if value.contains(',') {
            return Err(ValidationError::MalformedPair {
                line: i + 1,
                content: line.to_string(),
            });
        }
        let label = label.trim();
        let prefix = prefix.get_or_insert_with(|| split_label(label).0.to_string());
        let expected = format!("{prefix}{}", answers.len() + 1);

        if label != expected {
            if seen.contains(label) {
                return Err(ValidationError::DuplicateLabel {
                    label: label.to_string(),
                });
            }
            return Err(ValidationError::UnexpectedLabel {
                label: label.to_string(),
                expected,
            });
        }

        let value = normalize_token(value);
        if value.is_empty() {
            return Err(ValidationError::EmptyAnswer {
                label: label.to_string(),
            });
        }
        seen.insert(label.to_string());
        answers.push(value);
    }

    Ok(answers)
}

/// Template identifiers handed to the detection engine, one per sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTemplates {
    #[serde(default = "default_reading_template")]
    pub reading: String,
    #[serde(default = "default_qrar_template")]
    pub qrar: String,
}

fn default_reading_template() -> String {
    "aset_reading_template.json".to_string()
}

fn default_qrar_template() -> String {
    "aset_qrar_template.json".to_string()
}

impl Default for SheetTemplates {
    fn default() -> Self {
        Self {
            reading: default_reading_template(),
            qrar: default_qrar_template(),
        }
    }
}

impl SheetTemplates {
    pub fn for_sheet(&self, sheet: SheetKind) -> &str {
        match sheet {
            SheetKind::Reading => &self.reading,
            SheetKind::QrAr => &self.qrar,
        }
    }
}

/// One configured subject: where it is printed and how its questions are labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectKey {
    pub name: String,
    pub sheet: SheetKind,
    pub label_prefix: String,
    pub key: AnswerKey,
}

impl SubjectKey {
    pub fn new(
        name: impl Into<String>,
        sheet: SheetKind,
        label_prefix: impl Into<String>,
        key: AnswerKey,
    ) -> Self {
        Self {
            name: name.into(),
            sheet,
            label_prefix: label_prefix.into(),
            key,
        }
    }

    /// Question label at 1-based `position`.
    pub fn label(&self, position: usize) -> String {
        format!("{}{position}", self.label_prefix)
    }

    /// If `label` belongs to this subject, its question number.
    ///
    /// Labels whose suffix after the prefix is not purely numeric belong to
    /// another subject (`QR1` is not a question of prefix `Q`).
    pub fn position_of(&self, label: &str) -> Option<usize> {
        let rest = label.strip_prefix(self.label_prefix.as_str())?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }
}

/// Every answer key for a marking session, shared read-only across students.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkingKeys {
    subjects: Vec<SubjectKey>,
    templates: SheetTemplates,
}

impl MarkingKeys {
    pub fn new(
        subjects: Vec<SubjectKey>,
        templates: SheetTemplates,
    ) -> Result<Self, ValidationError> {
        let mut names = HashSet::new();
        let mut prefixes = HashSet::new();
        for subject in &subjects {
            if !names.insert(subject.name.as_str()) {
                return Err(ValidationError::DuplicateSubject(subject.name.clone()));
            }
            if subject.label_prefix.is_empty() {
                return Err(ValidationError::EmptyPrefix(subject.name.clone()));
            }
            if !prefixes.insert((subject.sheet, subject.label_prefix.as_str())) {
                return Err(ValidationError::DuplicatePrefix {
                    prefix: subject.label_prefix.clone(),
                    sheet: subject.sheet.to_string(),
                });
            }
            if subject.key.is_empty() {
                return Err(ValidationError::EmptyKey);
            }
        }
        Ok(Self {
            subjects,
            templates,
        })
    }

    pub fn subjects(&self) -> &[SubjectKey] {
        &self.subjects
    }

    pub fn subjects_on(&self, sheet: SheetKind) -> impl Iterator<Item = &SubjectKey> {
        self.subjects.iter().filter(move |s| s.sheet == sheet)
    }

    /// Sheets that carry at least one configured subject, in sheet order.
    pub fn sheets(&self) -> Vec<SheetKind> {
        let mut sheets: Vec<SheetKind> = self.subjects.iter().map(|s| s.sheet).collect();
        sheets.sort();
        sheets.dedup();
        sheets
    }

    pub fn templates(&self) -> &SheetTemplates {
        &self.templates
    }

    pub fn question_count(&self, sheet: SheetKind) -> usize {
        self.subjects_on(sheet).map(|s| s.key.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_format_normalizes() {
        let key = AnswerKey::parse("a\n B \nc\nD\n", KeyFormat::Line).unwrap();
        assert_eq!(key.answers(), ["A", "B", "C", "D"]);
        assert_eq!(key.get(1), Some("A"));
        assert_eq!(key.get(4), Some("D"));
        assert_eq!(key.get(0), None);
        assert_eq!(key.get(5), None);
    }

    #[test]
    fn line_format_rejects_interior_blank_line() {
        let err = AnswerKey::parse("A\n\nC", KeyFormat::Line).unwrap_err();
        assert_eq!(err, ValidationError::BlankLine { line: 2 });

        let err = AnswerKey::parse("A\n   \nC", KeyFormat::Line).unwrap_err();
        assert_eq!(err, ValidationError::BlankLine { line: 2 });
    }

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(
            AnswerKey::parse("", KeyFormat::Line).unwrap_err(),
            ValidationError::EmptyKey
        );
        assert_eq!(
            AnswerKey::parse("\n\n  \n", KeyFormat::Pairs).unwrap_err(),
            ValidationError::EmptyKey
        );
    }

    #[test]
    fn parse_pairs_format() {
        let key = AnswerKey::parse("q1,a\nq2, b\nq3,C\n", KeyFormat::Pairs).unwrap();
        assert_eq!(key.answers(), ["A", "B", "C"]);
    }

    #[test]
    fn pairs_with_bare_numbers() {
        let key = AnswerKey::parse("1,A\n2,B", KeyFormat::Pairs).unwrap();
        assert_eq!(key.len(), 2);
    }

    #[test]
    fn pairs_gap_names_offending_label() {
        let err = AnswerKey::parse("q1,A\nq3,C", KeyFormat::Pairs).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnexpectedLabel {
                label: "q3".into(),
                expected: "q2".into()
            }
        );
    }

    #[test]
    fn pairs_duplicate_names_offending_label() {
        let err = AnswerKey::parse("q1,A\nq1,B", KeyFormat::Pairs).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateLabel { label: "q1".into() });
    }

    #[test]
    fn pairs_must_start_at_one() {
        let err = AnswerKey::parse("q2,A", KeyFormat::Pairs).unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedLabel { ref label, .. } if label == "q2"));
    }

    #[test]
    fn pairs_label_case_is_preserved() {
        let err = AnswerKey::parse("Q1,A\nq2,B", KeyFormat::Pairs).unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedLabel { ref label, .. } if label == "q2"));
    }

    #[test]
    fn pairs_reject_missing_comma_and_empty_value() {
        let err = AnswerKey::parse("q1,A\nq2 B", KeyFormat::Pairs).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPair { line: 2, .. }));

        let err = AnswerKey::parse("q1, ", KeyFormat::Pairs).unwrap_err();
        assert_eq!(err, ValidationError::EmptyAnswer { label: "q1".into() });
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let key = AnswerKey::parse("\u{feff}A\nB\nC\n", KeyFormat::Line).unwrap();
        assert_eq!(key.answers(), ["A", "B", "C"]);

        let key = AnswerKey::parse_for("\u{feff}RC1,A\nRC2,B\n", KeyFormat::Pairs, "RC").unwrap();
        assert_eq!(key.answers(), ["A", "B"]);
    }

    #[test]
    fn pairs_labels_must_use_subject_prefix() {
        let err = AnswerKey::parse_for("x1,A\nx2,B", KeyFormat::Pairs, "RC").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnexpectedLabel {
                label: "x1".into(),
                expected: "RC1".into()
            }
        );

        let err = AnswerKey::parse_for("1,A\n2,B", KeyFormat::Pairs, "QR").unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedLabel { ref expected, .. } if expected == "QR1"));

        let key = AnswerKey::parse_for("QR1,A\nQR2,d", KeyFormat::Pairs, "QR").unwrap();
        assert_eq!(key.answers(), ["A", "D"]);
    }

    #[test]
    fn detect_format() {
        assert_eq!(KeyFormat::detect("A\nB"), KeyFormat::Line);
        assert_eq!(KeyFormat::detect("1,A\n2,B"), KeyFormat::Pairs);
        assert_eq!("csv".parse::<KeyFormat>().unwrap(), KeyFormat::Pairs);
    }

    #[test]
    fn subject_label_positions() {
        let key = AnswerKey::from_answers(["A", "B"]).unwrap();
        let subject = SubjectKey::new("Quantitative Reasoning", SheetKind::QrAr, "QR", key);
        assert_eq!(subject.label(2), "QR2");
        assert_eq!(subject.position_of("QR12"), Some(12));
        assert_eq!(subject.position_of("QR"), None);
        assert_eq!(subject.position_of("AR1"), None);

        let q = SubjectKey::new("Q", SheetKind::QrAr, "Q", AnswerKey::from_answers(["A"]).unwrap());
        assert_eq!(q.position_of("QR1"), None);
    }

    #[test]
    fn marking_keys_reject_duplicate_prefix_on_same_sheet() {
        let key = AnswerKey::from_answers(["A"]).unwrap();
        let err = MarkingKeys::new(
            vec![
                SubjectKey::new("QR", SheetKind::QrAr, "Q", key.clone()),
                SubjectKey::new("AR", SheetKind::QrAr, "Q", key.clone()),
            ],
            SheetTemplates::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicatePrefix { .. }));

        // Same prefix on different sheets is fine.
        let keys = MarkingKeys::new(
            vec![
                SubjectKey::new("Reading", SheetKind::Reading, "Q", key.clone()),
                SubjectKey::new("QR", SheetKind::QrAr, "Q", key),
            ],
            SheetTemplates::default(),
        )
        .unwrap();
        assert_eq!(keys.sheets(), vec![SheetKind::Reading, SheetKind::QrAr]);
    }

    #[test]
    fn marking_keys_reject_duplicate_subject() {
        let key = AnswerKey::from_answers(["A"]).unwrap();
        let err = MarkingKeys::new(
            vec![
                SubjectKey::new("Reading", SheetKind::Reading, "RC", key.clone()),
                SubjectKey::new("Reading", SheetKind::QrAr, "QR", key),
            ],
            SheetTemplates::default(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateSubject("Reading".into()));
    }
}
