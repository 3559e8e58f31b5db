//! Core data model types for bubblemark.
//!
//! Detected marks come in from the detection collaborator; question, subject,
//! and analysis results flow out to the report renderers. Everything here is
//! built fresh per student and never mutated after construction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which physical answer sheet a subject is printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    Reading,
    #[serde(rename = "qrar")]
    QrAr,
}

impl SheetKind {
    /// Artifact name fragment used for the marked-sheet files.
    pub fn artifact_label(&self) -> &'static str {
        match self {
            SheetKind::Reading => "Reading",
            SheetKind::QrAr => "QRAR",
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetKind::Reading => write!(f, "reading"),
            SheetKind::QrAr => write!(f, "qrar"),
        }
    }
}

impl FromStr for SheetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reading" => Ok(SheetKind::Reading),
            "qrar" | "qr/ar" | "qr_ar" => Ok(SheetKind::QrAr),
            other => Err(format!("unknown sheet: {other}")),
        }
    }
}

/// Normalize an answer token: drop all whitespace and uppercase.
///
/// Answer keys and detected marks go through the same normalization so that
/// comparison is case-insensitive.
pub fn normalize_token(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_uppercase()
}

/// What the detection engine saw for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedMark {
    /// No bubble filled.
    Unmarked,
    /// Exactly one bubble filled.
    Answer(String),
    /// More than one bubble filled. Never correct, never unmarked.
    MultiMarked(Vec<String>),
}

impl DetectedMark {
    /// Build a mark from the individual bubbles the engine reported.
    pub fn from_marks<I, S>(marks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: Vec<String> = marks
            .into_iter()
            .map(|m| normalize_token(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        match tokens.len() {
            0 => DetectedMark::Unmarked,
            1 => DetectedMark::Answer(tokens.remove(0)),
            _ => DetectedMark::MultiMarked(tokens),
        }
    }

    /// Text shown on reports. Multi-marks are joined with `/`.
    pub fn display(&self) -> String {
        match self {
            DetectedMark::Unmarked => String::new(),
            DetectedMark::Answer(a) => a.clone(),
            DetectedMark::MultiMarked(marks) => marks.join("/"),
        }
    }
}

impl Serialize for DetectedMark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DetectedMark::Unmarked => serializer.serialize_str(""),
            DetectedMark::Answer(a) => serializer.serialize_str(a),
            DetectedMark::MultiMarked(marks) => marks.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DetectedMark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::One(s) => DetectedMark::from_marks([s]),
            Wire::Many(v) => DetectedMark::from_marks(v),
        })
    }
}

/// Detected marks for one sheet, keyed by question label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectedResponses(pub BTreeMap<String, DetectedMark>);

impl DetectedResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, mark: DetectedMark) {
        self.0.insert(label.into(), mark);
    }

    /// The mark for `label`, or [`DetectedMark::Unmarked`] when it was not scanned.
    pub fn get(&self, label: &str) -> &DetectedMark {
        static UNMARKED: DetectedMark = DetectedMark::Unmarked;
        self.0.get(label).unwrap_or(&UNMARKED)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, DetectedMark)> for DetectedResponses {
    fn from_iter<T: IntoIterator<Item = (K, DetectedMark)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Verdict for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub label: String,
    /// Empty when unmarked.
    pub detected: String,
    pub expected: String,
    pub is_correct: bool,
    pub is_unmarked: bool,
    #[serde(default)]
    pub is_multi_marked: bool,
}

/// Totals and per-question verdicts for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub subject_name: String,
    pub sheet: SheetKind,
    pub correct: usize,
    pub incorrect: usize,
    pub unmarked: usize,
    pub total: usize,
    pub percentage: f64,
    pub questions: Vec<QuestionResult>,
}

/// `100 * part / whole`, defined as 0.0 when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Aggregated correctness for one learning area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningAreaResult {
    pub area: String,
    pub correct: usize,
    pub total: usize,
    /// Unrounded; round only for display.
    pub percentage: f64,
    pub is_strength: bool,
}

/// Strengths and improvement areas for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAnalysis {
    pub subject: String,
    /// Whole-subject score, independent of area mapping.
    pub score: ScoreTotals,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub area_details: Vec<LearningAreaResult>,
    pub unmapped_questions: Vec<String>,
}

/// Combined raw score for the subjects printed on one sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTotals {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ScoreTotals {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a SubjectResult>) -> Self {
        let (correct, total) = results
            .into_iter()
            .fold((0, 0), |(c, t), r| (c + r.correct, t + r.total));
        Self {
            correct,
            total,
            percentage: percentage(correct, total),
        }
    }
}

/// Read-only analysis snapshot for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub student_name: String,
    pub writing_score: u32,
    pub per_subject: Vec<SubjectAnalysis>,
    pub reading_totals: ScoreTotals,
    pub qr_ar_totals: ScoreTotals,
}

impl FullAnalysis {
    pub fn subject(&self, name: &str) -> Option<&SubjectAnalysis> {
        self.per_subject.iter().find(|s| s.subject == name)
    }
}
