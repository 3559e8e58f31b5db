//! Concept map: per-subject grouping of question labels into learning areas.
//!
//! Validation happens once, at load time. After parsing, every label belongs
//! to at most one area within its subject, and area order is the order the
//! areas appear in the source document.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

/// Keys with this leading marker are metadata and skipped by validation.
pub const METADATA_MARKER: char = '_';

/// A named learning area and the questions that count towards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningArea {
    pub name: String,
    pub questions: Vec<String>,
}

/// All learning areas of one subject, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubjectConcepts {
    pub subject: String,
    pub areas: Vec<LearningArea>,
}

impl SubjectConcepts {
    pub fn area_names(&self) -> impl Iterator<Item = &str> {
        self.areas.iter().map(|a| a.name.as_str())
    }
}

/// Validated mapping subject → area → question labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConceptMap {
    subjects: Vec<SubjectConcepts>,
}

impl ConceptMap {
    /// An empty map: every subject analyses as all-unmapped.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and validate a concept map from JSON text.
    ///
    /// Repeated subject or area keys are rejected rather than letting the
    /// last one win.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let node: Node = serde_json::from_str(raw)
            .map_err(|e| ValidationError::MalformedConceptMap(e.to_string()))?;
        Self::from_node(node)
    }

    /// Validate an already-decoded JSON document.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_node(Node::from(value))
    }

    fn from_node(node: Node) -> Result<Self, ValidationError> {
        let Node::Object(root) = node else {
            return Err(ValidationError::ConceptMapNotObject);
        };

        let mut seen = HashSet::new();
        let mut subjects = Vec::new();
        for (subject, areas) in root {
            if subject.starts_with(METADATA_MARKER) {
                continue;
            }
            if !seen.insert(subject.clone()) {
                return Err(ValidationError::DuplicateConceptSubject(subject));
            }
            subjects.push(parse_subject(&subject, areas)?);
        }

        Ok(Self { subjects })
    }

    /// Read and validate a concept map file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read concept map: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid concept map: {}", path.display()))
    }

    pub fn subject(&self, name: &str) -> Option<&SubjectConcepts> {
        self.subjects.iter().find(|s| s.subject == name)
    }

    pub fn subjects(&self) -> &[SubjectConcepts] {
        &self.subjects
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

fn parse_subject(subject: &str, areas: Node) -> Result<SubjectConcepts, ValidationError> {
    let Node::Object(areas) = areas else {
        return Err(ValidationError::SubjectNotObject {
            subject: subject.to_string(),
        });
    };

    // label -> area that claimed it first
    let mut owner: HashMap<String, String> = HashMap::new();
    let mut names: HashSet<String> = HashSet::new();
    let mut parsed = Vec::with_capacity(areas.len());

    for (area, questions) in areas {
        if !names.insert(area.clone()) {
            return Err(ValidationError::DuplicateArea {
                subject: subject.to_string(),
                area,
            });
        }
        let Node::Array(questions) = questions else {
            return Err(ValidationError::AreaNotList {
                subject: subject.to_string(),
                area,
            });
        };

        let mut labels = Vec::with_capacity(questions.len());
        for question in questions {
            let label = match question {
                Node::String(s) if !s.trim().is_empty() => s,
                _ => {
                    return Err(ValidationError::InvalidQuestionLabel {
                        subject: subject.to_string(),
                        area,
                    })
                }
            };
            if let Some(first) = owner.get(&label) {
                return Err(ValidationError::DuplicateQuestionMapping {
                    subject: subject.to_string(),
                    label,
                    first_area: first.clone(),
                    second_area: area,
                });
            }
            owner.insert(label.clone(), area.clone());
            labels.push(label);
        }

        parsed.push(LearningArea {
            name: area,
            questions: labels,
        });
    }

    Ok(SubjectConcepts {
        subject: subject.to_string(),
        areas: parsed,
    })
}

/// JSON tree that keeps every object entry in document order.
///
/// `Value` collapses repeated keys, so the map is decoded into this first.
enum Node {
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
    String(String),
    Scalar,
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                Node::Object(map.iter().map(|(k, v)| (k.clone(), Node::from(v))).collect())
            }
            Value::Array(items) => Node::Array(items.iter().map(Node::from).collect()),
            Value::String(s) => Node::String(s.clone()),
            _ => Node::Scalar,
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Node, E> {
        Ok(Node::Scalar)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Node, E> {
        Ok(Node::Scalar)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Node, E> {
        Ok(Node::Scalar)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Node, E> {
        Ok(Node::Scalar)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Scalar)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = map.next_entry::<String, Node>()? {
            entries.push(entry);
        }
        Ok(Node::Object(entries))
    }
}
