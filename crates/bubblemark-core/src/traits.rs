//! Collaborator traits for bubble detection and artifact rendering.
//!
//! Detection is implemented by `bubblemark-detect`, rendering by
//! `bubblemark-report`. The core only sees these seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DetectionError;
use crate::model::DetectedResponses;
use crate::pipeline::StudentMarking;
use crate::report::BatchSummary;

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Reads bubble marks off a scanned sheet.
///
/// Implementations must be safe to call concurrently; the batch orchestrator
/// shares one detector across all in-flight students.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Human-readable detector name (e.g. "http").
    fn name(&self) -> &str;

    /// Detect the marks on one sheet image.
    async fn detect(&self, request: &DetectRequest) -> Result<DetectedResponses, DetectionError>;
}

/// A sheet image plus the template describing its bubble layout.
#[derive(Debug, Clone)]
pub struct DetectRequest {
    /// Raw image bytes as uploaded.
    pub image: Vec<u8>,
    /// Template identifier understood by the detection engine.
    pub template: String,
}

// ---------------------------------------------------------------------------
// Artifact rendering
// ---------------------------------------------------------------------------

/// Turns a marked student into downloadable files.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, marking: &StudentMarking) -> anyhow::Result<Vec<Artifact>>;

    /// Files placed at the root of a batch output bundle.
    fn render_summary(&self, _summary: &BatchSummary) -> anyhow::Result<Vec<Artifact>> {
        Ok(Vec::new())
    }

    /// Root names `render_summary` may produce. Student folders avoid them.
    fn summary_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// One rendered file. Stored as `{folder}_{kind}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What the file is (e.g. "Report", "Reading_Marked").
    pub kind: String,
    /// File extension without the dot.
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(kind: impl Into<String>, extension: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind: kind.into(),
            extension: extension.into(),
            bytes,
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}_{}.{}", self.kind, self.extension)
    }

    /// Name used for bundle-root files such as `summary.txt`.
    pub fn root_name(&self) -> String {
        format!("{}.{}", self.kind, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_file_name() {
        let a = Artifact::new("Report", "html", vec![]);
        assert_eq!(a.file_name("Ada_Lovelace"), "Ada_Lovelace_Report.html");
        assert_eq!(Artifact::new("summary", "txt", vec![]).root_name(), "summary.txt");
    }
}
