//! Marking configuration and detector factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use bubblemark_core::answer_key::{AnswerKey, KeyFormat, MarkingKeys, SheetTemplates, SubjectKey};
use bubblemark_core::concept_map::ConceptMap;
use bubblemark_core::engine::BatchConfig;
use bubblemark_core::model::SheetKind;
use bubblemark_core::traits::Detector;

use crate::http::HttpDetector;
use crate::json::JsonDetector;

/// Which detection engine to call.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetectorConfig {
    /// External OMR engine reached over HTTP.
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_request_timeout")]
        timeout_secs: u64,
    },
    /// Sheets are already-detected JSON response maps.
    Json,
}

impl std::fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorConfig::Http {
                base_url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            DetectorConfig::Json => f.write_str("Json"),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::Http {
            base_url: default_detector_url(),
            api_key: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_detector_url() -> String {
    "http://localhost:8700".to_string()
}
fn default_request_timeout() -> u64 {
    30
}

/// One subject to mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub name: String,
    pub sheet: SheetKind,
    pub label_prefix: String,
    /// Path to the answer key, relative to the config file.
    pub answer_key: PathBuf,
    /// Auto-detected from the file content when absent.
    #[serde(default)]
    pub format: Option<KeyFormat>,
}

impl SubjectConfig {
    fn new(name: &str, sheet: SheetKind, prefix: &str, key_file: &str) -> Self {
        Self {
            name: name.to_string(),
            sheet,
            label_prefix: prefix.to_string(),
            answer_key: PathBuf::from("keys").join(key_file),
            format: None,
        }
    }
}

/// Top-level bubblemark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkingConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Subjects in report order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<SubjectConfig>,
    #[serde(default)]
    pub templates: SheetTemplates,
    /// Optional concept-map JSON, relative to the config file.
    #[serde(default)]
    pub concept_map: Option<PathBuf>,
    /// Max concurrent students in a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_student_timeout")]
    pub student_timeout_secs: u64,
    /// Output directory for results.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_subjects() -> Vec<SubjectConfig> {
    vec![
        SubjectConfig::new("Reading", SheetKind::Reading, "RC", "reading.txt"),
        SubjectConfig::new("Quantitative Reasoning", SheetKind::QrAr, "QR", "qr.txt"),
        SubjectConfig::new("Abstract Reasoning", SheetKind::QrAr, "AR", "ar.txt"),
    ]
}
fn default_parallelism() -> usize {
    4
}
fn default_student_timeout() -> u64 {
    60
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./bubblemark-results")
}

impl Default for MarkingConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            subjects: default_subjects(),
            templates: SheetTemplates::default(),
            concept_map: None,
            parallelism: default_parallelism(),
            student_timeout_secs: default_student_timeout(),
            output_dir: default_output_dir(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl MarkingConfig {
    /// Resolve `path` against the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Read and validate every configured answer key.
    pub fn load_keys(&self) -> Result<MarkingKeys> {
        let mut subjects = Vec::with_capacity(self.subjects.len());
        for subject in &self.subjects {
            let path = self.resolve(&subject.answer_key);
            let raw = std::fs::read_to_string(&path).with_context(|| {
                format!(
                    "failed to read answer key for '{}': {}",
                    subject.name,
                    path.display()
                )
            })?;
            let format = subject.format.unwrap_or_else(|| KeyFormat::detect(&raw));
            let key = AnswerKey::parse_for(&raw, format, &subject.label_prefix).with_context(|| {
                format!(
                    "invalid {format} answer key for '{}': {}",
                    subject.name,
                    path.display()
                )
            })?;
            tracing::debug!(subject = %subject.name, %format, questions = key.len(), "answer key loaded");
            subjects.push(SubjectKey::new(
                subject.name.as_str(),
                subject.sheet,
                subject.label_prefix.as_str(),
                key,
            ));
        }
        MarkingKeys::new(subjects, self.templates.clone()).context("invalid subject configuration")
    }

    /// Load the concept map, or an empty one when none is configured.
    pub fn load_concept_map(&self) -> Result<ConceptMap> {
        match &self.concept_map {
            Some(path) => ConceptMap::load(&self.resolve(path)),
            None => Ok(ConceptMap::empty()),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            parallelism: self.parallelism.max(1),
            student_timeout: Duration::from_secs(self.student_timeout_secs),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let value = std::env::var(&result[start + 2..start + len]).unwrap_or_default();
        result.replace_range(start..start + len + 1, &value);
    }
    result
}

/// Apply `${VAR}` resolution and the `BUBBLEMARK_DETECTOR_*` overrides.
fn resolve_detector_config(config: DetectorConfig) -> DetectorConfig {
    let url_override = std::env::var("BUBBLEMARK_DETECTOR_URL").ok();
    let key_override = std::env::var("BUBBLEMARK_DETECTOR_KEY").ok();

    match config {
        DetectorConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => DetectorConfig::Http {
            base_url: url_override.unwrap_or_else(|| resolve_env_vars(&base_url)),
            api_key: key_override
                .or_else(|| api_key.map(|k| resolve_env_vars(&k)))
                .filter(|k| !k.is_empty()),
            timeout_secs,
        },
        DetectorConfig::Json => DetectorConfig::Json,
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `bubblemark.toml` in the current directory
/// 2. `~/.config/bubblemark/config.toml`
///
/// Environment variable overrides: `BUBBLEMARK_DETECTOR_URL`, `BUBBLEMARK_DETECTOR_KEY`.
pub fn load_config_from(path: Option<&Path>) -> Result<MarkingConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("bubblemark.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let mut config = toml::from_str::<MarkingConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            config.base_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            config
        }
        None => MarkingConfig::default(),
    };

    config.detector = resolve_detector_config(config.detector);
    tracing::debug!(path = ?config_path, detector = ?config.detector, "configuration loaded");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("bubblemark"))
}

/// Create a detector instance from its configuration.
pub fn create_detector(config: &DetectorConfig) -> Result<Box<dyn Detector>> {
    match config {
        DetectorConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => Ok(Box::new(HttpDetector::new(
            base_url,
            api_key.clone(),
            Duration::from_secs(*timeout_secs),
        )?)),
        DetectorConfig::Json => Ok(Box::new(JsonDetector)),
    }
}
