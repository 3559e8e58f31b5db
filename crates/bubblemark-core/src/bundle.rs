//! Keyed input sheets and the assembled output bundle.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::BundleError;

/// Raw sheet images keyed by their path inside the upload.
#[derive(Debug, Clone, Default)]
pub struct InputBundle {
    files: BTreeMap<String, Vec<u8>>,
}

impl InputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(key.into(), bytes);
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.files.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Load every file under `dir`, keyed by its `/`-separated relative path.
    pub fn load_dir(dir: &Path) -> Result<Self, BundleError> {
        if !dir.is_dir() {
            return Err(BundleError::NotADirectory(dir.display().to_string()));
        }
        let mut bundle = Self::new();
        bundle.load_recursive(dir, dir)?;
        tracing::debug!(files = bundle.len(), dir = %dir.display(), "loaded sheet bundle");
        Ok(bundle)
    }

    fn load_recursive(&mut self, root: &Path, dir: &Path) -> Result<(), BundleError> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| BundleError::Io { path, source }
        };

        for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.is_dir() {
                self.load_recursive(root, &path)?;
                continue;
            }
            let bytes = std::fs::read(&path).map_err(io_err(&path))?;
            let key = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            self.files.insert(key, bytes);
        }
        Ok(())
    }
}

/// Ordered path → bytes mapping produced by a batch run.
///
/// Assembly happens on a single thread after all students finish, so no
/// locking is needed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBundle {
    files: BTreeMap<String, Vec<u8>>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Paths are unique; adding the same path twice is a bug in
    /// folder assignment and is logged rather than silently overwritten.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        let path = path.into();
        if self.files.contains_key(&path) {
            tracing::error!(%path, "output bundle path written twice, keeping first");
            return;
        }
        self.files.insert(path, bytes);
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Top-level folders present in the bundle.
    pub fn folders(&self) -> Vec<&str> {
        let mut folders: Vec<&str> = self
            .files
            .keys()
            .filter_map(|p| p.split_once('/').map(|(folder, _)| folder))
            .collect();
        folders.dedup();
        folders
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file under `dir`, creating folders as needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        for (path, bytes) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, bytes)
                .with_context(|| format!("failed to write {}", target.display()))?;
        }
        Ok(())
    }
}

/// Folder-safe student name: whitespace runs become `_`, empty becomes `student`.
pub fn sanitize_name(name: &str) -> String {
    let joined = name
        .split_whitespace()
        .map(|part| {
            part.chars()
                .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() || joined.chars().all(|c| c == '.') {
        "student".to_string()
    } else {
        joined
    }
}

/// Assign a unique folder per manifest entry.
///
/// The first entry with a given sanitized name keeps it; later entries get
/// `_{n}` appended, where `n` is their 1-based manifest position. Assignment
/// depends only on manifest order, never on which students succeed.
///
/// `reserved` holds bundle-root file names no folder may take. Names are
/// compared case-insensitively so the bundle also unpacks on filesystems
/// that fold case.
pub fn assign_folders<'a>(
    names: impl IntoIterator<Item = &'a str>,
    reserved: &[String],
) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|r| r.to_lowercase()).collect();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = sanitize_name(name);
            let mut folder = base.clone();
            while taken.contains(&folder.to_lowercase()) {
                folder = format!("{folder}_{}", i + 1);
            }
            if folder != base {
                tracing::warn!(student = name, %folder, "student folder already taken, disambiguated");
            }
            taken.insert(folder.to_lowercase());
            folder
        })
        .collect()
}
