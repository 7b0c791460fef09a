//! Artifact enumeration and storage.
//!
//! The coordinator only needs to list, read, write and move artifacts by
//! workspace-relative path (forward slashes). [`FsArtifactStore`] walks a
//! directory tree; [`MemoryArtifactStore`] holds everything in memory for
//! tests and embedding.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Directory names never descended into.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git", ".gradle", ".idea", "build", "out", "target", "node_modules", "run",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact not found: {path}")]
    NotFound { path: String },

    #[error("artifact already exists: {path}")]
    AlreadyExists { path: String },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Storage for the artifacts of one run.
pub trait ArtifactStore: Send + Sync {
    /// All artifact paths, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    fn read(&self, path: &str) -> Result<String, StoreError>;

    fn write(&mut self, path: &str, text: &str) -> Result<(), StoreError>;

    /// Move an artifact. Fails if `to` already exists.
    fn relocate(&mut self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Whether anything occupies `path`, listed or not.
    fn exists(&self, path: &str) -> bool {
        self.read(path).is_ok()
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Include/exclude globs over workspace-relative paths.
///
/// An empty include list matches everything.
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

fn build_set(patterns: &[String]) -> Result<GlobSet, StoreError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| StoreError::InvalidPattern {
        pattern: patterns.join(","),
        reason: e.to_string(),
    })
}

impl ArtifactFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, StoreError> {
        Ok(ArtifactFilter {
            include: if include.is_empty() {
                None
            } else {
                Some(build_set(include)?)
            },
            exclude: build_set(exclude)?,
        })
    }

    /// Matches every path.
    pub fn all() -> Self {
        ArtifactFilter {
            include: None,
            exclude: GlobSet::empty(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }
        match &self.include {
            Some(set) => set.is_match(path),
            None => true,
        }
    }
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        ArtifactFilter::all()
    }
}

fn in_excluded_dir(path: &Path) -> bool {
    path.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            DEFAULT_EXCLUDE_DIRS.contains(&name.as_ref())
        }
        _ => false,
    })
}

// ============================================================================
// Filesystem store
// ============================================================================

/// Artifacts under one workspace root.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
    filter: ArtifactFilter,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, filter: ArtifactFilter) -> Self {
        FsArtifactStore {
            root: root.into(),
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn io_error(path: &str, source: io::Error) -> StoreError {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_string(),
            }
        } else {
            StoreError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let root_display = self.root.to_string_lossy().into_owned();
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !in_excluded_dir(Path::new(e.file_name())))
        {
            let entry = entry.map_err(|e| StoreError::Io {
                path: root_display.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            if self.filter.matches(&relative) {
                paths.push(relative);
            }
        }
        paths.sort();
        debug!(count = paths.len(), root = %root_display, "listed artifacts");
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<String, StoreError> {
        fs::read_to_string(self.full_path(path)).map_err(|e| Self::io_error(path, e))
    }

    fn write(&mut self, path: &str, text: &str) -> Result<(), StoreError> {
        fs::write(self.full_path(path), text).map_err(|e| Self::io_error(path, e))
    }

    fn relocate(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let target = self.full_path(to);
        if target.exists() {
            return Err(StoreError::AlreadyExists {
                path: to.to_string(),
            });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(to, e))?;
        }
        fs::rename(self.full_path(from), &target).map_err(|e| Self::io_error(from, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryArtifactStore {
    files: BTreeMap<String, String>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        MemoryArtifactStore::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, path: &str) -> Result<String, StoreError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    fn write(&mut self, path: &str, text: &str) -> Result<(), StoreError> {
        self.files.insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn relocate(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if self.files.contains_key(to) {
            return Err(StoreError::AlreadyExists {
                path: to.to_string(),
            });
        }
        let text = self.files.remove(from).ok_or_else(|| StoreError::NotFound {
            path: from.to_string(),
        })?;
        self.files.insert(to.to_string(), text);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod filter_tests {
        use super::*;

        #[test]
        fn exclude_wins_over_include() {
            let filter = ArtifactFilter::new(
                &["src/**/*.java".to_string()],
                &["src/generated/**".to_string()],
            )
            .unwrap();
            assert!(filter.matches("src/main/java/a/B.java"));
            assert!(!filter.matches("src/generated/X.java"));
            assert!(!filter.matches("src/main/resources/x.json"));
        }

        #[test]
        fn bad_pattern_is_reported() {
            let err = ArtifactFilter::new(&["src/[".to_string()], &[]).unwrap_err();
            assert!(matches!(err, StoreError::InvalidPattern { .. }));
        }
    }

    mod fs_tests {
        use super::*;

        #[test]
        fn lists_relative_paths_and_skips_build_dirs() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("src/a")).unwrap();
            fs::create_dir_all(dir.path().join("build/tmp")).unwrap();
            fs::write(dir.path().join("src/a/B.java"), "class B {}").unwrap();
            fs::write(dir.path().join("build/tmp/C.java"), "class C {}").unwrap();
            let store = FsArtifactStore::new(dir.path(), ArtifactFilter::all());
            assert_eq!(store.list().unwrap(), vec!["src/a/B.java".to_string()]);
            assert_eq!(store.read("src/a/B.java").unwrap(), "class B {}");
        }

        #[test]
        fn relocate_creates_parent_directories() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("src/a")).unwrap();
            fs::write(dir.path().join("src/a/B.java"), "class B {}").unwrap();
            let mut store = FsArtifactStore::new(dir.path(), ArtifactFilter::all());
            store.relocate("src/a/B.java", "src/x/y/B.java").unwrap();
            assert!(dir.path().join("src/x/y/B.java").exists());
            assert!(matches!(
                store.read("src/a/B.java"),
                Err(StoreError::NotFound { .. })
            ));
        }
    }

    mod memory_tests {
        use super::*;

        #[test]
        fn relocate_refuses_to_overwrite() {
            let mut store = MemoryArtifactStore::new().with("a", "1").with("b", "2");
            assert!(matches!(
                store.relocate("a", "b"),
                Err(StoreError::AlreadyExists { .. })
            ));
            store.relocate("a", "c").unwrap();
            assert_eq!(store.list().unwrap(), vec!["b".to_string(), "c".to_string()]);
        }
    }
}
