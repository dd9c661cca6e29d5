//! Strategy for a target that does not exist yet.
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use super::strategy::Rollback;
use crate::error::{ErrorKind, SubstituteError};

const MODULE: &str = "absent";

/// Return the ancestors of `path` that do not exist, root-to-leaf.
///
/// The walk stops at the first ancestor that exists; an empty parent (a bare
/// relative file name) counts as the current directory, which exists.
///
/// # Errors
///
/// Returns [`ErrorKind::StatProbeFailed`] if an ancestor cannot be probed for
/// a reason other than "not found".
pub fn missing_ancestors(path: &Path) -> Result<Vec<PathBuf>, SubstituteError> {
    let mut missing = Vec::new();
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() {
            break;
        }
        match fs::metadata(dir) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(dir.to_path_buf()),
            Err(e) => {
                return Err(
                    SubstituteError::io(ErrorKind::StatProbeFailed, "probe ancestor", dir, e)
                        .with_path("target", path)
                        .with_origin(MODULE, "missing_ancestors"),
                );
            }
        }
        current = dir.parent();
    }
    missing.reverse();
    Ok(missing)
}

/// Creates the missing directory chain and an empty target file.
#[derive(Debug, Default)]
pub struct AbsentPathStrategy {
    created_dirs: Vec<PathBuf>,
    file_created: bool,
}

impl AbsentPathStrategy {
    /// A strategy that has not created anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories this strategy created (or will remove), root-to-leaf.
    #[must_use]
    pub fn created_dirs(&self) -> &[PathBuf] {
        &self.created_dirs
    }
}

impl Rollback for AbsentPathStrategy {
    fn forward(&mut self, path: &Path) -> Result<(), SubstituteError> {
        self.created_dirs = missing_ancestors(path)?;

        if let Some(leaf) = self.created_dirs.last() {
            tracing::debug!(
                dirs = self.created_dirs.len(),
                leaf = %leaf.display(),
                "creating parent directories"
            );
            fs::create_dir_all(leaf).map_err(|e| {
                SubstituteError::io(ErrorKind::DirectoryCreateFailed, "create dirs", leaf, e)
                    .with_path("target", path)
                    .with_origin(MODULE, "forward")
            })?;
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                SubstituteError::io(ErrorKind::FileCreateFailed, "create file", path, e)
                    .with_origin(MODULE, "forward")
            })?;
        self.file_created = true;
        tracing::debug!(path = %path.display(), "created empty target");
        Ok(())
    }

    fn back(&mut self, path: &Path) -> Result<(), SubstituteError> {
        let mut failures = Vec::new();

        if self.file_created {
            match fs::remove_file(path) {
                Ok(()) => self.file_created = false,
                Err(e) if e.kind() == io::ErrorKind::NotFound => self.file_created = false,
                Err(e) => failures.push(
                    SubstituteError::io(ErrorKind::RemoveFailed, "remove file", path, e)
                        .with_origin(MODULE, "back"),
                ),
            }
        }

        // Leaf-first; keep going past failures so as much as possible is undone.
        let mut remaining = Vec::new();
        for dir in self.created_dirs.iter().rev() {
            match fs::remove_dir(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    let kind = if e.kind() == io::ErrorKind::DirectoryNotEmpty {
                        ErrorKind::DirectoryNotEmpty
                    } else {
                        ErrorKind::RemoveFailed
                    };
                    tracing::warn!(dir = %dir.display(), error = %e, "created directory left behind");
                    failures.push(
                        SubstituteError::io(kind, "remove dir", dir, e)
                            .with_path("target", path)
                            .with_origin(MODULE, "back"),
                    );
                    remaining.push(dir.clone());
                }
            }
        }
        remaining.reverse();
        self.created_dirs = remaining;

        let count = failures.len();
        let Some(first) = failures.into_iter().next() else {
            return Ok(());
        };
        let left: Vec<String> = self
            .created_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        Err(first
            .with_field("failures", count)
            .with_field("remaining", left.join(":")))
    }

    fn describe(&self) -> &'static str {
        "absent-path"
    }

    fn artifacts(&self) -> Vec<PathBuf> {
        self.created_dirs.clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn missing_ancestors_stops_at_first_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("c.json");

        let missing = missing_ancestors(&path).unwrap();
        assert_eq!(
            missing,
            vec![dir.path().join("a"), dir.path().join("a").join("b")]
        );
    }

    #[test]
    fn missing_ancestors_empty_for_bare_file_name() {
        assert!(missing_ancestors(Path::new("conf.json")).unwrap().is_empty());
    }

    #[test]
    fn missing_ancestors_excludes_existing_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let path = dir.path().join("a").join("b").join("c.json");

        let missing = missing_ancestors(&path).unwrap();
        assert_eq!(missing, vec![dir.path().join("a").join("b")]);
    }

    #[test]
    fn forward_creates_chain_and_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x").join("y").join("f.txt");

        let mut strategy = AbsentPathStrategy::new();
        strategy.forward(&path).unwrap();

        assert!(path.is_file());
        assert_eq!(fs::read(&path).unwrap(), b"");
        assert_eq!(strategy.created_dirs().len(), 2);
        assert_eq!(strategy.created_dirs()[0], dir.path().join("x"));
    }

    #[test]
    fn back_removes_file_and_created_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let path = dir.path().join("a").join("b").join("c.json");

        let mut strategy = AbsentPathStrategy::new();
        strategy.forward(&path).unwrap();
        strategy.back(&path).unwrap();

        assert!(!path.exists());
        assert!(!dir.path().join("a").join("b").exists());
        assert!(dir.path().join("a").is_dir());
        assert!(strategy.artifacts().is_empty());
    }

    #[test]
    fn back_tolerates_already_removed_file_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("f");

        let mut strategy = AbsentPathStrategy::new();
        strategy.forward(&path).unwrap();
        fs::remove_dir_all(dir.path().join("gone")).unwrap();

        strategy.back(&path).unwrap();
    }

    #[test]
    fn back_continues_past_non_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p").join("q").join("f");

        let mut strategy = AbsentPathStrategy::new();
        strategy.forward(&path).unwrap();
        // Something else writes into the outer created directory.
        fs::write(dir.path().join("p").join("intruder"), "x").unwrap();

        let err = strategy.back(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
        assert_eq!(err.field("failures"), Some("1"));
        assert!(!dir.path().join("p").join("q").exists(), "leaf still removed");
        assert!(dir.path().join("p").is_dir());
        assert_eq!(strategy.artifacts(), vec![dir.path().join("p")]);
    }

    #[test]
    fn forward_into_file_parent_fails_with_directory_create() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blocker"), "file").unwrap();
        let path = dir.path().join("blocker").join("sub").join("f");

        let mut strategy = AbsentPathStrategy::new();
        let err = strategy.forward(&path).unwrap_err();
        assert!(
            matches!(
                err.kind(),
                ErrorKind::DirectoryCreateFailed | ErrorKind::StatProbeFailed
            ),
            "unexpected kind: {err}"
        );
        strategy.back(&path).unwrap();
        assert!(dir.path().join("blocker").is_file());
    }
}
