//! Substitution manifest: the files the `run` command installs.
//!
//! ```toml
//! enabled = true
//! separator = "_"
//!
//! [[file]]
//! path = "conf/app.json"
//! content = '{"a":1}'
//!
//! [[file]]
//! path = "conf/db.toml"
//! source = "fixtures/db.toml"
//! ```
//!
//! Target paths are used as written (relative paths resolve against the
//! working directory).  Relative `source` paths resolve against the
//! manifest's own directory.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::SubstituteOptions;
use super::section::load_section;
use crate::error::ConfigError;

/// One `[[file]]` entry as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntry {
    /// Path to substitute.
    pub path: PathBuf,
    /// Inline substitute content.
    #[serde(default)]
    pub content: Option<String>,
    /// File whose bytes become the substitute content.
    #[serde(default)]
    pub source: Option<PathBuf>,
}

/// A decoded manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// When `false`, every substitution is inert.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Backup suffix separator.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Substitutions in installation order.
    #[serde(default, rename = "file")]
    pub files: Vec<FileEntry>,
    /// Directory `source` paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

const fn default_enabled() -> bool {
    true
}

fn default_separator() -> String {
    SubstituteOptions::default().separator
}

/// A manifest entry with its content resolved to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Path to substitute.
    pub path: PathBuf,
    /// Bytes to install.
    pub content: Vec<u8>,
}

impl Manifest {
    /// Load a manifest from `path`, optionally from a nested section
    /// (e.g. `["tool", "substitute"]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, the section is
    /// missing, or the manifest does not match the expected shape.
    pub fn load(path: &Path, sections: &[&str]) -> Result<Self, ConfigError> {
        let mut manifest: Self = load_section(path, sections)?;
        manifest.base_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(manifest)
    }

    /// Engine switches declared by the manifest.
    #[must_use]
    pub fn options(&self) -> SubstituteOptions {
        SubstituteOptions {
            enabled: self.enabled,
            separator: self.separator.clone(),
        }
    }

    /// Resolve every entry's content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an entry has both or neither of
    /// `content`/`source`, and [`ConfigError::Io`] if a source cannot be
    /// read.
    pub fn resolve(&self) -> Result<Vec<Resolved>, ConfigError> {
        self.files.iter().map(|entry| self.resolve_entry(entry)).collect()
    }

    fn resolve_entry(&self, entry: &FileEntry) -> Result<Resolved, ConfigError> {
        let content = match (&entry.content, &entry.source) {
            (Some(text), None) => text.clone().into_bytes(),
            (None, Some(source)) => {
                let source = self.base_dir.join(source);
                std::fs::read(&source).map_err(|e| ConfigError::Io {
                    path: source.display().to_string(),
                    source: e,
                })?
            }
            (Some(_), Some(_)) | (None, None) => {
                return Err(ConfigError::Invalid {
                    file: self.base_dir.display().to_string(),
                    reason: format!(
                        "entry for {} needs exactly one of 'content' or 'source'",
                        entry.path.display()
                    ),
                });
            }
        };
        Ok(Resolved {
            path: entry.path.clone(),
            content,
        })
    }
}
