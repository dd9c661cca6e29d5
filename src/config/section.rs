//! Decode one nested section of a `.toml` or `.json` config file.
//!
//! Several consumers can share one file, each owning a section:
//!
//! ```toml
//! [tool.substitute]
//! enabled = true
//!
//! [tool.other]
//! level = "debug"
//! ```
//!
//! The file is parsed into a generic tree, the section path is walked, and
//! only the selected subtree is decoded into the caller's type.
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

use crate::error::ConfigError;

/// Read `path` into a generic value tree, choosing the parser by extension.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedFormat`] for extensions other than
/// `.toml`/`.json`, [`ConfigError::Io`] if the file cannot be read, and
/// [`ConfigError::Parse`] if it is not valid for its format.
pub fn load_tree(path: &Path) -> Result<Value, ConfigError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !matches!(extension.as_str(), "toml" | "json") {
        return Err(ConfigError::UnsupportedFormat {
            extension,
            file: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parse_error = |message: String| ConfigError::Parse {
        file: path.display().to_string(),
        message,
    };

    if extension == "toml" {
        toml::from_str(&content).map_err(|e| parse_error(e.to_string()))
    } else {
        serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
    }
}

/// Walk `sections` down from `tree` and return the selected subtree.
///
/// An empty path selects the whole tree.
///
/// # Errors
///
/// Returns [`ConfigError::MissingSection`] naming the first absent section.
pub fn select<'a>(tree: &'a Value, sections: &[&str], file: &Path) -> Result<&'a Value, ConfigError> {
    let mut node = tree;
    for (depth, section) in sections.iter().enumerate() {
        node = node.get(section).ok_or_else(|| ConfigError::MissingSection {
            section: sections.iter().take(depth + 1).copied().collect::<Vec<_>>().join("."),
            file: file.display().to_string(),
        })?;
    }
    Ok(node)
}

/// Split a dotted section path (`"tool.substitute"`) into its parts.
///
/// Empty input yields an empty path.
#[must_use]
pub fn split_path(dotted: &str) -> Vec<&str> {
    dotted.split('.').filter(|s| !s.is_empty()).collect()
}

/// Load `path` and decode the section at `sections` into `T`.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded, the section is missing,
/// or the subtree does not match `T`.
pub fn load_section<T: DeserializeOwned>(path: &Path, sections: &[&str]) -> Result<T, ConfigError> {
    let tree = load_tree(path)?;
    let node = select(&tree, sections, path)?;
    T::deserialize(node).map_err(|e| ConfigError::Parse {
        file: path.display().to_string(),
        message: e.to_string(),
    })
}
