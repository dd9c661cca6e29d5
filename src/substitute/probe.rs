//! Read-only preview of what [`begin`](super::begin) would do to a path.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::absent::missing_ancestors;
use super::existent::find_free_backup;
use crate::config::SubstituteOptions;
use crate::error::{ErrorKind, SubstituteError};

/// The setup a substitution of a path would perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum Plan {
    /// The path holds a file; its bytes would move to `backup`.
    ExistentPath {
        /// The target path.
        path: PathBuf,
        /// The sibling that would receive the original bytes.
        backup: PathBuf,
    },
    /// The path is absent; these directories and the file would be created.
    AbsentPath {
        /// The target path.
        path: PathBuf,
        /// Missing ancestors, root-to-leaf.
        create_dirs: Vec<PathBuf>,
    },
}

/// Work out which strategy `begin` would choose for `path`, without
/// touching the filesystem.
///
/// # Errors
///
/// Returns [`ErrorKind::StatProbeFailed`] if the path, a backup candidate or
/// an ancestor cannot be probed.
pub fn probe(path: &Path, options: &SubstituteOptions) -> Result<Plan, SubstituteError> {
    match fs::metadata(path) {
        Ok(_) => Ok(Plan::ExistentPath {
            path: path.to_path_buf(),
            backup: find_free_backup(path, &options.separator)?,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Plan::AbsentPath {
            path: path.to_path_buf(),
            create_dirs: missing_ancestors(path)?,
        }),
        Err(e) => Err(SubstituteError::io(ErrorKind::StatProbeFailed, "stat", path, e)
            .with_origin("probe", "probe")),
    }
}
