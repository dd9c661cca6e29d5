//! Strategy for a target that already holds a file.
//!
//! The original bytes are copied into a sibling backup file and the target is
//! truncated in place, so the target keeps its inode and permission bits while
//! the substitute content is active.  `back` copies the bytes home again and
//! puts the permission bits and modification time back.
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, FileTimes, Metadata, OpenOptions, Permissions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::strategy::Rollback;
use crate::error::{ErrorKind, SubstituteError};

const MODULE: &str = "existent";

/// Build the `n`-th backup candidate for `path`.
///
/// The separator and counter are inserted before the final extension:
/// `conf.json` → `conf_0.json`, `Makefile` → `Makefile_0`,
/// `archive.tar.gz` → `archive.tar_0.gz`.
#[must_use]
pub fn backup_candidate(path: &Path, separator: &str, n: u32) -> PathBuf {
    let mut name = path
        .file_stem()
        .map_or_else(OsString::new, OsStr::to_os_string);
    name.push(format!("{separator}{n}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Return the first backup candidate for `path` that does not exist.
///
/// # Errors
///
/// Returns [`ErrorKind::StatProbeFailed`] if a candidate cannot be probed for
/// a reason other than "not found", or if every candidate is taken.
pub fn find_free_backup(path: &Path, separator: &str) -> Result<PathBuf, SubstituteError> {
    for n in 0..=u32::MAX {
        let candidate = backup_candidate(path, separator, n);
        match fs::symlink_metadata(&candidate) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(candidate),
            Err(e) => {
                return Err(
                    SubstituteError::io(ErrorKind::StatProbeFailed, "probe backup", &candidate, e)
                        .with_path("target", path)
                        .with_origin(MODULE, "find_free_backup"),
                );
            }
        }
    }
    Err(
        SubstituteError::new(ErrorKind::StatProbeFailed, "no free backup name")
            .with_path("path", path)
            .with_origin(MODULE, "find_free_backup"),
    )
}

/// Backs up a present file before it is overwritten in place.
#[derive(Debug)]
pub struct ExistentPathStrategy {
    separator: String,
    permissions: Permissions,
    modified: Option<SystemTime>,
    backup_path: Option<PathBuf>,
    backup_written: bool,
}

impl ExistentPathStrategy {
    /// Seed the strategy with the metadata of the deciding stat.
    ///
    /// The metadata must describe the file *before* any mutation; it is what
    /// `back` restores.
    #[must_use]
    pub fn new(metadata: &Metadata, separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            permissions: metadata.permissions(),
            modified: metadata.modified().ok(),
            backup_path: None,
            backup_written: false,
        }
    }

    /// The backup file chosen by `forward`, if it has run.
    #[must_use]
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    /// Permission bits captured before the substitution.
    #[must_use]
    pub const fn original_permissions(&self) -> &Permissions {
        &self.permissions
    }

    /// Modification time captured before the substitution.
    #[must_use]
    pub const fn original_modified(&self) -> Option<SystemTime> {
        self.modified
    }

    #[cfg_attr(not(unix), allow(unused_mut))]
    fn options_with_mode(&self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt as _, PermissionsExt as _};
            opts.mode(self.permissions.mode());
        }
        opts
    }

    /// Copy the current bytes of `path` into a freshly created `backup`.
    ///
    /// A partially written backup is removed before the error is returned.
    fn write_backup(&self, path: &Path, backup: &Path) -> Result<(), SubstituteError> {
        let fail = |operation: &str, p: &Path, e: io::Error| {
            SubstituteError::io(ErrorKind::BackupCopyFailed, operation, p, e)
                .with_path("backup", backup)
                .with_origin(MODULE, "forward")
        };

        let mut original = File::open(path).map_err(|e| fail("open original", path, e))?;
        let mut copy = self
            .options_with_mode()
            .write(true)
            .create_new(true)
            .open(backup)
            .map_err(|e| fail("create backup", backup, e))?;

        let copied = io::copy(&mut original, &mut copy).and_then(|_| copy.flush());
        drop(copy);
        if let Err(e) = copied {
            if let Err(cleanup) = fs::remove_file(backup) {
                tracing::warn!(
                    backup = %backup.display(),
                    error = %cleanup,
                    "could not remove partial backup"
                );
            }
            return Err(fail("copy to backup", path, e));
        }
        Ok(())
    }

    /// Copy the backup bytes back into `path`, then reset its mtime through
    /// the same handle.
    ///
    /// Returns the mtime failure separately: content is already restored
    /// when it happens.
    fn restore_bytes(
        &self,
        path: &Path,
        backup: &Path,
    ) -> Result<Option<SubstituteError>, SubstituteError> {
        let fail = |operation: &str, p: &Path, e: io::Error| {
            SubstituteError::io(ErrorKind::RestoreCopyFailed, operation, p, e)
                .with_path("backup", backup)
                .with_origin(MODULE, "back")
        };

        let mut saved = File::open(backup).map_err(|e| fail("open backup", backup, e))?;
        let mut target = self
            .options_with_mode()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| fail("open target", path, e))?;
        io::copy(&mut saved, &mut target)
            .and_then(|_| target.flush())
            .map_err(|e| fail("copy from backup", path, e))?;

        let timestamp_error = self.modified.and_then(|modified| {
            target
                .set_times(FileTimes::new().set_modified(modified))
                .err()
                .map(|e| {
                    SubstituteError::io(ErrorKind::TimestampRestoreFailed, "set mtime", path, e)
                        .with_origin(MODULE, "back")
                })
        });
        Ok(timestamp_error)
    }
}

impl Rollback for ExistentPathStrategy {
    fn forward(&mut self, path: &Path) -> Result<(), SubstituteError> {
        let backup = find_free_backup(path, &self.separator)?;
        tracing::debug!(
            path = %path.display(),
            backup = %backup.display(),
            "backing up existing file"
        );
        self.write_backup(path, &backup)?;
        self.backup_path = Some(backup.clone());
        self.backup_written = true;

        if let Err(e) = OpenOptions::new().write(true).truncate(true).open(path) {
            // The original is untouched, so the backup has nothing to restore.
            match fs::remove_file(&backup) {
                Ok(()) => self.backup_written = false,
                Err(cleanup) if cleanup.kind() == io::ErrorKind::NotFound => {
                    self.backup_written = false;
                }
                Err(cleanup) => tracing::warn!(
                    backup = %backup.display(),
                    error = %cleanup,
                    "could not remove unused backup"
                ),
            }
            return Err(
                SubstituteError::io(ErrorKind::ContentWriteFailed, "truncate original", path, e)
                    .with_path("backup", &backup)
                    .with_origin(MODULE, "forward"),
            );
        }
        Ok(())
    }

    fn back(&mut self, path: &Path) -> Result<(), SubstituteError> {
        let Some(backup) = self.backup_path.clone().filter(|_| self.backup_written) else {
            return Ok(());
        };
        tracing::debug!(
            path = %path.display(),
            backup = %backup.display(),
            "restoring from backup"
        );

        // On copy failure the backup stays on disk for manual recovery.
        let timestamp_error = self.restore_bytes(path, &backup)?;

        let mut first_error = None;
        if let Err(e) = fs::set_permissions(path, self.permissions.clone()) {
            first_error = Some(
                SubstituteError::io(ErrorKind::PermissionRestoreFailed, "set permissions", path, e)
                    .with_origin(MODULE, "back"),
            );
        }

        match fs::remove_file(&backup) {
            Ok(()) => self.backup_written = false,
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.backup_written = false,
            Err(e) => {
                first_error.get_or_insert(
                    SubstituteError::io(ErrorKind::RemoveFailed, "remove backup", &backup, e)
                        .with_path("target", path)
                        .with_origin(MODULE, "back"),
                );
            }
        }

        if let Some(e) = timestamp_error {
            tracing::warn!(path = %path.display(), error = %e, "modification time not restored");
            first_error.get_or_insert(e);
        }

        first_error.map_or(Ok(()), Err)
    }

    fn describe(&self) -> &'static str {
        "existent-path"
    }

    fn artifacts(&self) -> Vec<PathBuf> {
        self.backup_path
            .iter()
            .filter(|_| self.backup_written)
            .cloned()
            .collect()
    }
}
