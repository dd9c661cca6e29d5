//! The forward/back contract shared by both setup strategies.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SubstituteError;

/// How to make room for a substitute file and how to undo that.
///
/// A strategy is chosen once per [`Substitution`](super::Substitution) and
/// never switched.  Implementations hold whatever state `back` needs to
/// reverse exactly what `forward` did.
pub trait Rollback: fmt::Debug + Send {
    /// Prepare `path` so that it exists as an empty, writable file.
    ///
    /// # Errors
    ///
    /// Returns an error if any filesystem step fails.  Effects that already
    /// happened are left in place for [`back`](Self::back) to undo.
    fn forward(&mut self, path: &Path) -> Result<(), SubstituteError>;

    /// Undo whatever [`forward`](Self::forward) did to `path`.
    ///
    /// Must tolerate partial forward state: files or directories that are
    /// already gone are not errors.  A second call after a successful one is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the prior state cannot be fully restored.
    fn back(&mut self, path: &Path) -> Result<(), SubstituteError>;

    /// Short name used to annotate teardown errors.
    fn describe(&self) -> &'static str;

    /// Paths this strategy currently owns on disk (backup file or created
    /// directories).  Empty once `back` has succeeded.
    fn artifacts(&self) -> Vec<PathBuf>;
}
