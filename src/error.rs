//! Structured error types for the substitution engine.
//!
//! Every filesystem failure is reported as a [`SubstituteError`]: a kind, a
//! human-readable message, a set of key/value annotations (always including
//! the operation and the path involved), the underlying I/O error when there
//! is one, and an optional origin tag naming the module and operation that
//! raised it.
//!
//! Configuration loading has its own [`ConfigError`].  Command handlers at
//! the CLI boundary convert both into [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! SubstituteError            # stat/copy/mkdir/remove/write failures
//! └── kind: ErrorKind        # which step failed
//! ConfigError                # manifest and section loading
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Key/value annotations attached to an error.
///
/// Ordered so that rendered messages are stable.
pub type Fields = BTreeMap<String, String>;

/// Which step of a substitution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// A stat returned something other than "not found" while choosing a
    /// strategy, searching for a free backup name, or walking ancestors.
    StatProbeFailed,
    /// Copying the original bytes into the backup file failed.
    BackupCopyFailed,
    /// Copying the backup bytes back into the target failed.
    RestoreCopyFailed,
    /// The target's modification time could not be restored.
    TimestampRestoreFailed,
    /// The target's permission bits could not be restored.
    PermissionRestoreFailed,
    /// Creating the missing parent directory chain failed.
    DirectoryCreateFailed,
    /// A directory created during setup was not empty at teardown.
    DirectoryNotEmpty,
    /// Creating the empty target file failed.
    FileCreateFailed,
    /// Removing a file or directory during teardown failed.
    RemoveFailed,
    /// Writing the substitute content failed.
    ContentWriteFailed,
    /// Dispose was called on a record whose setup had already failed.
    AlreadyFailed,
}

impl ErrorKind {
    /// Stable identifier used in rendered messages and JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatProbeFailed => "StatProbeFailed",
            Self::BackupCopyFailed => "BackupCopyFailed",
            Self::RestoreCopyFailed => "RestoreCopyFailed",
            Self::TimestampRestoreFailed => "TimestampRestoreFailed",
            Self::PermissionRestoreFailed => "PermissionRestoreFailed",
            Self::DirectoryCreateFailed => "DirectoryCreateFailed",
            Self::DirectoryNotEmpty => "DirectoryNotEmpty",
            Self::FileCreateFailed => "FileCreateFailed",
            Self::RemoveFailed => "RemoveFailed",
            Self::ContentWriteFailed => "ContentWriteFailed",
            Self::AlreadyFailed => "AlreadyFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module and operation that raised an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Module name, e.g. `"existent"`.
    pub module: &'static str,
    /// Operation name, e.g. `"forward"`.
    pub operation: &'static str,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.operation)
    }
}

/// A failed substitution step.
///
/// Cheap to clone: the underlying I/O error is shared, so a recorded
/// outcome can be handed back to the caller more than once.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}{}", render_annotations(.fields, .origin.as_ref()))]
pub struct SubstituteError {
    kind: ErrorKind,
    message: String,
    fields: Fields,
    #[source]
    cause: Option<Arc<io::Error>>,
    origin: Option<Origin>,
}

impl SubstituteError {
    /// Create an error with no underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: Fields::new(),
            cause: None,
            origin: None,
        }
    }

    /// Wrap an I/O error raised by `operation` on `path`.
    pub fn io(kind: ErrorKind, operation: &str, path: &Path, cause: io::Error) -> Self {
        Self::new(kind, format!("{operation} failed"))
            .with_field("operation", operation)
            .with_path("path", path)
            .with_cause(cause)
    }

    /// Attach a key/value annotation, replacing any previous value.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// Attach a path annotation.
    #[must_use]
    pub fn with_path(self, key: &str, path: &Path) -> Self {
        self.with_field(key, path.display())
    }

    /// Attach the underlying I/O error.
    #[must_use]
    pub fn with_cause(mut self, cause: io::Error) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Tag the error with the module and operation that raised it.
    #[must_use]
    pub const fn with_origin(mut self, module: &'static str, operation: &'static str) -> Self {
        self.origin = Some(Origin { module, operation });
        self
    }

    /// Which step failed.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message, without annotations.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All annotations.
    #[must_use]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }

    /// A single annotation.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The module/operation tag, if any.
    #[must_use]
    pub const fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// The underlying I/O error, if any.
    #[must_use]
    pub fn io_error(&self) -> Option<&io::Error> {
        self.cause.as_deref()
    }

    /// Path annotation under `key`, as a [`PathBuf`].
    #[must_use]
    pub fn path_field(&self, key: &str) -> Option<PathBuf> {
        self.field(key).map(PathBuf::from)
    }
}

fn render_annotations(fields: &Fields, origin: Option<&Origin>) -> String {
    let mut out = String::new();
    if !fields.is_empty() {
        let pairs: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
        out.push_str(" {");
        out.push_str(&pairs.join(", "));
        out.push('}');
    }
    if let Some(origin) = origin {
        out.push_str(" at ");
        out.push_str(&origin.to_string());
    }
    out
}

/// Errors that arise from loading a substitution manifest or config section.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The config file is not valid for its format.
    #[error("Invalid syntax in {file}: {message}")]
    Parse {
        /// File that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// A section named in the section path is absent.
    #[error("Missing section [{section}] in {file}")]
    MissingSection {
        /// Dotted path of the missing section.
        section: String,
        /// File that was searched.
        file: String,
    },

    /// The file extension has no registered decoder.
    #[error("Unsupported config format '{extension}' for {file} (supported: .json, .toml)")]
    UnsupportedFormat {
        /// The extension that was found (empty when there is none).
        extension: String,
        /// File that was requested.
        file: String,
    },

    /// The decoded config violates a constraint.
    #[error("Invalid entry in {file}: {reason}")]
    Invalid {
        /// File containing the entry.
        file: String,
        /// Why the entry is rejected.
        reason: String,
    },
}
