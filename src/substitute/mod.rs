//! Scoped file substitution.
//!
//! [`Substitution::begin`] installs content at a path and returns a record;
//! [`Substitution::dispose`] puts the filesystem back exactly as it was:
//! same bytes, permission bits and modification time for a file that
//! existed, and no leftover file or directories for a path that did not.
//!
//! ```no_run
//! use scoped_substitute::substitute;
//!
//! let mut record = substitute::begin("conf.json", br#"{"a":1}"#);
//! if let Some(err) = record.setup_error() {
//!     eprintln!("setup failed: {err}");
//! }
//! // ... code that reads conf.json ...
//! record.dispose()?;
//! # Ok::<(), scoped_substitute::error::SubstituteError>(())
//! ```
//!
//! A record that is dropped without being disposed is disposed on drop and
//! any failure is logged.
pub mod absent;
pub mod existent;
pub mod probe;
pub mod set;
pub mod strategy;

use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::config::SubstituteOptions;
use crate::error::{ErrorKind, SubstituteError};

pub use absent::AbsentPathStrategy;
pub use existent::ExistentPathStrategy;
pub use probe::{Plan, probe};
pub use set::SubstitutionSet;
pub use strategy::Rollback;

/// Where a [`Substitution`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Substitution is disabled; nothing was or will be touched.
    Inert,
    /// Setup failed before any filesystem mutation.
    Created,
    /// The strategy's forward step ran (fully or partly) but the content was
    /// not written.
    Forwarded,
    /// The content is in place.
    Active,
    /// Dispose has run; the record is spent.
    BackedOut,
}

/// Install `content` at `path` with default options.
///
/// Shorthand for [`Substitution::begin`].
pub fn begin(path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Substitution {
    Substitution::begin(path, content, &SubstituteOptions::default())
}

/// A live substitution of one path.
///
/// Holds exclusive responsibility for the target's on-disk state between
/// `begin` and `dispose`.  Nothing prevents a second substitution of the same
/// path in the meantime; callers must not start one.
#[derive(Debug)]
pub struct Substitution {
    target: PathBuf,
    strategy: Option<Box<dyn Rollback>>,
    setup_error: Option<SubstituteError>,
    stage: Stage,
    outcome: Option<Result<(), SubstituteError>>,
}

impl Substitution {
    /// Install `content` at `path`.
    ///
    /// Never fails outright: a setup failure is captured in the returned
    /// record (see [`setup_error`](Self::setup_error)) and handed back again
    /// by [`dispose`](Self::dispose), which must still be called so that any
    /// partial setup is undone.
    pub fn begin(
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        options: &SubstituteOptions,
    ) -> Self {
        let mut record = Self::new(path.as_ref().to_path_buf());

        if !options.enabled {
            tracing::debug!(path = %record.target.display(), "substitution disabled");
            record.stage = Stage::Inert;
            return record;
        }

        // One stat decides the strategy and seeds it; no second look.
        let strategy: Box<dyn Rollback> = match fs::metadata(&record.target) {
            Ok(meta) => Box::new(ExistentPathStrategy::new(&meta, &options.separator)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Box::new(AbsentPathStrategy::new()),
            Err(e) => {
                record.setup_error = Some(
                    SubstituteError::io(ErrorKind::StatProbeFailed, "stat", &record.target, e)
                        .with_origin("substitute", "begin"),
                );
                return record;
            }
        };
        record.install(strategy, content.as_ref());
        record
    }

    const fn new(target: PathBuf) -> Self {
        Self {
            target,
            strategy: None,
            setup_error: None,
            stage: Stage::Created,
            outcome: None,
        }
    }

    /// Run `strategy`'s forward step on the target and write `content`.
    ///
    /// The first failure becomes the setup error; the strategy is kept so
    /// that `dispose` can undo whatever `forward` did.
    fn install(&mut self, mut strategy: Box<dyn Rollback>, content: &[u8]) {
        tracing::debug!(
            path = %self.target.display(),
            strategy = strategy.describe(),
            "substitution starting"
        );

        self.stage = Stage::Forwarded;
        let forwarded = strategy.forward(&self.target);
        let strategy_name = strategy.describe();
        self.strategy = Some(strategy);
        if let Err(e) = forwarded.and_then(|()| write_content(&self.target, content)) {
            self.setup_error = Some(e.with_field("strategy", strategy_name));
            return;
        }

        self.stage = Stage::Active;
        tracing::debug!(
            path = %self.target.display(),
            bytes = content.len(),
            "substitute content in place"
        );
    }

    /// Restore the filesystem to its state before [`begin`](Self::begin).
    ///
    /// - active record: runs the strategy's undo step; a failure is annotated
    ///   with the strategy name.
    /// - failed record: returns the setup error unchanged, after a
    ///   best-effort undo of whatever the forward step already did.
    /// - disabled record: no-op.
    ///
    /// Calling it again returns the first call's outcome without touching the
    /// filesystem.
    ///
    /// # Errors
    ///
    /// Returns the setup error, or the undo error, as described above.
    pub fn dispose(&mut self) -> Result<(), SubstituteError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self.back_out();
        if self.stage != Stage::Inert {
            self.stage = Stage::BackedOut;
        }
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn back_out(&mut self) -> Result<(), SubstituteError> {
        if let Some(setup_error) = &self.setup_error {
            if self.stage == Stage::Forwarded
                && let Some(strategy) = self.strategy.as_mut()
                && let Err(e) = strategy.back(&self.target)
            {
                tracing::warn!(
                    path = %self.target.display(),
                    error = %e,
                    "undo after failed setup was incomplete"
                );
            }
            tracing::debug!(
                path = %self.target.display(),
                condition = %ErrorKind::AlreadyFailed,
                "dispose of failed substitution"
            );
            return Err(setup_error.clone());
        }

        match (self.stage, self.strategy.as_mut()) {
            (Stage::Active, Some(strategy)) => {
                let name = strategy.describe();
                strategy
                    .back(&self.target)
                    .map_err(|e| e.with_field("strategy", name))?;
                tracing::debug!(path = %self.target.display(), strategy = name, "substitution restored");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The substituted path.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The failure captured during [`begin`](Self::begin), if any.
    #[must_use]
    pub const fn setup_error(&self) -> Option<&SubstituteError> {
        self.setup_error.as_ref()
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether the substitute content is in place.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.stage == Stage::Active
    }

    /// The strategy chosen by `begin`, if one was.
    #[must_use]
    pub fn strategy(&self) -> Option<&dyn Rollback> {
        self.strategy.as_deref()
    }

    /// Convert a failed setup into an error, keeping the record otherwise.
    ///
    /// A failed record is disposed before the error is returned, so any
    /// partial setup is undone.
    ///
    /// # Errors
    ///
    /// Returns the setup error if `begin` failed.
    pub fn into_result(mut self) -> Result<Self, SubstituteError> {
        if self.setup_error.is_some() {
            return Err(self.dispose().err().unwrap_or_else(|| {
                SubstituteError::new(ErrorKind::AlreadyFailed, "setup failed")
                    .with_path("path", &self.target)
            }));
        }
        Ok(self)
    }
}

impl Drop for Substitution {
    fn drop(&mut self) {
        if self.outcome.is_some() || self.stage == Stage::Inert {
            return;
        }
        if let Err(e) = self.dispose() {
            tracing::warn!(
                path = %self.target.display(),
                error = %e,
                "substitution dropped without a clean restore"
            );
        }
    }
}

fn write_content(path: &Path, content: &[u8]) -> Result<(), SubstituteError> {
    let fail = |operation: &str, e: io::Error| {
        SubstituteError::io(ErrorKind::ContentWriteFailed, operation, path, e)
            .with_origin("substitute", "write_content")
    };
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| fail("open for write", e))?;
    file.write_all(content)
        .and_then(|()| file.flush())
        .map_err(|e| fail("write content", e))
}
