//! Several substitutions held together and restored in reverse order.
//!
//! This is a convenience for callers that substitute more than one file; it
//! is not a transaction.  Each record is still restored on its own.
use std::path::Path;

use super::Substitution;
use crate::config::SubstituteOptions;
use crate::error::SubstituteError;

/// An ordered group of [`Substitution`]s.
#[derive(Debug, Default)]
pub struct SubstitutionSet {
    records: Vec<Substitution>,
}

impl SubstitutionSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a substitution and add it to the set.
    ///
    /// # Errors
    ///
    /// Returns the setup error if the new substitution failed.  The failed
    /// record is still kept so that [`dispose`](Self::dispose) undoes any
    /// partial setup along with the rest.
    pub fn begin(
        &mut self,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        options: &SubstituteOptions,
    ) -> Result<(), SubstituteError> {
        let record = Substitution::begin(path, content, options);
        let setup_error = record.setup_error().cloned();
        self.records.push(record);
        setup_error.map_or(Ok(()), Err)
    }

    /// Add an already started substitution.
    pub fn push(&mut self, record: Substitution) {
        self.records.push(record);
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the held records in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Substitution> {
        self.records.iter()
    }

    /// Dispose every record, newest first.
    ///
    /// Keeps going past failures; the set is empty afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered (in disposal order).
    pub fn dispose(&mut self) -> Result<(), SubstituteError> {
        let mut first_error = None;
        while let Some(mut record) = self.records.pop() {
            if let Err(e) = record.dispose() {
                tracing::warn!(path = %record.target().display(), error = %e, "restore failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for SubstitutionSet {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            tracing::warn!(error = %e, "substitution set dropped without a clean restore");
        }
    }
}
