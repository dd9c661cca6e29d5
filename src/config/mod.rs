//! Options for the substitution engine and the loaders that fill them.
//!
//! - [`SubstituteOptions`]: the switches the core reads
//! - [`section`]: decode one nested section of a `.toml`/`.json` file
//! - [`manifest`]: the list of files the `run` command substitutes
pub mod manifest;
pub mod section;

use serde::Deserialize;

/// Switches read by [`Substitution::begin`](crate::substitute::Substitution::begin).
///
/// # Examples
///
/// ```
/// use scoped_substitute::config::SubstituteOptions;
///
/// let options = SubstituteOptions::default();
/// assert!(options.enabled);
/// assert_eq!(options.separator, "_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubstituteOptions {
    /// When `false`, `begin` returns an inert record and touches nothing.
    pub enabled: bool,
    /// Inserted between the file stem and the backup counter
    /// (`conf.json` → `conf<separator>0.json`).
    pub separator: String,
}

impl Default for SubstituteOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            separator: "_".to_string(),
        }
    }
}
