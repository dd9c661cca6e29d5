//! Scoped file substitution.
//!
//! Temporarily replace the contents of a file (or create it, with any
//! missing parent directories) and later restore the filesystem to exactly
//! its prior state: original bytes, permissions and modification time, or
//! absence of the file and of the directories that were created for it.
//!
//! The public API is organised into layers:
//!
//! - **[`substitute`]**: the substitution record and its two rollback strategies
//! - **[`error`]**: structured substitution and configuration errors
//! - **[`config`]**: engine options and the manifest loader
//! - **[`exec`]**: running the wrapped program
//! - **[`commands`]**: top-level subcommand orchestration (`run`, `probe`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod substitute;
