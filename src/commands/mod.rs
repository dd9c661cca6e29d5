//! Subcommand handlers.
//!
//! - [`run`]: substitute files around a program run
//! - [`probe`]: preview the setup for a path without changing it
//! - [`version`]: print the build version
pub mod probe;
pub mod run;
pub mod version;
