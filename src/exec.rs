//! Child process execution for the wrapped program.
//!
//! Provides the [`Executor`] trait so that the `run` command can be
//! unit-tested without spawning processes.  Production code uses
//! [`SystemExecutor`]; tests supply their own implementation.
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::process::{Command, ExitStatus};

/// Result of running the wrapped program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Whether the program exited with status zero.
    pub success: bool,
    /// Exit code, or `None` if the program was terminated by a signal.
    pub code: Option<i32>,
}

impl From<ExitStatus> for ExecResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

impl ExecResult {
    /// Exit code to propagate from this process.
    ///
    /// A program killed by a signal maps to `1`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(1)
    }
}

/// Runs a program to completion while substitutions are active.
pub trait Executor: std::fmt::Debug {
    /// Run `program` with `args` and wait for it to exit.
    ///
    /// A non-zero exit is not an error; it is reported in the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started.
    fn run(&self, program: &OsString, args: &[OsString]) -> Result<ExecResult>;
}

/// Production [`Executor`] that spawns the program with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &OsString, args: &[OsString]) -> Result<ExecResult> {
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("failed to execute: {}", program.to_string_lossy()))?;
        Ok(ExecResult::from(status))
    }
}
