//! Command: show what substituting each path would do.
use anyhow::Result;
use std::fmt::Write as _;

use crate::cli::ProbeOpts;
use crate::config::SubstituteOptions;
use crate::logging::Logger;
use crate::substitute::{Plan, probe};

/// Run the `probe` subcommand, printing one plan per path.
///
/// # Errors
///
/// Returns an error if any path cannot be probed.
pub fn run(opts: &ProbeOpts, log: &Logger) -> Result<()> {
    let options = SubstituteOptions {
        enabled: true,
        separator: opts.separator.clone(),
    };
    let plans = opts
        .paths
        .iter()
        .map(|path| probe(path, &options))
        .collect::<Result<Vec<_>, _>>()?;
    log.debug(&format!("probed {} path(s)", plans.len()));

    print!("{}", render(&plans, opts.json)?);
    Ok(())
}

/// Render plans as text lines, or as a JSON array when `json` is set.
///
/// # Errors
///
/// Returns an error if JSON serialisation fails.
pub fn render(plans: &[Plan], json: bool) -> Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(plans)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    for plan in plans {
        match plan {
            Plan::ExistentPath { path, backup } => {
                writeln!(
                    out,
                    "{}: existent-path, backup to {}",
                    path.display(),
                    backup.display()
                )?;
            }
            Plan::AbsentPath { path, create_dirs } if create_dirs.is_empty() => {
                writeln!(out, "{}: absent-path", path.display())?;
            }
            Plan::AbsentPath { path, create_dirs } => {
                let dirs: Vec<String> = create_dirs
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect();
                writeln!(
                    out,
                    "{}: absent-path, create {}",
                    path.display(),
                    dirs.join(", ")
                )?;
            }
        }
    }
    Ok(out)
}
