//! Command: substitute files, run a program, restore the files.
use anyhow::{Context as _, Result};

use crate::cli::RunOpts;
use crate::config::SubstituteOptions;
use crate::config::manifest::{Manifest, Resolved};
use crate::config::section::split_path;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;
use crate::substitute::SubstitutionSet;

/// Run the `run` subcommand with the system executor.
///
/// Returns the wrapped program's exit code.
///
/// # Errors
///
/// See [`run_with`].
pub fn run(opts: &RunOpts, log: &Logger) -> Result<i32> {
    run_with(opts, &SystemExecutor, log)
}

/// Install every substitution, run the program through `executor`, then
/// restore every file in reverse order.
///
/// Returns the program's exit code.
///
/// # Errors
///
/// Returns an error if the manifest or a source cannot be loaded, if any
/// substitution fails to install (the program is not run and the
/// substitutions already made are undone), if the program cannot be
/// started, or if any file fails to restore.
pub fn run_with(opts: &RunOpts, executor: &dyn Executor, log: &Logger) -> Result<i32> {
    let (options, entries) = collect(opts)?;
    let mut set = SubstitutionSet::new();

    log.stage("Substituting files");
    if !options.enabled {
        log.info("substitution disabled; files are left untouched");
    }
    for entry in &entries {
        if let Err(e) = set.begin(&entry.path, &entry.content, &options) {
            log.error(&format!("{}: {e}", entry.path.display()));
            if let Err(restore) = set.dispose() {
                log.warn(&format!("restore after failed setup: {restore}"));
            }
            return Err(e).with_context(|| format!("failed to substitute {}", entry.path.display()));
        }
        if let Some(strategy) = set.iter().last().and_then(|r| r.strategy()) {
            log.info(&format!("{} ({})", entry.path.display(), strategy.describe()));
        }
    }

    let Some((program, args)) = opts.command.split_first() else {
        anyhow::bail!("no program given");
    };
    log.stage(&format!("Running {}", program.to_string_lossy()));
    let result = executor.run(program, args);
    log.debug(&format!("program finished: {result:?}"));

    log.stage("Restoring files");
    let restored = set.dispose();
    let result = result?;
    restored.context("failed to restore substituted files")?;
    log.info(&format!("restored {} file(s)", entries.len()));

    Ok(result.exit_code())
}

/// Gather the engine options and the files to substitute from the manifest
/// and the command line, in that order.
fn collect(opts: &RunOpts) -> Result<(SubstituteOptions, Vec<Resolved>)> {
    let mut options = SubstituteOptions::default();
    let mut entries = Vec::new();

    if let Some(path) = &opts.manifest {
        let sections = opts.section.as_deref().map(split_path).unwrap_or_default();
        let manifest = Manifest::load(path, &sections)?;
        options = manifest.options();
        entries.extend(manifest.resolve()?);
    }

    for (path, source) in &opts.files {
        let content = std::fs::read(source)
            .with_context(|| format!("failed to read {}", source.display()))?;
        entries.push(Resolved {
            path: path.clone(),
            content,
        });
    }
    entries.extend(opts.inline.iter().map(|(path, text)| Resolved {
        path: path.clone(),
        content: text.clone().into_bytes(),
    }));

    if opts.disabled {
        options.enabled = false;
    }
    if let Some(separator) = &opts.separator {
        options.separator.clone_from(separator);
    }
    Ok((options, entries))
}
