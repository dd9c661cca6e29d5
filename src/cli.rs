//! Command-line interface definition.
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Top-level CLI entry point for the substitution tool.
#[derive(Parser, Debug)]
#[command(
    name = "substitute",
    about = "Run a program with file contents temporarily substituted",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also append detailed logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Substitute files, run a program, then restore them
    Run(RunOpts),
    /// Show what substituting a path would do, without changing anything
    Probe(ProbeOpts),
    /// Print version information
    Version,
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunOpts {
    /// Manifest listing the files to substitute (.toml or .json)
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Dotted section of the manifest to read (e.g. tool.substitute)
    #[arg(long, requires = "manifest", value_name = "SECTION")]
    pub section: Option<String>,

    /// Substitute PATH with the bytes of SOURCE
    #[arg(long = "file", value_name = "PATH=SOURCE", value_parser = parse_pair::<PathBuf, PathBuf>)]
    pub files: Vec<(PathBuf, PathBuf)>,

    /// Substitute PATH with TEXT
    #[arg(long = "inline", value_name = "PATH=TEXT", value_parser = parse_pair::<PathBuf, String>)]
    pub inline: Vec<(PathBuf, String)>,

    /// Leave every file untouched and just run the program
    #[arg(long)]
    pub disabled: bool,

    /// Backup suffix separator (overrides the manifest)
    #[arg(long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Program to run, followed by its arguments
    #[arg(last = true, required = true, num_args = 1.., value_name = "PROGRAM")]
    pub command: Vec<OsString>,
}

/// Options for the `probe` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ProbeOpts {
    /// Paths to inspect
    #[arg(required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Backup suffix separator
    #[arg(long, default_value = "_", value_name = "SEP")]
    pub separator: String,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Parse a `KEY=VALUE` argument, splitting at the first `=`.
fn parse_pair<K, V>(raw: &str) -> Result<(K, V), String>
where
    K: From<String>,
    V: From<String>,
{
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty path in '{raw}'"));
    }
    Ok((K::from(key.to_string()), V::from(value.to_string())))
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_inline_and_program() {
        let cli = Cli::parse_from([
            "substitute",
            "run",
            "--inline",
            "conf.json={\"a\":1}",
            "--",
            "cat",
            "conf.json",
        ]);
        let Command::Run(opts) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(
            opts.inline,
            vec![(PathBuf::from("conf.json"), "{\"a\":1}".to_string())]
        );
        assert_eq!(opts.command, vec![OsString::from("cat"), OsString::from("conf.json")]);
    }

    #[test]
    fn inline_value_may_contain_equals() {
        let cli = Cli::parse_from(["substitute", "run", "--inline", "a.ini=k=v", "--", "true"]);
        let Command::Run(opts) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(opts.inline[0].1, "k=v");
    }

    #[test]
    fn parse_run_with_manifest_and_section() {
        let cli = Cli::parse_from([
            "substitute",
            "run",
            "-m",
            "project.toml",
            "--section",
            "tool.substitute",
            "--",
            "make",
        ]);
        let Command::Run(opts) = cli.command else {
            panic!("expected Run command");
        };
        assert_eq!(opts.manifest, Some(PathBuf::from("project.toml")));
        assert_eq!(opts.section.as_deref(), Some("tool.substitute"));
    }

    #[test]
    fn section_requires_manifest() {
        let result = Cli::try_parse_from([
            "substitute",
            "run",
            "--section",
            "tool",
            "--",
            "true",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn run_requires_program() {
        let result = Cli::try_parse_from(["substitute", "run", "--inline", "a=b"]);
        assert!(result.is_err());
    }

    #[test]
    fn file_pair_without_equals_is_rejected() {
        let result = Cli::try_parse_from(["substitute", "run", "--file", "a", "--", "true"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_probe_json() {
        let cli = Cli::parse_from(["substitute", "probe", "--json", "a.txt", "b/c.txt"]);
        let Command::Probe(opts) = cli.command else {
            panic!("expected Probe command");
        };
        assert!(opts.json);
        assert_eq!(opts.paths.len(), 2);
        assert_eq!(opts.separator, "_");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "substitute",
            "probe",
            "a.txt",
            "--verbose",
            "--log-file",
            "out.log",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("out.log")));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["substitute", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
