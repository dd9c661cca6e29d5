#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the substitution round trip.
//!
//! Each test lays out a sandbox, substitutes one or more paths, and checks
//! that disposing leaves the sandbox exactly as it was.

mod common;

use std::fs;
use std::time::Duration;

use common::SandboxBuilder;
use scoped_substitute::config::SubstituteOptions;
use scoped_substitute::error::ErrorKind;
use scoped_substitute::substitute::{self, Stage, Substitution, SubstitutionSet};

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn existent_path_round_trip_restores_bytes_and_mtime() {
    let original: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let sandbox = SandboxBuilder::new()
        .with_file("data.bin", &original)
        .with_age("data.bin", 3600)
        .build();
    let target = sandbox.path("data.bin");
    let before_tree = sandbox.tree();
    let before_mtime = fs::metadata(&target).unwrap().modified().unwrap();

    let mut record = substitute::begin(&target, b"substitute");
    assert!(record.is_active());
    record.dispose().unwrap();

    assert_eq!(fs::read(&target).unwrap(), original);
    let after_mtime = fs::metadata(&target).unwrap().modified().unwrap();
    let drift = after_mtime
        .duration_since(before_mtime)
        .unwrap_or_else(|e| e.duration());
    assert!(drift < Duration::from_secs(2), "mtime drifted by {drift:?}");
    assert_eq!(sandbox.tree(), before_tree, "no backup may remain");
}

#[cfg(unix)]
#[test]
fn existent_path_round_trip_restores_mode() {
    use std::os::unix::fs::PermissionsExt as _;

    let sandbox = SandboxBuilder::new()
        .with_file("run.sh", b"#!/bin/sh\n")
        .with_mode("run.sh", 0o750)
        .build();
    let target = sandbox.path("run.sh");

    let mut record = substitute::begin(&target, b"echo hi\n");
    record.dispose().unwrap();

    let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o750);
}

#[test]
fn absent_path_round_trip_leaves_no_directories() {
    let sandbox = SandboxBuilder::new().with_file("keep.txt", b"k").build();
    let before = sandbox.tree();

    let mut record = substitute::begin(sandbox.path("x/y/z/conf.toml"), b"a = 1\n");
    assert!(sandbox.path("x/y/z").is_dir());
    record.dispose().unwrap();

    assert_eq!(sandbox.tree(), before);
}

#[test]
fn content_is_visible_while_active() {
    let sandbox = SandboxBuilder::new().with_file("conf.json", b"{}").build();
    let target = sandbox.path("conf.json");

    let mut record = substitute::begin(&target, br#"{"a":1}"#);
    assert_eq!(fs::read(&target).unwrap(), br#"{"a":1}"#);
    assert_eq!(fs::read(sandbox.path("conf_0.json")).unwrap(), b"{}");
    record.dispose().unwrap();
}

#[test]
fn conf_json_in_empty_directory() {
    let sandbox = SandboxBuilder::new().build();
    let target = sandbox.path("conf.json");

    let mut record = substitute::begin(&target, br#"{"a":1}"#);
    assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"a":1}"#);
    record.dispose().unwrap();

    assert!(!target.exists());
    assert!(!sandbox.path("conf_0.json").exists());
    assert!(sandbox.tree().is_empty());
}

// ---------------------------------------------------------------------------
// Backup naming and partial directory chains
// ---------------------------------------------------------------------------

#[test]
fn backup_name_collision_moves_to_next_counter() {
    let sandbox = SandboxBuilder::new()
        .with_file("conf.json", b"original")
        .with_file("conf_0.json", b"unrelated sibling")
        .build();
    let target = sandbox.path("conf.json");

    let mut record = substitute::begin(&target, b"new");
    assert_eq!(fs::read(sandbox.path("conf_1.json")).unwrap(), b"original");
    assert_eq!(fs::read(sandbox.path("conf_0.json")).unwrap(), b"unrelated sibling");
    record.dispose().unwrap();

    assert_eq!(fs::read(&target).unwrap(), b"original");
    assert_eq!(fs::read(sandbox.path("conf_0.json")).unwrap(), b"unrelated sibling");
    assert!(!sandbox.path("conf_1.json").exists());
}

#[test]
fn only_missing_part_of_chain_is_created_and_removed() {
    let sandbox = SandboxBuilder::new().with_dir("a").build();
    let target = sandbox.path("a/b/c.json");

    let mut record = Substitution::begin(&target, b"{}", &SubstituteOptions::default());
    let plan_dirs = record
        .strategy()
        .map(|s| s.artifacts())
        .unwrap_or_default();
    assert!(plan_dirs.contains(&sandbox.path("a/b")));
    assert!(!plan_dirs.contains(&sandbox.path("a")));
    record.dispose().unwrap();

    assert!(!sandbox.path("a/b").exists());
    assert!(sandbox.path("a").is_dir(), "pre-existing directory must stay");
}

#[test]
fn foreign_file_in_created_directory_keeps_it() {
    let sandbox = SandboxBuilder::new().build();
    let mut record = substitute::begin(sandbox.path("gen/out.txt"), b"x");
    fs::write(sandbox.path("gen/other.txt"), b"written meanwhile").unwrap();

    let err = record.dispose().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
    assert!(!sandbox.path("gen/out.txt").exists());
    assert!(sandbox.path("gen/other.txt").exists());
}

// ---------------------------------------------------------------------------
// Teardown safety
// ---------------------------------------------------------------------------

#[test]
fn double_dispose_is_safe() {
    let sandbox = SandboxBuilder::new().with_file("a.txt", b"a").build();
    let mut record = substitute::begin(sandbox.path("a.txt"), b"b");

    record.dispose().unwrap();
    record.dispose().unwrap();

    assert_eq!(record.stage(), Stage::BackedOut);
    assert_eq!(fs::read(sandbox.path("a.txt")).unwrap(), b"a");
}

#[test]
fn failed_setup_is_reported_again_on_dispose() {
    let sandbox = SandboxBuilder::new().with_file("plain", b"not a dir").build();
    let mut record = substitute::begin(sandbox.path("plain/child.txt"), b"x");

    let setup = record.setup_error().cloned().unwrap();
    #[cfg(unix)]
    assert_eq!(setup.kind(), ErrorKind::StatProbeFailed);
    let first = record.dispose().unwrap_err();
    let second = record.dispose().unwrap_err();

    assert_eq!(first.kind(), setup.kind());
    assert_eq!(second.to_string(), first.to_string());
    assert_eq!(fs::read(sandbox.path("plain")).unwrap(), b"not a dir");
}

#[test]
fn dropping_a_record_restores_the_file() {
    let sandbox = SandboxBuilder::new().with_file("env", b"PROD=1").build();
    {
        let record = substitute::begin(sandbox.path("env"), b"PROD=0");
        assert!(record.is_active());
    }
    assert_eq!(fs::read(sandbox.path("env")).unwrap(), b"PROD=1");
    assert!(!sandbox.path("env_0").exists());
}

#[test]
fn set_restores_nested_substitutions_of_one_path() {
    let sandbox = SandboxBuilder::new().with_file("c.ini", b"v0").build();
    let before = sandbox.tree();
    let options = SubstituteOptions::default();
    let mut set = SubstitutionSet::new();

    set.begin(sandbox.path("c.ini"), b"v1", &options).unwrap();
    set.begin(sandbox.path("c.ini"), b"v2", &options).unwrap();
    assert_eq!(fs::read(sandbox.path("c.ini")).unwrap(), b"v2");
    set.dispose().unwrap();

    assert_eq!(fs::read(sandbox.path("c.ini")).unwrap(), b"v0");
    assert_eq!(sandbox.tree(), before);
}
