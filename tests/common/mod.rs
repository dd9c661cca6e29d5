// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed sandbox and a fluent builder so each
// integration test can lay out files and directories without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// An isolated sandbox backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct Sandbox {
    /// Temporary directory holding the test files.
    pub root: tempfile::TempDir,
}

impl Sandbox {
    /// Create an empty sandbox.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Path to the sandbox root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Absolute path of `rel` inside the sandbox.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Every entry below the root, as sorted `/`-separated relative paths.
    ///
    /// Used to assert that a round trip leaves no artifacts behind.
    pub fn tree(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        walk(self.root.path(), self.root.path(), &mut out);
        out
    }
}

fn walk(root: &Path, dir: &Path, out: &mut BTreeSet<String>) {
    for entry in std::fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        let rel = path
            .strip_prefix(root)
            .expect("under root")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let is_dir = path.is_dir();
        out.insert(rel);
        if is_dir {
            walk(root, &path, out);
        }
    }
}

/// Fluent builder for a [`Sandbox`].
pub struct SandboxBuilder {
    sandbox: Sandbox,
}

impl SandboxBuilder {
    /// Start building an empty sandbox.
    pub fn new() -> Self {
        Self {
            sandbox: Sandbox::new(),
        }
    }

    /// Create a directory (and its parents).
    pub fn with_dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.sandbox.path(rel)).expect("create dir");
        self
    }

    /// Write a file, creating its parent directories.
    pub fn with_file(self, rel: &str, content: &[u8]) -> Self {
        let path = self.sandbox.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write file");
        self
    }

    /// Set the modification time of an existing file to `secs_ago` seconds
    /// in the past.
    pub fn with_age(self, rel: &str, secs_ago: u64) -> Self {
        let stamp = SystemTime::now() - Duration::from_secs(secs_ago);
        let file = std::fs::File::options()
            .write(true)
            .open(self.sandbox.path(rel))
            .expect("open for set_modified");
        file.set_modified(stamp).expect("set mtime");
        self
    }

    /// Set the unix permission bits of an existing path.
    #[cfg(unix)]
    pub fn with_mode(self, rel: &str, mode: u32) -> Self {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(
            self.sandbox.path(rel),
            std::fs::Permissions::from_mode(mode),
        )
        .expect("set mode");
        self
    }

    /// Finish building.
    pub fn build(self) -> Sandbox {
        self.sandbox
    }
}
