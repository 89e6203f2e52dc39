//! Shared helpers for integration tests.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// A throwaway project directory.
pub struct ProjectFixture {
    root: TempDir,
}

impl ProjectFixture {
    /// An empty project directory with no build configuration.
    pub fn empty() -> Self {
        Self {
            root: TempDir::new().expect("create temp project"),
        }
    }

    /// A project directory holding the given `.build.yaml` content.
    pub fn with_config(yaml: &str) -> Self {
        let fixture = Self::empty();
        std::fs::write(fixture.path().join(".build.yaml"), yaml).expect("write config");
        fixture
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// The chainbuild binary, pointed at this project directory with a
    /// dummy base URL.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("chainbuild").expect("binary built");
        cmd.current_dir(self.path())
            .arg("--base-url")
            .arg("https://git.example.com/repos")
            // Keep tests hermetic: never touch the network or apt.
            .arg("--no-update-git");
        cmd
    }
}
