//! Convenience constructors for the git invocations chainbuild needs.
//!
//! Thin, typed wrappers over [`ProcessCommand`] so call sites read as git
//! operations rather than argument lists. Like Cargo's `git-fetch-with-cli`,
//! the system git binary is used instead of an embedded library, which keeps
//! authentication (SSH agents, credential helpers) working unchanged.

use std::path::Path;

use crate::constants::LONG_COMMAND_TIMEOUT;
use crate::utils::ProcessCommand;

/// Builder for one git invocation rooted at a repository directory.
pub struct GitCommand;

impl GitCommand {
    fn git(repo: &Path) -> ProcessCommand {
        ProcessCommand::new("git").current_dir(repo)
    }

    /// `git clone <url> <target>`, run from `parent`.
    pub fn clone(parent: &Path, url: &str, target: &str) -> ProcessCommand {
        ProcessCommand::new("git")
            .current_dir(parent)
            .args(["clone", "--", url, target])
            .timeout(LONG_COMMAND_TIMEOUT)
            .with_context(format!("cloning {url}"))
    }

    /// `git remote update`: refresh every remote without touching the tree.
    pub fn remote_update(repo: &Path) -> ProcessCommand {
        Self::git(repo)
            .args(["remote", "update"])
            .with_context("updating remotes")
    }

    /// `git describe --abbrev=0 --tags`: the most recent reachable tag.
    pub fn last_tag(repo: &Path) -> ProcessCommand {
        Self::git(repo).args(["describe", "--abbrev=0", "--tags"])
    }

    /// `git rev-list --max-parents=0 HEAD`: the root commit(s).
    pub fn root_commit(repo: &Path) -> ProcessCommand {
        Self::git(repo).args(["rev-list", "--max-parents=0", "HEAD"])
    }

    /// `git rev-list --count <ref>..HEAD`: commits since `since`.
    pub fn count_since(repo: &Path, since: &str) -> ProcessCommand {
        Self::git(repo).args(["rev-list", "--count", &format!("{since}..HEAD")])
    }

    /// `git rev-parse --short HEAD`.
    pub fn short_head(repo: &Path) -> ProcessCommand {
        Self::git(repo).args(["rev-parse", "--short", "HEAD"])
    }
}
