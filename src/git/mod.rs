//! Source control collaborator.
//!
//! [`ProjectRepo`] wraps a local checkout of a project and exposes the
//! handful of history queries the version computer needs, plus the
//! clone-or-update step the dependency walk performs for sibling projects.
//! All operations receive the repository directory explicitly; nothing here
//! depends on the process working directory.

pub mod command_builder;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::core::ChainbuildError;
use command_builder::GitCommand;

/// A local git checkout.
#[derive(Debug, Clone)]
pub struct ProjectRepo {
    path: PathBuf,
}

impl ProjectRepo {
    /// Wrap an existing checkout without validating it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The checkout directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` looks like a git checkout.
    pub fn is_repo(path: &Path) -> bool {
        path.join(".git").exists()
    }

    /// Ensure `<parent>/<name>` holds an up-to-date checkout of
    /// `<base_url>/<name>`: clone it when absent, otherwise refresh its
    /// remotes unless `skip_update` is set.
    pub async fn clone_or_update(
        base_url: &str,
        name: &str,
        parent: &Path,
        skip_update: bool,
    ) -> Result<Self> {
        let target = parent.join(name);
        if Self::is_repo(&target) {
            if skip_update {
                tracing::debug!("not updating {name}, source updates disabled");
            } else {
                tracing::info!("updating repository {name}");
                GitCommand::remote_update(&target).execute().await?;
            }
            return Ok(Self::new(target));
        }

        let url = format!("{}/{}", base_url.trim_end_matches('/'), name);
        tracing::info!("cloning repository {url}");
        let output = GitCommand::clone(parent, &url, name).run().await?;
        if !output.success {
            return Err(ChainbuildError::GitCloneFailed {
                url,
                reason: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(Self::new(target))
    }

    /// The last release reference: the most recent reachable tag, or the
    /// root commit when the history has never been tagged.
    pub async fn last_release_ref(&self) -> Result<String> {
        if let Ok(output) = GitCommand::last_tag(&self.path).execute_stdout().await {
            if !output.is_empty() {
                return Ok(output);
            }
        }
        let roots = GitCommand::root_commit(&self.path)
            .execute_stdout()
            .await
            .context("finding root commit")?;
        roots
            .lines()
            .next()
            .map(str::to_string)
            .context("repository has no commits")
    }

    /// Number of commits between `since` and HEAD.
    pub async fn commits_since(&self, since: &str) -> Result<u64> {
        let raw = GitCommand::count_since(&self.path, since)
            .execute_stdout()
            .await?;
        raw.parse()
            .with_context(|| format!("unexpected rev-list count output '{raw}'"))
    }

    /// Abbreviated hash of HEAD.
    pub async fn short_head(&self) -> Result<String> {
        GitCommand::short_head(&self.path).execute_stdout().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ProcessCommand;

    async fn git(repo: &Path, args: &[&str]) {
        ProcessCommand::new("git")
            .current_dir(repo)
            .args(args.iter().copied())
            .execute()
            .await
            .unwrap();
    }

    async fn init_repo(dir: &Path) {
        git(dir, &["init", "-q"]).await;
        git(dir, &["config", "user.email", "build@example.com"]).await;
        git(dir, &["config", "user.name", "Build"]).await;
        git(dir, &["commit", "--allow-empty", "-q", "-m", "first"]).await;
    }

    #[test]
    fn is_repo_detects_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!ProjectRepo::is_repo(dir.path()));
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(ProjectRepo::is_repo(dir.path()));
    }

    #[tokio::test]
    async fn untagged_history_falls_back_to_root_commit() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;
        git(dir.path(), &["commit", "--allow-empty", "-q", "-m", "second"]).await;

        let repo = ProjectRepo::new(dir.path());
        let release = repo.last_release_ref().await.unwrap();
        // Root commit: one commit between it and HEAD.
        assert_eq!(repo.commits_since(&release).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tagged_history_reports_tag_and_distance() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;
        git(dir.path(), &["tag", "v1.0.0"]).await;
        git(dir.path(), &["commit", "--allow-empty", "-q", "-m", "second"]).await;
        git(dir.path(), &["commit", "--allow-empty", "-q", "-m", "third"]).await;

        let repo = ProjectRepo::new(dir.path());
        assert_eq!(repo.last_release_ref().await.unwrap(), "v1.0.0");
        assert_eq!(repo.commits_since("v1.0.0").await.unwrap(), 2);
        assert!(!repo.short_head().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clone_or_update_skips_update_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path().join("proj");
        std::fs::create_dir_all(checkout.join(".git")).unwrap();

        // An existing checkout with updates disabled must not invoke git at
        // all, so even this fake .git directory passes through untouched.
        let repo = ProjectRepo::clone_or_update("file:///nowhere", "proj", dir.path(), true)
            .await
            .unwrap();
        assert_eq!(repo.path(), checkout.as_path());
    }

    #[tokio::test]
    async fn clone_failure_is_reported_with_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectRepo::clone_or_update(
            &format!("file://{}", dir.path().join("missing").display()),
            "proj",
            dir.path(),
            false,
        )
        .await
        .unwrap_err();
        match err.downcast_ref::<ChainbuildError>() {
            Some(ChainbuildError::GitCloneFailed { url, .. }) => {
                assert!(url.ends_with("/proj"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
