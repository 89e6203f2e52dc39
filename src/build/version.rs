//! Package version derivation.
//!
//! The computed version distinguishes tagged releases from development
//! snapshots and qualifies both with the target distribution codename:
//!
//! - at a release tag: `base.codename`
//! - past a tag: `base~timestamp.distance.hash.codename`, or
//!   `base~distance.hash.codename` with `--simplify-dev-version`, which
//!   makes two builds of the same commit produce identical versions.
//!
//! The `~` marker makes every snapshot sort before the release it precedes,
//! and growing distances keep successive snapshots monotonically increasing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::config::BuildConfig;
use crate::debian::changelog;
use crate::git::ProjectRepo;
use crate::utils::ProcessCommand;

/// Inputs describing the current source tree, gathered from git and the
/// distribution.
#[derive(Debug, Clone)]
pub struct SourceTreeState {
    pub base_version: String,
    pub commits_since_release: u64,
    pub short_commit: String,
    pub codename: String,
}

/// Compute the package version for the project at `project_dir`.
pub async fn compute_package_version(
    project_dir: &Path,
    config: &BuildConfig,
    simplify_dev_version: bool,
) -> Result<String> {
    let repo = ProjectRepo::new(project_dir);
    let release_ref = repo.last_release_ref().await?;
    let state = SourceTreeState {
        base_version: base_version(project_dir, config).await?,
        commits_since_release: repo.commits_since(&release_ref).await?,
        short_commit: repo.short_head().await?,
        codename: distribution_codename().await?,
    };
    Ok(assemble(&state, simplify_dev_version, Utc::now()))
}

/// The upstream base version: the configured `version-command`'s stdout, or
/// the newest changelog entry's version when no command is configured.
async fn base_version(project_dir: &Path, config: &BuildConfig) -> Result<String> {
    match &config.version_command {
        Some(command) => ProcessCommand::shell(command.clone())
            .current_dir(project_dir)
            .with_context("reading project version")
            .execute_stdout()
            .await
            .context("version-command failed"),
        None => {
            let entry = changelog::latest_entry(&project_dir.join("debian/changelog"))
                .context("no version-command configured and debian/changelog unreadable")?;
            Ok(entry.version)
        }
    }
}

/// The target distribution's codename, e.g. `xenial`.
async fn distribution_codename() -> Result<String> {
    ProcessCommand::new("lsb_release")
        .arg("-cs")
        .with_context("reading distribution codename")
        .execute_stdout()
        .await
}

/// Assemble the final version string. Pure, for testability.
fn assemble(state: &SourceTreeState, simplify_dev_version: bool, now: DateTime<Utc>) -> String {
    let base = strip_release_suffix(&state.base_version);
    if state.commits_since_release > 0 {
        if simplify_dev_version {
            format!(
                "{base}~{}.{}.{}",
                state.commits_since_release, state.short_commit, state.codename
            )
        } else {
            format!(
                "{base}~{}.{}.{}.{}",
                now.format("%Y%m%d%H%M%S"),
                state.commits_since_release,
                state.short_commit,
                state.codename
            )
        }
    } else {
        format!("{base}.{}", state.codename)
    }
}

/// Drop a trailing `-<release>` suffix, if present.
fn strip_release_suffix(version: &str) -> &str {
    match version.rfind('-') {
        Some(idx) => &version[..idx],
        None => version,
    }
}
