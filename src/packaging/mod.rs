//! Packaging backend invocation.
//!
//! Turns the current source tree into binary packages: verifies and installs
//! the `debian/control` build dependencies, prepends a changelog entry for
//! the computed version (transactionally, see
//! [`crate::debian::changelog::ChangelogTransaction`]), runs the configured
//! prebuild command, invokes `dpkg-buildpackage`, installs the produced
//! artifacts locally and hands them to the upload hook.
//!
//! `dpkg-buildpackage` first runs in no-clean mode; on failure it is retried
//! exactly once as a full clean build before the packaging step is declared
//! fatal.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::apt::PackageDatabase;
use crate::config::BuildConfig;
use crate::constants::LONG_COMMAND_TIMEOUT;
use crate::core::ChainbuildError;
use crate::debian::{self, changelog::ChangelogTransaction};
use crate::installer::DependencyInstaller;
use crate::resolver::InstallationOracle;
use crate::utils::ProcessCommand;

/// Build, install and publish the packages of the project at `project_dir`
/// under `version`.
pub async fn generate_package<D: PackageDatabase>(
    project_dir: &Path,
    config: &BuildConfig,
    db: &D,
    version: &str,
    clean_after_build: bool,
) -> Result<()> {
    ensure_build_dependencies(project_dir, db).await?;

    let txn = ChangelogTransaction::begin(project_dir.join("debian/changelog"))?;
    txn.prepend_entry(version)?;

    let result = run_build(project_dir, config, db, version).await;

    // The synthetic entry must not outlive the build, success or not. A
    // restore failure must not mask the build's own error.
    if let Err(e) = txn.restore() {
        tracing::error!("failed to restore debian/changelog: {e}");
    }
    result?;

    if clean_after_build {
        clean_artifacts(project_dir, version)?;
    }
    Ok(())
}

/// Check the `debian/control` build dependencies, installing any that are
/// missing. An uninstallable build dependency is fatal.
async fn ensure_build_dependencies<D: PackageDatabase>(
    project_dir: &Path,
    db: &D,
) -> Result<()> {
    let oracle = InstallationOracle::new(db);
    let installer = DependencyInstaller::new(db);

    for spec in debian::build_dependencies(project_dir)? {
        if oracle.is_any_satisfied(&spec).await? {
            continue;
        }
        tracing::info!("build dependency not satisfied: {spec}");
        if !installer.install(&spec).await? {
            tracing::error!("build dependency cannot be installed: {spec}");
            return Err(ChainbuildError::ResolutionFailed { name: spec.name }.into());
        }
    }
    Ok(())
}

async fn run_build<D: PackageDatabase>(
    project_dir: &Path,
    config: &BuildConfig,
    db: &D,
    version: &str,
) -> Result<()> {
    if let Some(command) = &config.prebuild_command {
        tracing::info!("executing prebuild command: {command}");
        ProcessCommand::shell(command.clone())
            .current_dir(project_dir)
            .timeout(LONG_COMMAND_TIMEOUT)
            .with_context("prebuild command")
            .execute()
            .await?;
    }

    let built = dpkg_buildpackage(project_dir, true).await?;
    if !built {
        tracing::warn!("package build failed, retrying with a clean build");
        if !dpkg_buildpackage(project_dir, false).await? {
            return Err(ChainbuildError::PackagingFailed {
                version: version.to_string(),
            }
            .into());
        }
    }

    let artifacts = built_artifacts(project_dir, version)?;
    if artifacts.is_empty() {
        tracing::warn!("no artifacts found for version {version}");
    }
    db.install_artifacts(&artifacts).await?;
    // Artifacts may have been installed in a dependency-violating order.
    db.fix_broken().await?;

    let last = artifacts.len().saturating_sub(1);
    for (i, artifact) in artifacts.iter().enumerate() {
        upload_artifact(artifact, i == last).await;
    }
    Ok(())
}

async fn dpkg_buildpackage(project_dir: &Path, no_clean: bool) -> Result<bool> {
    let mut cmd = ProcessCommand::new("dpkg-buildpackage");
    if no_clean {
        cmd = cmd.arg("-nc");
    }
    cmd.args(["-uc", "-us"])
        .current_dir(project_dir)
        .timeout(LONG_COMMAND_TIMEOUT)
        .with_context("building package")
        .succeeds()
        .await
}

/// The `.deb` files `dpkg-buildpackage` left in the parent directory for
/// `version`.
fn built_artifacts(project_dir: &Path, version: &str) -> Result<Vec<PathBuf>> {
    let parent = project_dir.parent().unwrap_or(Path::new("."));
    let pattern = format!("{}/*{}_*.deb", parent.display(), glob_escape(version));
    let mut artifacts: Vec<PathBuf> = glob::glob(&pattern)
        .context("invalid artifact glob")?
        .filter_map(std::result::Result::ok)
        .collect();
    artifacts.sort();
    Ok(artifacts)
}

/// Remove every generated file carrying `version` from the parent directory.
fn clean_artifacts(project_dir: &Path, version: &str) -> Result<()> {
    let parent = project_dir.parent().unwrap_or(Path::new("."));
    let pattern = format!("{}/*{}*", parent.display(), glob_escape(version));
    for entry in glob::glob(&pattern).context("invalid cleanup glob")? {
        let path = entry?;
        tracing::debug!("removing generated file {}", path.display());
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

/// Versions contain `[` in no practical case, but `~` and `+` are routine;
/// only glob metacharacters need escaping.
fn glob_escape(version: &str) -> String {
    version
        .chars()
        .flat_map(|c| match c {
            '*' | '?' | '[' | ']' => vec!['[', c, ']'],
            c => vec![c],
        })
        .collect()
}

/// Publish `artifact` to the package repository.
///
/// TODO: wire up repository upload once the target repository interface is
/// settled; for now artifacts only exist locally.
async fn upload_artifact(artifact: &Path, publish: bool) {
    tracing::info!(
        "upload not configured, skipping {} (publish: {publish})",
        artifact.display()
    );
}
