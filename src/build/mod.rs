//! Recursive build orchestration.
//!
//! For each dependency declared in a project's `.build.yaml`: check whether
//! it is already satisfied; if not, clone or update its source tree next to
//! the current project, recurse into it, and afterwards install whatever the
//! recursive build produced (or the package database offers). Once every
//! dependency is settled the project itself is versioned and packaged.
//!
//! Two deliberate departures from the ancestral flow: the walk carries an
//! active-project stack and fails with `CyclicDependency` instead of
//! recursing forever, and an unresolvable dependency aborts the build unless
//! `--best-effort` asks for the old log-and-continue behavior.

pub mod version;

use anyhow::{Context, Result};
use futures::future::{FutureExt, LocalBoxFuture};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::apt::PackageDatabase;
use crate::config::BuildConfig;
use crate::core::ChainbuildError;
use crate::debian;
use crate::deps::DependencySpec;
use crate::git::ProjectRepo;
use crate::installer::DependencyInstaller;
use crate::packaging;
use crate::resolver::InstallationOracle;

/// Behavior switches threaded through every recursive invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Omit the timestamp from development snapshot versions.
    pub simplify_dev_version: bool,
    /// Remove generated artifacts after a successful build.
    pub clean_after_build: bool,
    /// Do not refresh remotes of already-cloned dependency trees.
    pub skip_source_update: bool,
    /// Log unresolvable dependencies and keep building instead of failing.
    pub best_effort: bool,
}

/// Immutable per-invocation context. Each recursive descent derives a new
/// context scoped to the dependency's checkout; nothing here is mutated in
/// place and no code consults the process working directory.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Root of the project being built.
    pub project_dir: PathBuf,
    /// Base URL dependency repositories are cloned from.
    pub base_url: String,
    /// Configuration file name, resolved against each project directory.
    pub config_file: PathBuf,
    /// Recursion depth, `0` for the top-level invocation.
    pub depth: u32,
    pub options: BuildOptions,
}

impl BuildContext {
    /// The configuration path for this project.
    ///
    /// An absolute `--file` names the top-level configuration and is used
    /// verbatim there; recursive descents re-root its file name in each
    /// dependency checkout.
    pub fn config_path(&self) -> PathBuf {
        if self.config_file.is_absolute() {
            if self.depth == 0 {
                return self.config_file.clone();
            }
            match self.config_file.file_name() {
                Some(name) => self.project_dir.join(name),
                None => self.config_file.clone(),
            }
        } else {
            self.project_dir.join(&self.config_file)
        }
    }

    /// Context for building the dependency checked out at `dir`.
    fn descend(&self, dir: PathBuf) -> Self {
        let mut ctx = self.clone();
        ctx.project_dir = dir;
        ctx.depth = self.depth + 1;
        ctx
    }
}

/// What an invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The project was packaged.
    Built,
    /// The project has no build configuration and was left alone.
    Skipped,
}

/// The recursive build driver.
///
/// Owns the package database handle, the cancellation flag, and the
/// active-project stack used for cycle detection.
pub struct Orchestrator<D: PackageDatabase> {
    db: D,
    cancel: Arc<AtomicBool>,
    active: Vec<String>,
}

impl<D: PackageDatabase> Orchestrator<D> {
    pub fn new(db: D, cancel: Arc<AtomicBool>) -> Self {
        Self {
            db,
            cancel,
            active: Vec::new(),
        }
    }

    /// Build the project described by `ctx`, recursing into unsatisfied
    /// dependencies first.
    pub fn build<'a>(&'a mut self, ctx: BuildContext) -> LocalBoxFuture<'a, Result<BuildOutcome>> {
        async move {
            let name = project_name(&ctx.project_dir)?;
            if self.active.iter().any(|active| *active == name) {
                let chain = self
                    .active
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(name.as_str()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(ChainbuildError::CyclicDependency { chain }.into());
            }

            self.active.push(name);
            let result = self.build_project(&ctx).await;
            self.active.pop();
            result
        }
        .boxed_local()
    }

    async fn build_project(&mut self, ctx: &BuildContext) -> Result<BuildOutcome> {
        tracing::info!("building project {}", ctx.project_dir.display());

        let config_path = ctx.config_path();
        let config = match BuildConfig::load(&config_path) {
            Ok(config) => config,
            Err(ChainbuildError::ConfigNotFound { path }) => {
                tracing::warn!("no build configuration at {path}, nothing to build");
                return Ok(BuildOutcome::Skipped);
            }
            Err(e) => return Err(e.into()),
        };
        let specs = config.dependency_specs(&config_path)?;

        for spec in &specs {
            self.check_cancelled()?;

            let oracle = InstallationOracle::new(&self.db);
            if oracle.is_any_satisfied(spec).await? {
                tracing::debug!("dependency already satisfied: {spec}");
                continue;
            }
            tracing::info!("dependency not satisfied: {spec}");
            self.resolve_dependency(ctx, spec).await?;
        }

        self.check_cancelled()?;
        let package_version = version::compute_package_version(
            &ctx.project_dir,
            &config,
            ctx.options.simplify_dev_version,
        )
        .await?;
        tracing::info!("packaging version {package_version}");
        packaging::generate_package(
            &ctx.project_dir,
            &config,
            &self.db,
            &package_version,
            ctx.options.clean_after_build,
        )
        .await?;

        Ok(BuildOutcome::Built)
    }

    /// Fetch, recursively build, and finally install one unsatisfied
    /// dependency.
    async fn resolve_dependency(&mut self, ctx: &BuildContext, spec: &DependencySpec) -> Result<()> {
        let parent = ctx
            .project_dir
            .parent()
            .with_context(|| format!("project {} has no parent directory", ctx.project_dir.display()))?
            .to_path_buf();

        let repo = ProjectRepo::clone_or_update(
            &ctx.base_url,
            &spec.name,
            &parent,
            ctx.options.skip_source_update,
        )
        .await?;

        self.build(ctx.descend(repo.path().to_path_buf())).await?;

        let satisfied = self.ensure_installed(repo.path(), spec).await?;
        if !satisfied {
            if ctx.options.best_effort {
                tracing::error!("dependency could not be satisfied, continuing: {spec}");
            } else {
                return Err(ChainbuildError::ResolutionFailed {
                    name: spec.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Re-check `spec` after its recursive build, installing what is still
    /// missing. When the dependency's checkout carries a `debian/control`,
    /// every binary package it produces is held to the spec's constraint,
    /// not just the declared name.
    async fn ensure_installed(&self, dep_dir: &Path, spec: &DependencySpec) -> Result<bool> {
        let installer = DependencyInstaller::new(&self.db);

        let binary_packages = match debian::binary_packages(dep_dir) {
            Ok(packages) if !packages.is_empty() => packages,
            _ => return installer.install(spec).await,
        };

        let mut satisfied = true;
        for package in binary_packages {
            // Each binary package is held to the constraint on its own; the
            // spec's alternatives name other packages, not this one.
            let per_package = DependencySpec::new(package, spec.constraint.clone());
            if !installer.install(&per_package).await? {
                tracing::warn!("package not installed: {}", per_package.name);
                satisfied = false;
            }
        }
        Ok(satisfied)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(ChainbuildError::Interrupted.into());
        }
        Ok(())
    }
}

fn project_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a project name from {}", dir.display()))
}
