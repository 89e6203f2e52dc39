//! Command-line interface.
//!
//! The surface is deliberately flat: chainbuild does exactly one thing, so
//! there are no subcommands. Underscore spellings of the long flags are
//! accepted as hidden aliases for compatibility with existing pipeline
//! invocations.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

use crate::apt::AptDatabase;
use crate::build::{BuildContext, BuildOptions, Orchestrator};
use crate::constants::DEFAULT_CONFIG_FILE;

/// Resolve, build and install inter-project dependencies, then package the
/// current project.
#[derive(Debug, Parser)]
#[command(
    name = "chainbuild",
    version,
    about = "Recursive dependency-aware build orchestrator for Debian packages",
    long_about = "Reads the project's .build.yaml, ensures every declared dependency is \
installed in a satisfying version (recursively fetching and building sibling projects \
when necessary), then generates and installs a versioned Debian package of the current \
project."
)]
pub struct Cli {
    /// Configuration file to read, resolved against each project directory.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    file: PathBuf,

    /// Base repository URL dependency projects are cloned from.
    #[arg(long, visible_alias = "base_url", value_name = "URL", required = true)]
    base_url: String,

    /// Simplify development versions (no timestamp), useful for debugging
    /// and reproducible dev packaging.
    #[arg(long, visible_alias = "simplify_dev_version")]
    simplify_dev_version: bool,

    /// Remove generated artifacts when finished.
    #[arg(long)]
    clean: bool,

    /// Do not update git repositories of dependency projects.
    #[arg(long, visible_alias = "no_update_git")]
    no_update_git: bool,

    /// Keep building when a dependency cannot be satisfied instead of
    /// failing.
    #[arg(long)]
    best_effort: bool,

    /// Enable debug output.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Run the orchestrator on the current project directory.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        if which::which("git").is_err() {
            anyhow::bail!("git is not installed or not found in PATH");
        }
        if which::which("dpkg-buildpackage").is_err() {
            tracing::warn!("dpkg-buildpackage not found in PATH, packaging will fail");
        }

        let cancel = install_cancellation_handler();
        let ctx = BuildContext {
            project_dir: std::env::current_dir()?,
            base_url: self.base_url,
            config_file: self.file,
            depth: 0,
            options: BuildOptions {
                simplify_dev_version: self.simplify_dev_version,
                clean_after_build: self.clean,
                skip_source_update: self.no_update_git,
                best_effort: self.best_effort,
            },
        };

        let mut orchestrator = Orchestrator::new(AptDatabase::new(), cancel);
        orchestrator.build(ctx).await?;
        Ok(())
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Set a shared flag on Ctrl-C; the orchestrator checks it between
/// dependency steps.
fn install_cancellation_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            flag.store(true, Ordering::Relaxed);
        }
    });
    cancel
}
