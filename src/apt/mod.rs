//! System package database access.
//!
//! The resolver and installer are generic over the [`PackageDatabase`]
//! capability so the decision logic can be exercised against an in-memory
//! fake. The production implementation, [`AptDatabase`], shells out to
//! `apt-cache`, `apt-get` and `dpkg`.
//!
//! State returned by [`PackageDatabase::query`] is ephemeral: installation
//! mutates the database out-of-band, so callers must re-query after every
//! install and never cache a [`PackageState`] across one.

use anyhow::Result;
use std::path::PathBuf;

use crate::utils::ProcessCommand;

/// Installed and installable versions of one package, as reported by the
/// database at a single point in time.
#[derive(Debug, Clone)]
pub struct PackageState {
    pub name: String,
    /// Currently installed version, if any.
    pub installed: Option<String>,
    /// Installable versions in the database's preference order.
    pub available: Vec<String>,
}

/// Capability to query and mutate the system package database.
///
/// Execution is sequential; implementations are not required to support
/// concurrent calls and returned futures are awaited in place.
#[allow(async_fn_in_trait)]
pub trait PackageDatabase {
    /// Look up a package. `None` means the package is unknown to the
    /// database, which is an ordinary answer, not an error.
    async fn query(&self, name: &str) -> Result<Option<PackageState>>;

    /// Install `name`, pinned to `version` when given, newest otherwise.
    ///
    /// Returns `false` when the installer reports failure; the caller
    /// decides whether that is fatal.
    async fn install(&self, name: &str, version: Option<&str>) -> Result<bool>;

    /// Install locally built package files (`dpkg -i`).
    async fn install_artifacts(&self, artifacts: &[PathBuf]) -> Result<()>;

    /// Repair partially configured packages (`apt-get install -f`), needed
    /// when artifacts were installed in a dependency-violating order.
    async fn fix_broken(&self) -> Result<()>;
}

/// Production database backed by apt and dpkg.
///
/// Queries run unprivileged; mutations go through `sudo`.
#[derive(Debug, Default)]
pub struct AptDatabase;

impl AptDatabase {
    pub fn new() -> Self {
        Self
    }
}

impl PackageDatabase for AptDatabase {
    async fn query(&self, name: &str) -> Result<Option<PackageState>> {
        let output = ProcessCommand::new("apt-cache")
            .args(["policy", "--", name])
            .with_context(format!("querying package {name}"))
            .run()
            .await?;
        // apt-cache exits non-zero (or prints nothing) for unknown packages.
        if !output.success {
            return Ok(None);
        }
        Ok(parse_policy_output(name, &output.stdout))
    }

    async fn install(&self, name: &str, version: Option<&str>) -> Result<bool> {
        let target = match version {
            Some(version) => format!("{name}={version}"),
            None => name.to_string(),
        };
        tracing::info!("installing {target}");
        ProcessCommand::new("sudo")
            .args(["apt-get", "install", "-y", "-q", "--allow-downgrades", "--"])
            .arg(target)
            .with_context(format!("installing {name}"))
            .succeeds()
            .await
    }

    async fn install_artifacts(&self, artifacts: &[PathBuf]) -> Result<()> {
        for artifact in artifacts {
            tracing::info!("installing artifact {}", artifact.display());
            let ok = ProcessCommand::new("sudo")
                .args(["dpkg", "-i"])
                .arg(artifact.display().to_string())
                .with_context("installing built artifact")
                .succeeds()
                .await?;
            if !ok {
                // Expected when artifacts arrive in a dependency-violating
                // order; fix_broken runs afterwards.
                tracing::warn!(
                    "dpkg -i {} reported errors, deferring to apt-get -f",
                    artifact.display()
                );
            }
        }
        Ok(())
    }

    async fn fix_broken(&self) -> Result<()> {
        ProcessCommand::new("sudo")
            .args(["apt-get", "install", "-f", "-y", "-q"])
            .with_context("repairing package state")
            .execute()
            .await?;
        Ok(())
    }
}

/// Parse `apt-cache policy` output into a [`PackageState`].
///
/// Returns `None` when the output carries no `Installed:` line, which is how
/// apt reports a package it has never heard of.
fn parse_policy_output(name: &str, stdout: &str) -> Option<PackageState> {
    let mut installed = None;
    let mut available = Vec::new();
    let mut in_version_table = false;

    for line in stdout.lines() {
        let trimmed = line.trim();
        if let Some(version) = trimmed.strip_prefix("Installed:") {
            let version = version.trim();
            if version != "(none)" {
                installed = Some(version.to_string());
            }
            in_version_table = false;
        } else if trimmed.starts_with("Version table:") {
            in_version_table = true;
        } else if in_version_table {
            // Version rows are "[***] <version> <priority>"; rows listing
            // package sources have a URL in the second field instead.
            let trimmed = trimmed.strip_prefix("***").unwrap_or(trimmed).trim();
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() == 2 && fields[1].parse::<i64>().is_ok() {
                available.push(fields[0].to_string());
            }
        }
    }

    if installed.is_none() && available.is_empty() && !stdout.contains("Installed:") {
        return None;
    }

    Some(PackageState {
        name: name.to_string(),
        installed,
        available,
    })
}

/// In-memory database for tests: deterministic state plus a log of every
/// query and mutation for assertions.
#[cfg(any(test, feature = "test-utils"))]
pub mod fake {
    use super::{PackageDatabase, PackageState};
    use anyhow::Result;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        packages: HashMap<String, PackageState>,
        failing: HashSet<String>,
        queries: Vec<String>,
        installs: Vec<(String, Option<String>)>,
        artifact_installs: Vec<PathBuf>,
    }

    /// Fake [`PackageDatabase`] over a `HashMap`.
    #[derive(Default)]
    pub struct InMemoryDatabase {
        inner: Mutex<Inner>,
    }

    impl InMemoryDatabase {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a known package with its installed and available versions.
        #[must_use]
        pub fn with_package(
            self,
            name: &str,
            installed: Option<&str>,
            available: &[&str],
        ) -> Self {
            self.inner.lock().unwrap().packages.insert(
                name.to_string(),
                PackageState {
                    name: name.to_string(),
                    installed: installed.map(str::to_string),
                    available: available.iter().map(|s| (*s).to_string()).collect(),
                },
            );
            self
        }

        /// Make installs of `name` fail without mutating state.
        #[must_use]
        pub fn with_failing_install(self, name: &str) -> Self {
            self.inner.lock().unwrap().failing.insert(name.to_string());
            self
        }

        /// Names passed to `query`, in call order.
        pub fn queries(&self) -> Vec<String> {
            self.inner.lock().unwrap().queries.clone()
        }

        /// `(name, pinned version)` pairs passed to `install`, in call order.
        pub fn installs(&self) -> Vec<(String, Option<String>)> {
            self.inner.lock().unwrap().installs.clone()
        }

        /// Artifact paths passed to `install_artifacts`, in call order.
        pub fn artifact_installs(&self) -> Vec<PathBuf> {
            self.inner.lock().unwrap().artifact_installs.clone()
        }
    }

    impl PackageDatabase for InMemoryDatabase {
        async fn query(&self, name: &str) -> Result<Option<PackageState>> {
            let mut inner = self.inner.lock().unwrap();
            inner.queries.push(name.to_string());
            Ok(inner.packages.get(name).cloned())
        }

        async fn install(&self, name: &str, version: Option<&str>) -> Result<bool> {
            let mut inner = self.inner.lock().unwrap();
            inner
                .installs
                .push((name.to_string(), version.map(str::to_string)));
            if inner.failing.contains(name) {
                return Ok(false);
            }
            let Some(state) = inner.packages.get_mut(name) else {
                return Ok(false);
            };
            let effective = version
                .map(str::to_string)
                .or_else(|| state.available.first().cloned());
            match effective {
                Some(v) => {
                    state.installed = Some(v);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn install_artifacts(&self, artifacts: &[PathBuf]) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner.artifact_installs.extend(artifacts.iter().cloned());
            Ok(())
        }

        async fn fix_broken(&self) -> Result<()> {
            Ok(())
        }
    }
}
