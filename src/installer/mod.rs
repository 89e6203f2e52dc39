//! Driving the package database to satisfy a dependency.
//!
//! Walks the primary and its alternatives in order, installing the first
//! candidate the database knows about, and re-checking satisfaction against
//! fresh state after each attempt. Installer failures are reported as
//! `false` rather than errors; the orchestrator decides fatality.

use anyhow::Result;

use crate::apt::PackageDatabase;
use crate::deps::DependencySpec;
use crate::resolver::{self, InstallationOracle};

/// Brings unsatisfied dependencies into a satisfied state.
pub struct DependencyInstaller<'a, D: PackageDatabase> {
    db: &'a D,
}

impl<'a, D: PackageDatabase> DependencyInstaller<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Try to satisfy `spec`, returning whether it ended up satisfied.
    ///
    /// Idempotent: an already-satisfied spec returns `true` without touching
    /// the database. Otherwise the primary and each alternative are tried in
    /// order: unknown packages are skipped, known ones are installed at the
    /// first available version matching their constraint (or the newest
    /// available when none matches), and satisfaction is re-checked against
    /// a fresh database read before moving on.
    pub async fn install(&self, spec: &DependencySpec) -> Result<bool> {
        let oracle = InstallationOracle::new(self.db);
        if oracle.is_any_satisfied(spec).await? {
            return Ok(true);
        }

        for (name, constraint) in spec.candidates() {
            let Some(state) = self.db.query(name).await? else {
                tracing::debug!("package {name} unknown to the database, trying next alternative");
                continue;
            };

            let version = resolver::select_from(&state, constraint);
            let installed = self.db.install(name, version.as_deref()).await?;
            if !installed {
                tracing::warn!("installer reported failure for {name}");
            }

            // Installation mutates the database out-of-band; the re-check
            // must not reuse the state queried above.
            if oracle.is_any_satisfied(spec).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
