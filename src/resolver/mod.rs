//! Satisfaction checks against the package database.
//!
//! The oracle answers three questions, all read-only: is a single
//! name/constraint pair satisfied by what is installed, is a dependency
//! satisfied by any of its alternatives, and which available version should
//! be installed to satisfy a constraint. Unknown packages are an ordinary
//! "not installed" answer.

use anyhow::Result;

use crate::apt::{PackageDatabase, PackageState};
use crate::deps::DependencySpec;
use crate::version::VersionConstraint;

/// Read-only satisfaction queries over a [`PackageDatabase`].
pub struct InstallationOracle<'a, D: PackageDatabase> {
    db: &'a D,
}

impl<'a, D: PackageDatabase> InstallationOracle<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Whether `name` is installed in a version satisfying `constraint`.
    pub async fn is_satisfied(&self, name: &str, constraint: &VersionConstraint) -> Result<bool> {
        let Some(state) = self.db.query(name).await? else {
            return Ok(false);
        };
        Ok(state
            .installed
            .as_deref()
            .is_some_and(|installed| constraint.matches(installed)))
    }

    /// Whether the primary or any alternative of `spec` is satisfied.
    ///
    /// Evaluated in declaration order with a short-circuit on the first
    /// satisfied candidate.
    pub async fn is_any_satisfied(&self, spec: &DependencySpec) -> Result<bool> {
        for (name, constraint) in spec.candidates() {
            if self.is_satisfied(name, constraint).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The version to install for `name` under `constraint`: the first
    /// available version that matches, in the database's reported order.
    pub async fn select_version_to_install(
        &self,
        name: &str,
        constraint: &VersionConstraint,
    ) -> Result<Option<String>> {
        let Some(state) = self.db.query(name).await? else {
            return Ok(None);
        };
        Ok(select_from(&state, constraint))
    }
}

/// Pick the version to install from a snapshot of package state: the first
/// matching available version, or the first available when the constraint
/// accepts anything. `None` when nothing matches.
pub fn select_from(state: &PackageState, constraint: &VersionConstraint) -> Option<String> {
    state
        .available
        .iter()
        .find(|version| constraint.matches(version))
        .cloned()
}
