//! Dependency specifications.
//!
//! A [`DependencySpec`] is one declared inter-project dependency: the primary
//! package name with its constraint, plus an ordered list of alternatives
//! tried after the primary. Specs are built from `.build.yaml` entries or
//! from `debian/control` relations and are immutable afterwards; they live
//! only for the duration of a single resolution pass.

use std::fmt;

use crate::version::VersionConstraint;

/// A fallback package tried when the primary cannot be satisfied.
#[derive(Debug, Clone)]
pub struct DependencyAlternative {
    pub name: String,
    pub constraint: VersionConstraint,
}

/// One declared dependency of a project.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    /// Primary package / sibling project name. Never empty.
    pub name: String,
    /// Requirement on the installed version of the primary.
    pub constraint: VersionConstraint,
    /// Review reference from the configuration, carried through unused.
    pub review: Option<String>,
    /// Alternatives tried after the primary, in declaration order.
    pub alternatives: Vec<DependencyAlternative>,
}

impl DependencySpec {
    /// A spec with no alternatives.
    pub fn new(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            review: None,
            alternatives: Vec::new(),
        }
    }

    /// The primary and each alternative, in evaluation order.
    pub fn candidates(&self) -> impl Iterator<Item = (&str, &VersionConstraint)> {
        std::iter::once((self.name.as_str(), &self.constraint)).chain(
            self.alternatives
                .iter()
                .map(|alt| (alt.name.as_str(), &alt.constraint)),
        )
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.constraint != VersionConstraint::Any {
            write!(f, " ({})", self.constraint)?;
        }
        for alt in &self.alternatives {
            write!(f, " | {}", alt.name)?;
            if alt.constraint != VersionConstraint::Any {
                write!(f, " ({})", alt.constraint)?;
            }
        }
        Ok(())
    }
}
