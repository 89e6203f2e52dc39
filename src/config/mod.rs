//! Build configuration (`.build.yaml`) loading and validation.
//!
//! Each project carries a YAML file naming its sibling-project dependencies
//! and optional build hooks:
//!
//! ```yaml
//! dependencies:
//!   - name: kms-core
//!     version: ">=6.6.0"
//!   - name: kms-elements
//! prebuild-command: ./autogen.sh
//! version-command: ./describe-version.sh
//! ```
//!
//! A missing file is non-fatal to a parent build (the dependency just cannot
//! be built by us); a present-but-invalid file, an entry without a name, or
//! a malformed version requirement is fatal to the whole run.

use serde::Deserialize;
use std::path::Path;

use crate::core::ChainbuildError;
use crate::deps::DependencySpec;
use crate::version::VersionConstraint;

/// Raw dependency entry exactly as written in the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyEntry {
    /// Sibling project / package name. Required, validated at spec build.
    pub name: Option<String>,
    /// Version requirement `<relop><version>`.
    pub version: Option<String>,
    /// Source commit pin; satisfied by versions embedding its short hash.
    pub commit: Option<String>,
    /// Review reference, accepted and carried through unused.
    pub review: Option<String>,
}

/// Parsed `.build.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// Declared inter-project dependencies, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    /// Shell command run in the project directory before packaging.
    #[serde(rename = "prebuild-command")]
    pub prebuild_command: Option<String>,
    /// Command printing the project's upstream base version to stdout.
    #[serde(rename = "version-command")]
    pub version_command: Option<String>,
}

impl BuildConfig {
    /// Load and parse the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ChainbuildError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChainbuildError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        serde_yaml::from_str(&raw).map_err(|source| ChainbuildError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Validate the raw dependency entries into [`DependencySpec`]s.
    ///
    /// `path` is only used for diagnostics.
    pub fn dependency_specs(&self, path: &Path) -> Result<Vec<DependencySpec>, ChainbuildError> {
        self.dependencies
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let name = entry
                    .name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| ChainbuildError::MissingDependencyName {
                        index,
                        path: path.display().to_string(),
                    })?;

                let constraint = match (&entry.commit, &entry.version) {
                    (Some(commit), _) => VersionConstraint::commit_pin(commit.clone()),
                    (None, Some(raw)) => VersionConstraint::parse(name, raw)?,
                    (None, None) => VersionConstraint::Any,
                };

                let mut spec = DependencySpec::new(name, constraint);
                spec.review = entry.review.clone();
                Ok(spec)
            })
            .collect()
    }
}
