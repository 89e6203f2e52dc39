//! Debian package metadata (`debian/control`).
//!
//! Two reads are needed: the source stanza's build-dependency relations
//! (checked and installed before packaging) and the binary `Package` names
//! (re-checked per dependency after its recursive build). The parser
//! understands the stanza format with continuation lines and the relation
//! grammar `pkg (op version)` with `|` alternatives; architecture
//! qualifiers and build profiles are ignored.

pub mod changelog;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

use crate::core::ChainbuildError;
use crate::deps::{DependencyAlternative, DependencySpec};
use crate::version::VersionConstraint;

/// Parse `debian/control` under `project_dir` into its stanzas, each a
/// field-name (lowercased) to value map.
fn parse_control(project_dir: &Path) -> Result<Vec<HashMap<String, String>>> {
    let path = project_dir.join("debian/control");
    let raw = std::fs::read_to_string(&path)?;

    let mut stanzas = Vec::new();
    let mut current: HashMap<String, String> = HashMap::new();
    let mut last_field: Option<String> = None;

    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
            last_field = None;
        } else if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation of the previous field.
            let Some(field) = &last_field else {
                return Err(ChainbuildError::ControlParse {
                    reason: format!("continuation line without a field: '{line}'"),
                }
                .into());
            };
            if let Some(value) = current.get_mut(field) {
                value.push(' ');
                value.push_str(line.trim());
            }
        } else if let Some((field, value)) = line.split_once(':') {
            let field = field.trim().to_ascii_lowercase();
            current.insert(field.clone(), value.trim().to_string());
            last_field = Some(field);
        } else {
            return Err(ChainbuildError::ControlParse {
                reason: format!("unparsable line: '{line}'"),
            }
            .into());
        }
    }
    if !current.is_empty() {
        stanzas.push(current);
    }
    Ok(stanzas)
}

/// The build-dependency relations of the project: `Build-Depends` plus
/// `Build-Depends-Indep`, in declaration order.
pub fn build_dependencies(project_dir: &Path) -> Result<Vec<DependencySpec>> {
    let stanzas = parse_control(project_dir)?;
    let source = stanzas.first().ok_or_else(|| ChainbuildError::ControlParse {
        reason: "control file has no stanzas".to_string(),
    })?;

    let mut raw = source.get("build-depends").cloned().unwrap_or_default();
    if let Some(indep) = source.get("build-depends-indep") {
        if !raw.is_empty() {
            raw.push(',');
        }
        raw.push_str(indep);
    }
    parse_relations(&raw)
}

/// Names of the binary packages this source tree produces.
pub fn binary_packages(project_dir: &Path) -> Result<Vec<String>> {
    let stanzas = parse_control(project_dir)?;
    Ok(stanzas
        .iter()
        .skip(1)
        .filter_map(|stanza| stanza.get("package").cloned())
        .collect())
}

/// Parse a comma-separated relation list with `|` alternatives.
pub fn parse_relations(raw: &str) -> Result<Vec<DependencySpec>> {
    raw.split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(parse_relation_group)
        .collect()
}

fn parse_relation_group(group: &str) -> Result<DependencySpec> {
    let mut candidates = group
        .split('|')
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(parse_relation);

    let (name, constraint) = candidates.next().ok_or_else(|| ChainbuildError::ControlParse {
        reason: format!("empty relation group: '{group}'"),
    })??;

    let mut spec = DependencySpec::new(name, constraint);
    for candidate in candidates {
        let (name, constraint) = candidate?;
        spec.alternatives.push(DependencyAlternative { name, constraint });
    }
    Ok(spec)
}

/// Parse one relation: `name[:arch] [(op version)] [[arches]] [<profiles>]`.
fn parse_relation(raw: &str) -> Result<(String, VersionConstraint)> {
    let raw = raw.trim();

    let (name_part, constraint) = match raw.split_once('(') {
        Some((name, rest)) => {
            let inner = rest
                .split_once(')')
                .ok_or_else(|| ChainbuildError::ControlParse {
                    reason: format!("unterminated version restriction in '{raw}'"),
                })?
                .0
                .trim();
            // Relations use dpkg's strict operators; fold them onto ours.
            let normalized = match inner {
                s if s.starts_with("<<") => s.replacen("<<", "<", 1),
                s if s.starts_with(">>") => s.replacen(">>", ">", 1),
                s => s.to_string(),
            };
            let name = name.trim();
            (
                name,
                VersionConstraint::parse(name, &normalized).map_err(|_| {
                    ChainbuildError::ControlParse {
                        reason: format!("invalid version restriction in '{raw}'"),
                    }
                })?,
            )
        }
        None => (raw, VersionConstraint::Any),
    };

    // Drop architecture restriction lists, build profiles, and a multiarch
    // qualifier like `libfoo:any`.
    let name_part = name_part.split(['[', '<']).next().unwrap_or(name_part);
    let name = name_part.split(':').next().unwrap_or(name_part).trim();
    if name.is_empty() {
        return Err(ChainbuildError::ControlParse {
            reason: format!("relation without a package name: '{raw}'"),
        }
        .into());
    }
    Ok((name.to_string(), constraint))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL: &str = "\
Source: kms-core
Priority: optional
Maintainer: Kurento <kurento@example.com>
Build-Depends: debhelper (>= 9),
 cmake,
 libglib2.0-dev (>= 2.46) | libglib-fallback-dev,
 libboost-dev [amd64] <!nocheck>
Build-Depends-Indep: doxygen
Standards-Version: 3.9.4

Package: kms-core
Architecture: any
Depends: ${shlibs:Depends}

Package: kms-core-dev
Architecture: any
Depends: kms-core
";

    fn write_control(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("debian")).unwrap();
        std::fs::write(dir.path().join("debian/control"), content).unwrap();
        dir
    }

    #[test]
    fn parses_build_depends_with_continuations() {
        let dir = write_control(CONTROL);
        let specs = build_dependencies(dir.path()).unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["debhelper", "cmake", "libglib2.0-dev", "libboost-dev", "doxygen"]
        );
        assert!(specs[0].constraint.matches("9.1"));
        assert!(!specs[0].constraint.matches("8.0"));
    }

    #[test]
    fn alternatives_are_kept_in_order() {
        let dir = write_control(CONTROL);
        let specs = build_dependencies(dir.path()).unwrap();
        let glib = &specs[2];
        assert_eq!(glib.alternatives.len(), 1);
        assert_eq!(glib.alternatives[0].name, "libglib-fallback-dev");
    }

    #[test]
    fn arch_and_profile_qualifiers_are_ignored() {
        let specs = parse_relations("libfoo:any (>= 1.0) [linux-any] <!cross>").unwrap();
        assert_eq!(specs[0].name, "libfoo");
        assert!(specs[0].constraint.matches("1.0"));
    }

    #[test]
    fn strict_dpkg_operators_are_folded() {
        let specs = parse_relations("libfoo (<< 2.0), libbar (>> 1.0)").unwrap();
        assert!(specs[0].constraint.matches("1.9"));
        assert!(!specs[0].constraint.matches("2.0"));
        assert!(specs[1].constraint.matches("1.1"));
        assert!(!specs[1].constraint.matches("1.0"));
    }

    #[test]
    fn binary_packages_lists_package_stanzas() {
        let dir = write_control(CONTROL);
        assert_eq!(
            binary_packages(dir.path()).unwrap(),
            ["kms-core", "kms-core-dev"]
        );
    }

    #[test]
    fn unterminated_restriction_is_an_error() {
        let err = parse_relations("libfoo (>= 1.0").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChainbuildError>(),
            Some(ChainbuildError::ControlParse { .. })
        ));
    }
}
