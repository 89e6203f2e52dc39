//! Version constraint parsing and matching.
//!
//! A declared dependency carries at most one requirement: a relational
//! constraint written as `<relop><version>` (e.g. `>=6.6.0`), a commit pin
//! referring to a source revision whose short hash is embedded in built
//! package versions, or nothing at all.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use crate::constants::COMMIT_PIN_LEN;
use crate::core::ChainbuildError;
use crate::version;

static CONSTRAINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<relop>>=|<=|=|>|<)\s*(?P<version>[0-9A-Za-z:+~.-]+)$")
        .expect("constraint regex is valid")
});

/// Relational operator of a version requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl RelOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            ">" => Some(Self::Gt),
            _ => None,
        }
    }

    /// The operator accepts an exactly-equal version.
    pub fn includes_equal(self) -> bool {
        matches!(self, Self::Le | Self::Eq | Self::Ge)
    }

    /// The operator accepts a smaller version.
    pub fn includes_less(self) -> bool {
        matches!(self, Self::Lt | Self::Le)
    }

    /// The operator accepts a greater version.
    pub fn includes_greater(self) -> bool {
        matches!(self, Self::Ge | Self::Gt)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requirement a dependency places on the installed package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any installed version is acceptable.
    Any,
    /// The installed version must compare against `version` as `op` allows.
    Relational { op: RelOp, version: String },
    /// The installed version must embed the pin's short commit hash.
    CommitPin(String),
}

impl VersionConstraint {
    /// Parse a `<relop><version>` requirement string.
    ///
    /// Failures are fatal to the whole run: a requirement that cannot be
    /// understood would silently corrupt the dependency graph.
    pub fn parse(name: &str, raw: &str) -> Result<Self, ChainbuildError> {
        let malformed = || ChainbuildError::MalformedConstraint {
            name: name.to_string(),
            raw: raw.to_string(),
        };
        let caps = CONSTRAINT_RE.captures(raw.trim()).ok_or_else(malformed)?;
        let op = RelOp::from_token(&caps["relop"]).ok_or_else(malformed)?;
        Ok(Self::Relational {
            op,
            version: caps["version"].to_string(),
        })
    }

    /// Constraint pinning a source commit.
    pub fn commit_pin(hash: impl Into<String>) -> Self {
        Self::CommitPin(hash.into())
    }

    /// Whether `candidate` satisfies this constraint.
    ///
    /// Relational matching is a dpkg-order three-way comparison followed by
    /// operator containment; a commit pin matches when the candidate version
    /// embeds the pin's first seven characters.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Relational { op, version } => match version::compare(candidate, version) {
                Ordering::Equal => op.includes_equal(),
                Ordering::Less => op.includes_less(),
                Ordering::Greater => op.includes_greater(),
            },
            Self::CommitPin(pin) => {
                let short = pin.get(..COMMIT_PIN_LEN).unwrap_or(pin.as_str());
                !short.is_empty() && candidate.contains(short)
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Relational { op, version } => write!(f, "{op}{version}"),
            Self::CommitPin(pin) => {
                write!(f, "commit {}", pin.get(..COMMIT_PIN_LEN).unwrap_or(pin.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_operator() {
        for (raw, op) in [
            ("<1.0", RelOp::Lt),
            ("<=1.0", RelOp::Le),
            ("=1.0", RelOp::Eq),
            (">=1.0", RelOp::Ge),
            (">1.0", RelOp::Gt),
        ] {
            match VersionConstraint::parse("pkg", raw).unwrap() {
                VersionConstraint::Relational { op: parsed, version } => {
                    assert_eq!(parsed, op);
                    assert_eq!(version, "1.0");
                }
                other => panic!("unexpected parse of {raw}: {other:?}"),
            }
        }
    }

    #[test]
    fn accepts_whitespace_and_rich_version_tokens() {
        let c = VersionConstraint::parse("pkg", ">= 1:6.6.0~rc1+dfsg-1").unwrap();
        assert!(c.matches("1:6.6.0"));
    }

    #[test]
    fn rejects_bad_grammar() {
        for raw in ["1.0", "~1.0", ">=", ">= ", "== 1.0", ">=1.0 extra"] {
            let err = VersionConstraint::parse("pkg", raw).unwrap_err();
            assert!(
                matches!(err, ChainbuildError::MalformedConstraint { .. }),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn parse_then_display_round_trips() {
        let c = VersionConstraint::parse("pkg", ">= 1.2.3").unwrap();
        assert_eq!(c.to_string(), ">=1.2.3");
    }

    #[test]
    fn equality_containing_operators_match_self() {
        for raw in ["<=2.0", "=2.0", ">=2.0"] {
            let c = VersionConstraint::parse("pkg", raw).unwrap();
            assert!(c.matches("2.0"), "{raw} should match 2.0");
        }
    }

    #[test]
    fn strict_operators_reject_self() {
        for raw in ["<2.0", ">2.0"] {
            let c = VersionConstraint::parse("pkg", raw).unwrap();
            assert!(!c.matches("2.0"), "{raw} should not match 2.0");
        }
    }

    #[test]
    fn relational_matching_uses_dpkg_order() {
        let c = VersionConstraint::parse("pkg", ">=1.9").unwrap();
        assert!(c.matches("1.10"));
        let c = VersionConstraint::parse("pkg", "<1.2").unwrap();
        assert!(c.matches("1.2~rc1"));
    }

    #[test]
    fn commit_pin_matches_on_short_hash_substring() {
        let c = VersionConstraint::commit_pin("abcdef1234567890");
        assert!(c.matches("6.6.0~20160101.5.gabcdef1.xenial"));
        assert!(!c.matches("6.6.0~20160101.5.g1111111.xenial"));
    }

    #[test]
    fn any_matches_everything() {
        assert!(VersionConstraint::Any.matches("0"));
        assert!(VersionConstraint::Any.matches("99:99-99"));
    }
}
