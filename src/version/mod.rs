//! Debian version ordering and constraint handling.
//!
//! Implements the dpkg comparison algorithm: an optional numeric epoch
//! before `:`, an upstream part, and a Debian revision after the last `-`.
//! Each part is compared by alternating runs of non-digits and digits;
//! non-digit runs order letters before other characters and `~` before
//! everything, including the end of the string. Digit runs compare
//! numerically, so `1.10` sorts after `1.9` and `1.2~rc1` before `1.2`.

pub mod constraints;

pub use constraints::{RelOp, VersionConstraint};

use std::cmp::Ordering;
use std::fmt;

/// A Debian package version split into its three components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebVersion {
    /// Numeric epoch, `0` when absent.
    pub epoch: u64,
    /// Upstream version part.
    pub upstream: String,
    /// Debian revision after the last `-`, if any.
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse `[epoch:]upstream[-revision]`.
    ///
    /// Lenient on malformed epochs: a non-numeric prefix before `:` is kept
    /// as part of the upstream version rather than rejected, since package
    /// databases occasionally report surprising strings and a query result
    /// must never abort the build.
    pub fn parse(s: &str) -> Self {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) if e.chars().all(|c| c.is_ascii_digit()) && !e.is_empty() => {
                (e.parse::<u64>().unwrap_or(0), r)
            }
            _ => (0, s),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) => (u.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };

        Self {
            epoch,
            upstream,
            revision,
        }
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(ref revision) = self.revision {
            write!(f, "-{revision}")?;
        }
        Ok(())
    }
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match verrevcmp(self.upstream.as_bytes(), other.upstream.as_bytes()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        verrevcmp(
            self.revision.as_deref().unwrap_or("").as_bytes(),
            other.revision.as_deref().unwrap_or("").as_bytes(),
        )
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Three-way comparison of two raw version strings with dpkg semantics.
pub fn compare(a: &str, b: &str) -> Ordering {
    DebVersion::parse(a).cmp(&DebVersion::parse(b))
}

/// Character weight for non-digit runs: `~` before end-of-string, letters
/// before non-letters, otherwise ASCII order.
fn order(c: u8) -> i32 {
    match c {
        b'~' => -1,
        b'0'..=b'9' => 0,
        b'A'..=b'Z' | b'a'..=b'z' => i32::from(c),
        _ => i32::from(c) + 256,
    }
}

/// dpkg's `verrevcmp` over one version part.
fn verrevcmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        // Non-digit run; end-of-string weighs 0, so a trailing `~` loses.
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = if i < a.len() { order(a[i]) } else { 0 };
            let bc = if j < b.len() { order(b[j]) } else { 0 };
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while i < a.len() && a[i] == b'0' {
            i += 1;
        }
        while j < b.len() && b[j] == b'0' {
            j += 1;
        }

        // Digit run: longer run of significant digits wins, otherwise the
        // first differing digit decides.
        let mut first_diff = Ordering::Equal;
        while i < a.len() && a[i].is_ascii_digit() && j < b.len() && b[j].is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if i < a.len() && a[i].is_ascii_digit() {
            return Ordering::Greater;
        }
        if j < b.len() && b[j].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_components() {
        let v = DebVersion::parse("2:1.4.0-0kurento1");
        assert_eq!(v.epoch, 2);
        assert_eq!(v.upstream, "1.4.0");
        assert_eq!(v.revision.as_deref(), Some("0kurento1"));
    }

    #[test]
    fn parse_without_epoch_or_revision() {
        let v = DebVersion::parse("6.6.0");
        assert_eq!(v.epoch, 0);
        assert_eq!(v.upstream, "6.6.0");
        assert_eq!(v.revision, None);
    }

    #[test]
    fn revision_splits_at_last_hyphen() {
        let v = DebVersion::parse("1.0-rc1-2");
        assert_eq!(v.upstream, "1.0-rc1");
        assert_eq!(v.revision.as_deref(), Some("2"));
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.2", "1.2"), Ordering::Equal);
        assert_eq!(compare("1.2.3", "1.2.10"), Ordering::Less);
    }

    #[test]
    fn tilde_sorts_before_release() {
        assert_eq!(compare("1.2~rc1", "1.2"), Ordering::Less);
        assert_eq!(compare("1.2~rc1", "1.2~rc2"), Ordering::Less);
        assert_eq!(compare("6.6.0~20160415.1.g1234567.xenial", "6.6.0"), Ordering::Less);
    }

    #[test]
    fn epoch_dominates() {
        assert_eq!(compare("1:0.1", "2.0"), Ordering::Greater);
    }

    #[test]
    fn revisions_break_ties() {
        assert_eq!(compare("1.2.3-1", "1.2.3-2"), Ordering::Less);
        assert_eq!(compare("1.2.3-1", "1.2.3"), Ordering::Greater);
        assert_eq!(compare("1.2.3-0", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn letters_order_before_other_characters() {
        assert_eq!(compare("1.0a", "1.0+"), Ordering::Less);
        assert_eq!(compare("1.0~", "1.0"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_are_insignificant() {
        assert_eq!(compare("1.02", "1.2"), Ordering::Equal);
    }

    #[test]
    fn ordering_is_total_on_a_sorted_chain() {
        let chain = ["1.0~alpha", "1.0~beta", "1.0", "1.0-1", "1.0.1", "1.1", "1.10", "2.0"];
        for w in chain.windows(2) {
            assert_eq!(compare(w[0], w[1]), Ordering::Less, "{} < {}", w[0], w[1]);
        }
    }
}
