//! `debian/changelog` reading and transactional mutation.
//!
//! Packaging needs a changelog entry carrying the computed version, but the
//! entry is synthetic and must not survive the build: the file is restored
//! to its original bytes on every exit path. [`ChangelogTransaction`] scopes
//! the edit with a drop guard so a packaging failure or an early `?` return
//! cannot leave the synthetic entry behind.

use anyhow::Result;
use chrono::Local;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::constants::CHANGELOG_DISTRIBUTION;
use crate::core::ChainbuildError;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?P<package>[0-9a-z][0-9a-z+.-]*) \((?P<version>[^)]+)\) (?P<distributions>[^;]+);\s*urgency=(?P<urgency>\S+)",
    )
    .expect("changelog header regex is valid")
});

static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ -- (?P<author>.+?)  ").expect("author regex is valid"));

/// Metadata of the most recent changelog entry.
#[derive(Debug, Clone)]
pub struct ChangelogEntry {
    pub package: String,
    pub version: String,
    pub distributions: String,
    pub urgency: String,
    pub author: String,
}

/// Parse the newest entry of the changelog at `path`.
pub fn latest_entry(path: &Path) -> Result<ChangelogEntry> {
    let raw = std::fs::read_to_string(path)?;
    parse_latest(&raw)
}

fn parse_latest(raw: &str) -> Result<ChangelogEntry> {
    let header = HEADER_RE.captures(raw).ok_or_else(|| ChainbuildError::ChangelogParse {
        reason: "no entry header found".to_string(),
    })?;
    let author = AUTHOR_RE
        .captures(raw)
        .ok_or_else(|| ChainbuildError::ChangelogParse {
            reason: "no author trailer found".to_string(),
        })?;
    Ok(ChangelogEntry {
        package: header["package"].to_string(),
        version: header["version"].to_string(),
        distributions: header["distributions"].trim().to_string(),
        urgency: header["urgency"].to_string(),
        author: author["author"].trim().to_string(),
    })
}

/// Scoped changelog edit with guaranteed restoration.
///
/// Reads and remembers the original file content at construction; dropping
/// the transaction (on any path) writes those bytes back unless
/// [`restore`](Self::restore) already did.
pub struct ChangelogTransaction {
    path: PathBuf,
    original: String,
    restored: bool,
}

impl ChangelogTransaction {
    /// Begin a transaction over the changelog at `path`.
    pub fn begin(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let original = std::fs::read_to_string(&path)?;
        Ok(Self {
            path,
            original,
            restored: false,
        })
    }

    /// The entry the changelog carried when the transaction began.
    pub fn latest_entry(&self) -> Result<ChangelogEntry> {
        parse_latest(&self.original)
    }

    /// Prepend a generated entry for `version`, reusing the package name,
    /// urgency and author of the previous entry.
    pub fn prepend_entry(&self, version: &str) -> Result<()> {
        let previous = self.latest_entry()?;
        let date = Local::now().format("%a, %d %b %Y %H:%M:%S %z");
        let block = format!(
            "{package} ({version}) {distribution}; urgency={urgency}\n\n  * New package version generated by the build orchestrator.\n\n -- {author}  {date}\n\n",
            package = previous.package,
            distribution = CHANGELOG_DISTRIBUTION,
            urgency = previous.urgency,
            author = previous.author,
        );
        std::fs::write(&self.path, format!("{block}{}", self.original))?;
        Ok(())
    }

    /// Write the original content back and consume the transaction.
    pub fn restore(mut self) -> Result<()> {
        std::fs::write(&self.path, &self.original)?;
        self.restored = true;
        Ok(())
    }
}

impl Drop for ChangelogTransaction {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = std::fs::write(&self.path, &self.original) {
                tracing::error!(
                    "failed to restore {} after build: {e}",
                    self.path.display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGELOG: &str = "\
kms-core (6.6.0-1) testing; urgency=medium

  * Release 6.6.0.

 -- Kurento Maintainers <kurento@example.com>  Mon, 04 Apr 2016 12:00:00 +0200

kms-core (6.5.0-1) testing; urgency=low

  * Release 6.5.0.

 -- Kurento Maintainers <kurento@example.com>  Mon, 01 Feb 2016 09:00:00 +0100
";

    fn write_changelog(dir: &Path) -> PathBuf {
        let path = dir.join("changelog");
        std::fs::write(&path, CHANGELOG).unwrap();
        path
    }

    #[test]
    fn parses_latest_entry() {
        let entry = parse_latest(CHANGELOG).unwrap();
        assert_eq!(entry.package, "kms-core");
        assert_eq!(entry.version, "6.6.0-1");
        assert_eq!(entry.distributions, "testing");
        assert_eq!(entry.urgency, "medium");
        assert_eq!(entry.author, "Kurento Maintainers <kurento@example.com>");
    }

    #[test]
    fn garbage_is_a_changelog_parse_error() {
        let err = parse_latest("not a changelog").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChainbuildError>(),
            Some(ChainbuildError::ChangelogParse { .. })
        ));
    }

    #[test]
    fn prepend_writes_new_entry_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_changelog(dir.path());

        let txn = ChangelogTransaction::begin(&path).unwrap();
        txn.prepend_entry("6.6.0~5.gabcdef1.xenial").unwrap();

        let entry = latest_entry(&path).unwrap();
        assert_eq!(entry.version, "6.6.0~5.gabcdef1.xenial");
        assert_eq!(entry.package, "kms-core");
        assert_eq!(entry.urgency, "medium");

        txn.restore().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CHANGELOG);
    }

    #[test]
    fn drop_restores_original_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_changelog(dir.path());

        {
            let txn = ChangelogTransaction::begin(&path).unwrap();
            txn.prepend_entry("9.9.9").unwrap();
            assert_ne!(std::fs::read_to_string(&path).unwrap(), CHANGELOG);
            // Dropped without restore, as on a failure path.
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CHANGELOG);
    }
}
