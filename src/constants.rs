//! Crate-wide constants shared across modules.

use std::time::Duration;

/// Default build configuration file name, looked up in each project directory.
pub const DEFAULT_CONFIG_FILE: &str = ".build.yaml";

/// Default timeout applied to subprocess invocations (queries, installs,
/// remote updates).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for long-running subprocesses: repository clones and
/// `dpkg-buildpackage` runs.
pub const LONG_COMMAND_TIMEOUT: Duration = Duration::from_secs(3600);

/// Number of leading characters of a commit hash embedded into package
/// versions and matched by commit pins.
pub const COMMIT_PIN_LEN: usize = 7;

/// Distribution channel written into generated changelog entries.
pub const CHANGELOG_DISTRIBUTION: &str = "testing";
