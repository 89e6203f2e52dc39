//! Error handling for chainbuild.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`ChainbuildError`]) so callers can decide
//!    what is fatal and what is a per-dependency setback.
//! 2. **User-friendly reporting** ([`ErrorContext`]) so the CLI can print a
//!    diagnostic with an actionable suggestion before exiting.
//!
//! Fatality is decided by the orchestrator, not here: a failed installer run
//! surfaces as a `false` return value, while configuration problems, cycles
//! and packaging failures surface as errors that terminate the build with
//! exit code 1.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// All failure modes of a chainbuild run.
#[derive(Error, Debug)]
pub enum ChainbuildError {
    /// The build configuration file does not exist in the project directory.
    ///
    /// Non-fatal to a parent invocation: a dependency without a build
    /// configuration simply cannot be built by us.
    #[error("build configuration not found: {path}")]
    ConfigNotFound {
        /// Path that was probed.
        path: String,
    },

    /// The build configuration exists but is not valid YAML.
    #[error("invalid build configuration in {path}")]
    ConfigParse {
        /// Path of the offending file.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A dependency entry in the configuration has no `name` key.
    ///
    /// Fatal to the whole process: without a name there is no coherent
    /// dependency graph to resolve.
    #[error("dependency entry #{index} in {path} needs a name")]
    MissingDependencyName {
        /// Zero-based position of the entry in the `dependencies` list.
        index: usize,
        /// Configuration file the entry came from.
        path: String,
    },

    /// A `version` requirement did not match the `<relop><version>` grammar.
    #[error("invalid version requirement '{raw}' for dependency '{name}'")]
    MalformedConstraint {
        /// Dependency the requirement was declared for.
        name: String,
        /// The raw requirement string as written.
        raw: String,
    },

    /// The recursive dependency walk re-entered a project already being
    /// resolved on the active call stack.
    #[error("cyclic dependency detected: {chain}")]
    CyclicDependency {
        /// Human-readable chain, e.g. `a -> b -> a`.
        chain: String,
    },

    /// No alternative of a dependency could be satisfied, even after
    /// installation attempts.
    #[error("dependency '{name}' could not be satisfied after installation attempts")]
    ResolutionFailed {
        /// Primary name of the unsatisfiable dependency.
        name: String,
    },

    /// A subprocess exited with a non-zero status.
    #[error("command '{program}' failed: {stderr}")]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Captured stderr (or stdout when stderr was empty).
        stderr: String,
    },

    /// A subprocess exceeded its allotted wall-clock time.
    ///
    /// Kept distinct from [`CommandFailed`](Self::CommandFailed) so callers
    /// can tell a hung clone apart from a failing build.
    #[error("command '{program}' timed out after {seconds} seconds")]
    CommandTimeout {
        /// Program that was invoked.
        program: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// Cloning a dependency repository failed.
    #[error("failed to clone repository {url}")]
    GitCloneFailed {
        /// URL passed to `git clone`.
        url: String,
        /// stderr from git.
        reason: String,
    },

    /// `dpkg-buildpackage` failed, including the automatic clean-build retry.
    #[error("packaging failed for version {version}")]
    PackagingFailed {
        /// Package version that was being built.
        version: String,
    },

    /// `debian/changelog` could not be parsed.
    #[error("malformed debian/changelog: {reason}")]
    ChangelogParse {
        /// What went wrong.
        reason: String,
    },

    /// `debian/control` could not be parsed.
    #[error("malformed debian/control: {reason}")]
    ControlParse {
        /// What went wrong.
        reason: String,
    },

    /// The run was cancelled (Ctrl-C) between dependency steps.
    #[error("build interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An error paired with presentation hints for the CLI.
///
/// Wraps any [`anyhow::Error`] and optionally carries a suggestion and
/// extra details. [`display`](Self::display) renders the three parts with
/// colors to stderr.
pub struct ErrorContext {
    /// The underlying error.
    pub error: anyhow::Error,
    /// Actionable advice shown after the error message.
    pub suggestion: Option<String>,
    /// Additional free-form details.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no presentation hints.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attach an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach extra details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("  {details}");
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("{} {}", "hint:".yellow().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\n  {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nhint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion appropriate
/// for the failure, for display at the top of the CLI.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<ChainbuildError>() {
        Some(ChainbuildError::ConfigNotFound { .. }) => {
            Some("create a .build.yaml in the project root, or pass --file".to_string())
        }
        Some(ChainbuildError::MalformedConstraint { .. }) => Some(
            "version requirements look like '>=1.2.3' with one of <, <=, =, >=, >".to_string(),
        ),
        Some(ChainbuildError::MissingDependencyName { .. }) => {
            Some("every entry under 'dependencies' needs a 'name' key".to_string())
        }
        Some(ChainbuildError::CyclicDependency { .. }) => {
            Some("break the cycle by removing one of the dependency declarations".to_string())
        }
        Some(ChainbuildError::ResolutionFailed { .. }) => Some(
            "check that the package is published for this distribution, or pass --best-effort to continue anyway"
                .to_string(),
        ),
        Some(ChainbuildError::CommandTimeout { .. }) => {
            Some("re-run with --verbose to see which command hung".to_string())
        }
        Some(ChainbuildError::PackagingFailed { .. }) => {
            Some("inspect the dpkg-buildpackage output above for the underlying build error".to_string())
        }
        _ => None,
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    ctx
}
