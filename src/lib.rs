//! chainbuild - recursive dependency-aware build orchestrator for Debian
//! packages.
//!
//! Projects in a multi-repository product declare their sibling-project
//! dependencies in a `.build.yaml`. chainbuild checks each declared
//! dependency against the system package database; anything unsatisfied is
//! cloned (or updated) from a shared base URL, built recursively the same
//! way, and installed, before the current project itself is versioned and
//! packaged with `dpkg-buildpackage`.
//!
//! # Architecture
//!
//! The decision logic lives in four small modules; everything else wraps an
//! external collaborator behind a narrow interface:
//!
//! - [`version`] - Debian version ordering, constraint parsing and matching
//! - [`resolver`] - "is this dependency satisfied, and by which version?"
//! - [`installer`] - alternative-by-alternative installation walk
//! - [`build`] - the recursive orchestrator and package-version computation
//!
//! Collaborators:
//!
//! - [`apt`] - system package database (query/install), behind the
//!   [`apt::PackageDatabase`] capability so tests can substitute an
//!   in-memory fake
//! - [`git`] - source checkouts, history queries for versioning
//! - [`debian`] - `debian/control` relations and transactional
//!   `debian/changelog` edits
//! - [`packaging`] - `dpkg-buildpackage` invocation and artifact handling
//!
//! Execution is sequential and subprocess-bound; every call site passes the
//! working directory explicitly, carries a timeout, and checks a shared
//! cancellation flag between dependency steps.

pub mod apt;
pub mod build;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod debian;
pub mod deps;
pub mod git;
pub mod installer;
pub mod packaging;
pub mod resolver;
pub mod utils;
pub mod version;
