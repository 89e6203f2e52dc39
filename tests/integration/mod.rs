//! Integration test suite for chainbuild.
//!
//! Drives the compiled binary end-to-end for the CLI surface and the fatal
//! configuration paths. Tests stay hermetic: fixtures are designed so the
//! run terminates before any git, apt or dpkg subprocess is reached.

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli_errors;
mod cli_surface;
