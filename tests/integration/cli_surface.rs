//! CLI argument surface.

use assert_cmd::Command;
use predicates::prelude::*;

use super::common::ProjectFixture;

fn chainbuild() -> Command {
    Command::cargo_bin("chainbuild").expect("binary built")
}

#[test]
fn base_url_is_required() {
    chainbuild()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--base-url"));
}

#[test]
fn help_documents_the_flags() {
    chainbuild()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--file")
                .and(predicate::str::contains("--base-url"))
                .and(predicate::str::contains("--simplify-dev-version"))
                .and(predicate::str::contains("--clean"))
                .and(predicate::str::contains("--no-update-git"))
                .and(predicate::str::contains("--best-effort")),
        );
}

#[test]
fn version_flag_works() {
    chainbuild()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chainbuild"));
}

#[test]
fn custom_config_file_is_honored() {
    let fixture = ProjectFixture::empty();
    std::fs::write(
        fixture.path().join("pipeline.yaml"),
        "dependencies:\n  - version: \">=1.0\"\n",
    )
    .unwrap();

    // The named file is read (and its broken entry rejected) instead of the
    // absent default.
    fixture
        .command()
        .args(["--file", "pipeline.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("needs a name"));
}

#[test]
fn absolute_config_file_outside_the_project_is_read() {
    let fixture = ProjectFixture::empty();
    let external = tempfile::tempdir().unwrap();
    let config = external.path().join("pipeline.yaml");
    std::fs::write(&config, "dependencies:\n  - version: \">=1.0\"\n").unwrap();

    // The file the user named is honored verbatim at the top level; its
    // broken entry is rejected instead of the run skipping as unconfigured.
    fixture
        .command()
        .args(["--file", config.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("needs a name"));
}

#[test]
fn underscore_flag_spellings_are_accepted() {
    let fixture = ProjectFixture::empty();
    let mut cmd = Command::cargo_bin("chainbuild").expect("binary built");
    cmd.current_dir(fixture.path())
        .args(["--base_url", "https://git.example.com", "--no_update_git"])
        .assert()
        .success();
}
