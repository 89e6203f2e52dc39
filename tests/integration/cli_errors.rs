//! Fatal configuration errors and their exit codes.

use predicates::prelude::*;

use super::common::ProjectFixture;

#[test]
fn missing_config_is_not_an_error() {
    let fixture = ProjectFixture::empty();
    fixture
        .command()
        .assert()
        .success()
        .stderr(predicate::str::contains("no build configuration"));
}

#[test]
fn dependency_without_name_exits_one() {
    let fixture = ProjectFixture::with_config("dependencies:\n  - version: \">=1.0\"\n");
    fixture
        .command()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("needs a name"));
}

#[test]
fn malformed_version_requirement_exits_one() {
    let fixture = ProjectFixture::with_config(
        "dependencies:\n  - name: kms-core\n    version: \"approximately-six\"\n",
    );
    fixture
        .command()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid version requirement"));
}

#[test]
fn malformed_version_suggests_the_grammar() {
    let fixture =
        ProjectFixture::with_config("dependencies:\n  - name: kms-core\n    version: \"6.6.0\"\n");
    fixture
        .command()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn invalid_yaml_exits_one() {
    let fixture = ProjectFixture::with_config("dependencies: [\n");
    fixture
        .command()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid build configuration"));
}
