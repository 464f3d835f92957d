//! CLI integration tests for the `orryc` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn orryc_bin() -> Command {
    Command::cargo_bin("orryc").expect("binary built")
}

fn source_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn help_lists_the_check_subcommand() {
    orryc_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"));
}

#[test]
fn check_exits_zero_on_a_well_formed_file() {
    let file = source_file("fn main() -> int { 0 }");
    orryc_bin().arg("check").arg(file.path()).assert().success();
}

#[test]
fn check_requires_at_least_one_file() {
    orryc_bin().arg("check").assert().failure();
}

#[test]
fn check_fails_on_a_nonexistent_file() {
    orryc_bin()
        .arg("check")
        .arg("/nonexistent/path/main.orr")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read"));
}

#[test]
fn verbose_flag_is_accepted_globally() {
    let file = source_file("fn main() -> int { 0 }");
    orryc_bin()
        .arg("--verbose")
        .arg("check")
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn checking_multiple_files_checks_all_of_them() {
    let a = source_file("fn a() -> int { 1 }");
    let b = source_file("fn b() -> int { 2 }");
    orryc_bin()
        .arg("check")
        .arg(a.path())
        .arg(b.path())
        .assert()
        .success();
}
