// CLI surface tests. These only exercise argument parsing and help
// output; nothing here talks to a backend.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_every_workflow_command() {
    let mut cmd = Command::cargo_bin("rackflow").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("diagnose"))
        .stdout(predicate::str::contains("rma"))
        .stdout(predicate::str::contains("cancel-rma"))
        .stdout(predicate::str::contains("transfer"))
        .stdout(predicate::str::contains("conciliate"))
        .stdout(predicate::str::contains("lab"));
}

#[test]
fn help_output_carries_no_log_lines() {
    let mut cmd = Command::cargo_bin("rackflow").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("telemetry").not())
        .stderr(predicate::str::is_empty());
}

#[test]
fn lab_help_lists_workbench_commands() {
    let mut cmd = Command::cargo_bin("rackflow").unwrap();

    cmd.args(["lab", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("intake"))
        .stdout(predicate::str::contains("complete"))
        .stdout(predicate::str::contains("scrap"));
}

#[test]
fn unknown_fault_category_is_rejected_at_parse_time() {
    let mut cmd = Command::cargo_bin("rackflow").unwrap();

    cmd.args([
        "diagnose", "2", "7", "1", "4", "--fault", "MOTOR", "--resolution", "rma", "--ip",
        "10.0.0.4",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown fault category"));
}

#[test]
fn lookup_requires_a_full_coordinate() {
    let mut cmd = Command::cargo_bin("rackflow").unwrap();

    cmd.args(["lookup", "2", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}
