// ABOUTME: Integration tests for the launchpad CLI commands.
// ABOUTME: Validates --help output, config discovery errors, package and validate.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn launchpad_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("launchpad"));
    cmd.env_remove("LAUNCHPAD_REGION");
    cmd
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "launchpad.yml",
        "app: demo\naccount_id: \"123456789012\"\nregion: us-west-2\nresources:\n  artifact_bucket: demo-artifacts\n",
    );
    write(dir.path(), "environments/test.yml", "name: test\n");
    write(
        dir.path(),
        "workloads/api/manifest.yml",
        "type: Backend Service\nname: api\nimage:\n  location: nginx:1.25\n  port: 8080\n",
    );
    write(
        dir.path(),
        "workloads/report/manifest.yml",
        "type: Scheduled Job\nname: report\nimage:\n  location: busybox\non:\n  schedule: \"@hourly\"\n",
    );
    dir
}

#[test]
fn help_shows_commands() {
    launchpad_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    launchpad_cmd()
        .current_dir(dir.path())
        .args(["validate", "-e", "test"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn unknown_environment_fails() {
    let dir = workspace();
    launchpad_cmd()
        .current_dir(dir.path())
        .args(["validate", "-n", "api", "-e", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown environment: prod"));
}

#[test]
fn package_prints_template() {
    let dir = workspace();
    launchpad_cmd()
        .current_dir(dir.path())
        .args(["--quiet", "package", "-n", "api", "-e", "test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TaskDefinition"))
        .stdout(predicate::str::contains("Rendered demo-test-api"));
}

#[test]
fn package_writes_output_dir() {
    let dir = workspace();
    launchpad_cmd()
        .current_dir(dir.path())
        .args(["package", "-n", "report", "-e", "test", "--output-dir", "out"])
        .assert()
        .success();

    let template = fs::read_to_string(dir.path().join("out/demo-test-report.yml")).unwrap();
    assert!(template.contains("rate(1 hour)"));
    assert!(dir.path().join("out/demo-test-report.params.json").exists());
}

#[test]
fn validate_checks_every_workload_with_json_output() {
    let dir = workspace();
    launchpad_cmd()
        .current_dir(dir.path())
        .args(["--json", "validate", "-e", "test"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"success""#))
        .stdout(predicate::str::contains("Validating 2 workload(s)"));
}

#[test]
fn validation_failure_has_its_own_exit_code() {
    let dir = workspace();
    write(
        dir.path(),
        "environments/test.yml",
        "name: test\nhttp:\n  private:\n    certificates:\n      - arn:aws:acm:us-west-2:123456789012:certificate/internal\n",
    );
    write(
        dir.path(),
        "workloads/api/manifest.yml",
        "type: Backend Service\nname: api\nimage:\n  location: nginx:1.25\n  port: 8080\nhttp:\n  path: /api\n",
    );
    launchpad_cmd()
        .current_dir(dir.path())
        .args(["validate", "-n", "api", "-e", "test"])
        .assert()
        .failure()
        .code(2);
}
