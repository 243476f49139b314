use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn gulp_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gulp"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("GULP_INSTANCE_URL")
        .env_remove("GULP_ACCESS_TOKEN")
        .env_remove("GULP_API_VERSION")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(workspace: &Path, yaml: &str) {
    let dir = workspace.join(".apexlink");
    fs::create_dir_all(&dir).expect("config dir");
    fs::write(dir.join("gulp.yaml"), yaml).expect("config file");
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().expect("home");
    gulp_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("sync"))
        .stdout(contains("diff"))
        .stdout(contains("packages"));
}

#[test]
fn sync_help_documents_flags() {
    let home = TempDir::new().expect("home");
    gulp_cmd(home.path())
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(contains("--namespaces"))
        .stdout(contains("--dry-run"))
        .stdout(contains("--workspace"));
}

#[test]
fn sync_without_instance_url_fails_cleanly() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");

    gulp_cmd(home.path())
        .args(["sync", "--workspace"])
        .arg(workspace.path())
        .assert()
        .failure()
        .stderr(contains("instance_url"));

    assert!(!workspace.path().join(".apexlink/gulp").exists());
}

#[test]
fn missing_token_is_reported() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    write_config(
        workspace.path(),
        "instance_url: https://example.my.salesforce.com\n",
    );

    gulp_cmd(home.path())
        .args(["packages", "--workspace"])
        .arg(workspace.path())
        .assert()
        .failure()
        .stderr(contains("access_token"));
}

#[test]
fn malformed_config_names_the_file() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    write_config(workspace.path(), "namespaces: [unterminated\n");

    gulp_cmd(home.path())
        .args(["diff", "--workspace"])
        .arg(workspace.path())
        .assert()
        .failure()
        .stderr(contains("gulp.yaml"));
}
