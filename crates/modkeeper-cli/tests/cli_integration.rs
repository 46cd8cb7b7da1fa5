//! End-to-end tests for the `modkeeper` binary.
//!
//! ```bash
//! cargo test -p modkeeper-cli --test cli_integration
//! ```

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn modkeeper(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("modkeeper").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn write_module(path: &Path, name: &str, version: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("module.toml", SimpleFileOptions::default())
        .unwrap();
    write!(zip, "name = \"{}\"\nversion = \"{}\"\n", name, version).unwrap();
    zip.finish().unwrap();
}

// ─── § 1  init ───────────────────────────────────────────────────────────────

#[test]
fn help_lists_commands() {
    Command::cargo_bin("modkeeper")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_writes_default_config_once() {
    let dir = TempDir::new().unwrap();

    modkeeper(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let config = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(config.contains("[database]"));
    assert!(config.contains("auto_reload = true"));
    assert!(dir.path().join("modules").is_dir());
    assert!(dir.path().join("plugins").is_dir());

    modkeeper(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// ─── § 2  status ─────────────────────────────────────────────────────────────

#[test]
fn status_json_lists_staged_and_pending_packages() {
    let dir = TempDir::new().unwrap();
    write_module(&dir.path().join("modules/Economy-1.0.jar"), "Economy", "1.0");
    write_module(&dir.path().join("plugins/Chat-2.3.jar"), "Chat", "2.3");

    let output = modkeeper(dir.path())
        .args(["status", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["config_error"].is_null());
    assert!(report["database"].is_null());
    assert_eq!(report["managed"][0]["identity"], "Economy-1.0.jar");
    assert_eq!(report["managed"][0]["display_name"], "Economy");
    assert_eq!(report["pending"][0], "Chat-2.3.jar");

    assert!(!dir.path().join("modules/Chat-2.3.jar").exists());
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn status_leaves_managed_directory_unchanged() {
    let dir = TempDir::new().unwrap();
    write_module(&dir.path().join("modules/Foo-1.0.jar"), "Foo", "1.0");
    write_module(&dir.path().join("plugins/Foo-1.1.jar"), "Foo", "1.1");

    modkeeper(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Foo-1.1.jar"))
        .stdout(predicate::str::contains("pending"));

    let mut managed: Vec<String> = std::fs::read_dir(dir.path().join("modules"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    managed.sort();
    assert_eq!(managed, vec!["Foo-1.0.jar"]);
}

#[test]
fn status_table_shows_versions() {
    let dir = TempDir::new().unwrap();
    write_module(&dir.path().join("modules/Chat-2.3.jar"), "Chat", "2.3");

    modkeeper(dir.path())
        .args(["status", "--output", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chat-2.3.jar"))
        .stdout(predicate::str::contains("2.3"))
        .stdout(predicate::str::contains("staged"));
}

#[test]
fn status_reports_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[database]\npool_min_size = 20\npool_max_size = 2\n",
    )
    .unwrap();

    modkeeper(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config:"))
        .stdout(predicate::str::contains("pool_min_size"));
}

// ─── § 3  run console ────────────────────────────────────────────────────────

#[test]
fn run_console_reloads_and_stops() {
    let dir = TempDir::new().unwrap();
    write_module(&dir.path().join("plugins/Economy-1.0.jar"), "Economy", "1.0");

    modkeeper(dir.path())
        .arg("run")
        .write_stdin("status\nreload\nfrobnicate\nstop\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("startup finished"))
        .stdout(predicate::str::contains("reload finished"))
        .stdout(predicate::str::contains("1 loaded, 0 failed"))
        .stdout(predicate::str::contains("unknown command 'frobnicate'"))
        .stdout(predicate::str::contains("stopped"));
}

#[test]
fn run_stops_at_end_of_input() {
    let dir = TempDir::new().unwrap();

    modkeeper(dir.path())
        .arg("run")
        .write_stdin("")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"));
}
