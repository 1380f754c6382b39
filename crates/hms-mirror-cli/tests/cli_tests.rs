//! CLI integration tests for hms-mirror.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes and the files written by a planning run.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

/// Get a command for the hms-mirror binary.
fn cmd() -> Command {
    Command::cargo_bin("hms-mirror").unwrap()
}

const CONFIG: &str = r#"
data_strategy: SCHEMA_ONLY
clusters:
  left:
    hcfs_namespace: hdfs://HDP50
  right:
    hcfs_namespace: hdfs://HOME90
"#;

const INVENTORY: &str = r#"
databases:
  - name: assorted_test_db
    left:
      exists: true
      location: hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db
    tables:
      - name: ext_part_01
        left:
          definition:
            - "CREATE EXTERNAL TABLE `ext_part_01`("
            - "  `id` string)"
            - "PARTITIONED BY ("
            - "  `num` string)"
            - "LOCATION"
            - "  'hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db/ext_part_01'"
          partitions:
            num=1: hdfs://HDP50/apps/hive/warehouse/assorted_test_db.db/ext_part_01/num=1
"#;

fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--inventory"))
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--strategy"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hms-mirror"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--progress"))
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    cmd()
        .args(["validate", "--strategy", "TELEPORT"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown data strategy"));
}

// =============================================================================
// Exit Code Tests - Config Errors
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_inventory_exits_with_code_1() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.yaml", CONFIG);

    cmd()
        .args(["--config", &config, "run", "--inventory", "missing.yaml"])
        .assert()
        .code(1);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_accepts_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.yaml", CONFIG);

    cmd()
        .args(["--config", &config, "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid for SCHEMA_ONLY"));
}

#[test]
fn test_validate_reports_bad_combination() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "config.yaml",
        &format!("{}in_place: true\n", CONFIG),
    );

    cmd()
        .args(["--config", &config, "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("InPlaceRequiresStorageMigration"));
}

#[test]
fn test_validate_align_without_warehouse_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "config.yaml",
        &format!("{}align_locations: true\n", CONFIG),
    );

    cmd()
        .args(["--config", &config, "validate"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("AlignLocationsWithoutWarehouse"));
}

#[test]
fn test_run_with_bad_combination_plans_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "config.yaml",
        &format!("{}in_place: true\n", CONFIG),
    );
    let inventory = write_file(dir.path(), "inventory.yaml", INVENTORY);

    cmd()
        .args(["--config", &config, "--output-json", "run", "--inventory", &inventory])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"validation\""))
        .stdout(predicate::str::contains("\"INIT\""));
}

// =============================================================================
// Run Tests
// =============================================================================

#[test]
fn test_run_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.yaml", CONFIG);
    let inventory = write_file(dir.path(), "inventory.yaml", INVENTORY);
    let out = dir.path().join("reports");

    cmd()
        .args([
            "--config",
            &config,
            "run",
            "--inventory",
            &inventory,
            "--output-dir",
            out.to_str().unwrap(),
            "--concurrency",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tables: 1"));

    assert!(out.join("assorted_test_db_hms-mirror.md").exists());
    let script = std::fs::read_to_string(out.join("assorted_test_db_RIGHT_execute.sql")).unwrap();
    assert!(script.contains("CREATE DATABASE IF NOT EXISTS assorted_test_db"));
    assert!(script.contains("hdfs://HOME90/apps/hive/warehouse/assorted_test_db.db/ext_part_01"));
    assert!(script.contains("MSCK REPAIR TABLE"));
    assert!(!out.join("assorted_test_db_LEFT_execute.sql").exists());
}

#[test]
fn test_run_strategy_override_to_dump() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.yaml", CONFIG);
    let inventory = write_file(dir.path(), "inventory.yaml", INVENTORY);
    let out = dir.path().join("reports");

    cmd()
        .args([
            "--config",
            &config,
            "run",
            "--inventory",
            &inventory,
            "--strategy",
            "DUMP",
            "--output-dir",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(out.join("assorted_test_db_LEFT_execute.sql").exists());
    assert!(!out.join("assorted_test_db_RIGHT_execute.sql").exists());
}
