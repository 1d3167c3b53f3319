/// CLI binary integration tests using assert_cmd
///
/// These tests invoke the actual binary and verify command-line behavior
mod common;

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

use common::{LogLineBuilder, Workspace};
use logsift::{SqliteStore, parse_record};

fn logsift() -> Command {
    Command::new(env!("CARGO_BIN_EXE_logsift"))
}

#[test]
fn test_cli_help_flag() {
    logsift()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Classify web-server access logs"))
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("rebuild"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_cli_version_flag() {
    logsift().arg("--version").assert().success().stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    logsift().arg("frobnicate").assert().failure();
}

#[test]
fn test_cli_process_requires_a_destination() {
    let workspace = Workspace::new();
    let log = workspace.write_log("a.log", &[LogLineBuilder::new().build()]);

    logsift()
        .arg("process")
        .arg(&log)
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_cli_process_rejects_two_destinations() {
    let workspace = Workspace::new();
    let log = workspace.write_log("a.log", &[LogLineBuilder::new().build()]);

    logsift().args(["process", "--out", "--db"]).arg(&log).assert().failure();
}

#[test]
fn test_cli_process_to_stdout_emits_exact_csv() {
    let workspace = Workspace::new();
    let line = "10.0.0.1 - - [15/Mar/2024:08:00:00 +0000] \
                \"POST /submit HTTP/1.1\" 201 512 \"-\" \"curl/7.68.0\"";
    let log = workspace.write_log("a.log", &[line.to_string()]);

    // No rules are loaded, so the ignore reason is 0 and the CSV line is
    // exactly what the library renders for this record
    let expected = format!("{}\n", parse_record(line).unwrap().to_csv(0));

    logsift()
        .args(["process", "--out", "--database"])
        .arg(workspace.db_path())
        .arg(&log)
        .assert()
        .success()
        .stdout(expected)
        .stderr(predicate::str::contains("There were 1 records read from file."));
}

#[test]
fn test_cli_db_ingest_is_idempotent_across_runs() {
    let workspace = Workspace::new();
    let log = workspace.write_log(
        "a.log",
        &[LogLineBuilder::new().build(), LogLineBuilder::new().ip("10.9.9.9").build()],
    );

    for _ in 0..2 {
        logsift()
            .args(["process", "--db", "--database"])
            .arg(workspace.db_path())
            .arg(&log)
            .assert()
            .success();
    }

    let store = SqliteStore::open(&workspace.db_path()).unwrap();
    assert_eq!(store.scan_page(None, 100).unwrap().len(), 2);
}

#[test]
fn test_cli_import_rules_then_process_applies_classification() {
    let workspace = Workspace::new();
    let rules = workspace.write_rules(
        "rules.json",
        r#"{"ignore": {"ips": ["10.0.0.1"]}, "delete": {"methods": ["HEAD"]}}"#,
    );
    let log = workspace.write_log(
        "a.log",
        &[
            LogLineBuilder::new().ip("10.0.0.1").build(),
            LogLineBuilder::new().ip("10.2.2.2").request("HEAD /ping HTTP/1.1").build(),
        ],
    );

    logsift()
        .args(["import-rules"])
        .arg(&rules)
        .args(["--database"])
        .arg(workspace.db_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 1 ignore IPs rule(s)"))
        .stdout(predicate::str::contains("Added 1 delete methods rule(s)"));

    let output = logsift()
        .args(["process", "--out", "--database"])
        .arg(workspace.db_path())
        .arg(&log)
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    // The HEAD record matched a delete rule and was written nowhere
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\"10.0.0.1\""));
    // IP ignore rule sets bit 2
    assert!(lines[0].ends_with(",\"2\""));
}

#[test]
fn test_cli_rebuild_and_check_cycle() {
    let workspace = Workspace::new();
    let log = workspace.write_log(
        "a.log",
        &[
            LogLineBuilder::new().ip("10.0.0.1").build(),
            LogLineBuilder::new().ip("10.2.2.2").request("POST /form HTTP/1.1").build(),
        ],
    );

    // Ingest with no rules, then add rules after the fact
    logsift()
        .args(["process", "--db", "--database"])
        .arg(workspace.db_path())
        .arg(&log)
        .assert()
        .success();

    let rules = workspace.write_rules(
        "rules.json",
        r#"{"ignore": {"ips": ["10.0.0.1"]}, "delete": {"methods": ["POST"]}}"#,
    );
    logsift()
        .arg("import-rules")
        .arg(&rules)
        .arg("--database")
        .arg(workspace.db_path())
        .assert()
        .success();

    // The store is now stale: check reports findings
    logsift()
        .arg("check")
        .arg("--database")
        .arg(workspace.db_path())
        .assert()
        .success()
        .stderr(predicate::str::contains("should have been deleted"));

    // Rebuild reclassifies and purges
    logsift()
        .arg("rebuild")
        .arg("--database")
        .arg(workspace.db_path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Rebuilding the database"))
        .stderr(predicate::str::contains("1 updated, 1 deleted"));

    // And the store is clean again
    logsift()
        .arg("check")
        .arg("--database")
        .arg(workspace.db_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Checking database sanity"))
        .stderr(predicate::str::contains("should have been deleted").not());

    let store = SqliteStore::open(&workspace.db_path()).unwrap();
    let page = store.scan_page(None, 100).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].ignore_reason, 2);
}

#[test]
fn test_cli_delete_old_prunes_by_age() {
    let workspace = Workspace::new();
    let log = workspace.write_log(
        "a.log",
        &[
            LogLineBuilder::new().ip("10.0.0.1").timestamp("01/Jan/2020:00:00:00 +0000").build(),
            LogLineBuilder::new().ip("10.2.2.2").timestamp("01/Jan/2120:00:00:00 +0000").build(),
        ],
    );
    logsift()
        .args(["process", "--db", "--database"])
        .arg(workspace.db_path())
        .arg(&log)
        .assert()
        .success();

    logsift()
        .arg("delete-old")
        .arg("--database")
        .arg(workspace.db_path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Deleted 1 rows."));

    let store = SqliteStore::open(&workspace.db_path()).unwrap();
    let page = store.scan_page(None, 100).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].record.ip, "10.2.2.2");
}

#[test]
fn test_cli_database_env_var_fallback() {
    let workspace = Workspace::new();
    let log = workspace.write_log("a.log", &[LogLineBuilder::new().build()]);

    logsift()
        .env("LOGSIFT_DB", workspace.db_path())
        .args(["process", "--db"])
        .arg(&log)
        .assert()
        .success();

    assert!(workspace.db_path().exists());
    let store = SqliteStore::open(&workspace.db_path()).unwrap();
    assert_eq!(store.scan_page(None, 100).unwrap().len(), 1);
}

#[test]
fn test_cli_missing_input_file_does_not_fail_the_run() {
    let workspace = Workspace::new();
    let good = workspace.write_log("good.log", &[LogLineBuilder::new().build()]);

    logsift()
        .args(["process", "--db", "--database"])
        .arg(workspace.db_path())
        .arg(workspace.path().join("missing.log"))
        .arg(&good)
        .assert()
        .success();

    let store = SqliteStore::open(&workspace.db_path()).unwrap();
    assert_eq!(store.scan_page(None, 100).unwrap().len(), 1);
}

#[test]
fn test_cli_import_rules_missing_file_fails() {
    let workspace = Workspace::new();
    logsift()
        .arg("import-rules")
        .arg(workspace.path().join("nope.json"))
        .arg("--database")
        .arg(workspace.db_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read rules file"));
}
