use std::path::Path;
use std::process::{Command, Output};

fn svcdir(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svcdir"))
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("svcdir should spawn")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be one JSON document")
}

#[test]
fn ping_reports_pong() {
    let dir = tempfile::tempdir().unwrap();
    let output = svcdir(&dir.path().join("svcdir.sqlite3"), &["ping"]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["ping"], "pong");
}

#[test]
fn init_db_creates_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("svcdir.sqlite3");

    let output = svcdir(&db, &["init-db"]);

    assert!(output.status.success());
    assert!(db.exists());
    assert_eq!(stdout_json(&output)["schema_version"], 2);
}

#[test]
fn jobs_on_empty_database_are_clean() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("svcdir.sqlite3");

    let commit = svcdir(&db, &["commit-scheduled", "--now", "1000"]);
    assert!(commit.status.success());
    let report = stdout_json(&commit);
    assert_eq!(report["job"], "schedule_commit");
    assert_eq!(report["now"], 1000);
    assert_eq!(report["failed"].as_array().map(Vec::len), Some(0));

    let archive = svcdir(&db, &["archive-sweep", "--now", "1000"]);
    assert!(archive.status.success());
    assert_eq!(stdout_json(&archive)["job"], "archive_sweep");
}

#[test]
fn resolve_unknown_root_fails_with_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("svcdir.sqlite3");

    let output = svcdir(
        &db,
        &[
            "resolve",
            "--root",
            "6f1c1c3e-8d4b-4a53-9a57-0d4b8c3f2a10",
            "--language",
            "fi",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not_found"));
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"publishing": {"archive_review_window_days": -1}}"#).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_svcdir"))
        .arg("--config")
        .arg(&config)
        .arg("ping")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("config"));
}
