use std::{
    fs,
    io::Write,
    process::{Command, Stdio},
};

use tempfile::tempdir;

fn run_sqldrift(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sqldrift"))
        .args(args)
        .output()
        .unwrap_or_else(|error| panic!("failed to run sqldrift: {error}"))
}

fn run_sqldrift_with_stdin(args: &[&str], stdin_sql: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_sqldrift"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|error| panic!("failed to run sqldrift with stdin: {error}"));

    let mut stdin = child
        .stdin
        .take()
        .unwrap_or_else(|| panic!("failed to capture child stdin"));
    stdin
        .write_all(stdin_sql.as_bytes())
        .unwrap_or_else(|error| panic!("failed to write stdin payload: {error}"));
    drop(stdin);

    child
        .wait_with_output()
        .unwrap_or_else(|error| panic!("failed to wait for sqldrift: {error}"))
}

#[cfg(feature = "sqlite")]
#[test]
fn rejects_apply_combined_with_export() {
    let tempdir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let db_path = tempdir.path().join("conflict.db");
    let db_path = db_path.to_string_lossy().into_owned();

    let output = run_sqldrift(&["sqlite", db_path.as_str(), "--apply", "--export"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--apply"));
    assert!(stderr.contains("--export"));
}

#[cfg(feature = "sqlite")]
#[test]
fn defaults_to_dry_run_and_prints_the_migration() {
    let tempdir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let db_path = tempdir.path().join("dry-run.db");
    let db_path = db_path.to_string_lossy().into_owned();
    let schema_path = tempdir.path().join("schema.sql");
    fs::write(
        &schema_path,
        "CREATE TABLE users (id integer PRIMARY KEY, name text);",
    )
    .unwrap_or_else(|error| panic!("failed to write schema.sql: {error}"));
    let schema_path = schema_path.to_string_lossy().into_owned();

    let output = run_sqldrift(&["sqlite", db_path.as_str(), "--file", schema_path.as_str()]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("CREATE TABLE \"users\""),
        "dry run must print the pending DDL, got: {stdout}",
    );

    // Dry run must not change the database.
    let rerun = run_sqldrift(&["sqlite", db_path.as_str(), "--export"]);
    assert_eq!(rerun.status.code(), Some(0));
    let exported = String::from_utf8_lossy(&rerun.stdout);
    assert!(
        !exported.contains("users"),
        "dry run must not apply anything, got: {exported}",
    );
}

#[cfg(feature = "sqlite")]
#[test]
fn apply_then_rerun_converges_to_nothing_modified() {
    let tempdir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let db_path = tempdir.path().join("apply.db");
    let db_path = db_path.to_string_lossy().into_owned();
    let schema = "CREATE TABLE users (id integer PRIMARY KEY, name text);";

    let applied = run_sqldrift_with_stdin(&["sqlite", db_path.as_str(), "--apply"], schema);
    assert_eq!(applied.status.code(), Some(0));

    let rerun = run_sqldrift_with_stdin(&["sqlite", db_path.as_str()], schema);
    assert_eq!(rerun.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&rerun.stdout);
    assert!(
        stdout.contains("-- Nothing is modified --"),
        "a converged schema must report no changes, got: {stdout}",
    );
}

#[cfg(feature = "sqlite")]
#[test]
fn schema_file_mode_needs_no_database() {
    let tempdir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let current_path = tempdir.path().join("current.sql");
    fs::write(&current_path, "CREATE TABLE t (a integer);")
        .unwrap_or_else(|error| panic!("failed to write current.sql: {error}"));
    let current_path = current_path.to_string_lossy().into_owned();

    let output = run_sqldrift_with_stdin(
        &[
            "sqlite",
            "unused",
            "--schema-file",
            current_path.as_str(),
        ],
        "CREATE TABLE t (a integer, b text);",
    );

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("ALTER TABLE \"t\" ADD COLUMN \"b\" text"),
        "offline mode must diff against the schema file, got: {stdout}",
    );
}

#[cfg(all(feature = "sqlite", not(feature = "mssql")))]
#[test]
fn mssql_subcommand_is_feature_gated() {
    let output = run_sqldrift(&["mssql", "app"]);
    assert_eq!(output.status.code(), Some(2));
}
