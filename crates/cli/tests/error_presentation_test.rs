use std::{
    io::Write,
    process::{Command, Stdio},
};

use tempfile::tempdir;

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
    // The child may exit (e.g. on a config error) before reading stdin,
    // closing the pipe; a broken pipe here is not a test failure.
    if let Err(error) = stdin.write_all(stdin_sql.as_bytes()) {
        if error.kind() != std::io::ErrorKind::BrokenPipe {
            panic!("failed to write stdin payload: {error}");
        }
    }
    drop(stdin);

    child
        .wait_with_output()
        .unwrap_or_else(|error| panic!("failed to wait for sqldrift: {error}"))
}

#[cfg(feature = "sqlite")]
#[test]
fn runtime_parse_error_keeps_typed_category_with_cli_context() {
    let tempdir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let db_path = tempdir.path().join("error-presentation.db");
    let db_path = db_path.to_string_lossy().into_owned();

    let output = run_sqldrift_with_stdin(&["sqlite", db_path.as_str()], "SELECT 1;");

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("[parse]"),
        "stderr must preserve the typed parse category, got: {stderr}",
    );
    assert!(
        stderr.contains("while running migration"),
        "stderr must include the CLI context line, got: {stderr}",
    );
    assert!(
        stderr.contains("syntax error"),
        "stderr must retain the parser diagnostic, got: {stderr}",
    );
}

#[cfg(feature = "sqlite")]
#[test]
fn invalid_config_file_is_a_config_error() {
    let tempdir = tempdir().unwrap_or_else(|error| panic!("failed to create tempdir: {error}"));
    let db_path = tempdir.path().join("config-error.db");
    let db_path = db_path.to_string_lossy().into_owned();
    let config_path = tempdir.path().join("sqldrift.yml");
    std::fs::write(&config_path, "drop_enabled: true\n")
        .unwrap_or_else(|error| panic!("failed to write config: {error}"));
    let config_path = config_path.to_string_lossy().into_owned();

    let output = run_sqldrift_with_stdin(
        &[
            "sqlite",
            db_path.as_str(),
            "--config",
            config_path.as_str(),
        ],
        "CREATE TABLE t (a integer);",
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("[config]"),
        "stderr must categorize config failures, got: {stderr}",
    );
}
