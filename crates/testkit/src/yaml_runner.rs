//! YAML-driven dialect tests. Each case names a current schema, a desired
//! schema, and the DDL expected in between; the runner plans the migration
//! in both directions and checks that a schema compared against itself
//! produces nothing.

use std::collections::BTreeMap;

use serde::Deserialize;
use sqldrift_core::render::render_plan;
use sqldrift_core::{
    Dialect, ExecutionError, MigrationConfig, Orchestrator, ParseError, Plan, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestCase {
    pub current: String,
    pub desired: String,
    /// Expected DDL for current -> desired; omitted means "don't check".
    pub up: Option<String>,
    /// Expected DDL for desired -> current.
    pub down: Option<String>,
    /// Exact error message expected from planning.
    pub error: Option<String>,
    pub enable_drop: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed(String),
}

pub fn load_test_cases_from_str(yaml: &str) -> Result<BTreeMap<String, TestCase>> {
    serde_yaml::from_str(yaml).map_err(|source| {
        ParseError::StatementConversion {
            statement_index: 0,
            message: source.to_string(),
            statement: excerpt(yaml),
        }
        .into()
    })
}

pub fn run_offline_test(dialect: &dyn Dialect, test: &TestCase) -> TestResult {
    match run_offline_test_flow(dialect, test) {
        Ok(()) => TestResult::Passed,
        Err(error) => TestResult::Failed(error.to_string()),
    }
}

fn run_offline_test_flow(dialect: &dyn Dialect, test: &TestCase) -> Result<()> {
    let mut config = MigrationConfig::new();
    config.enable_drop = test.enable_drop.unwrap_or(false);
    let orchestrator = Orchestrator::new(dialect, &config);

    let forward = orchestrator.plan_from_sql(&test.current, &test.desired);
    if let Some(expected_error) = &test.error {
        return match forward {
            Ok(_) => Err(assertion_error(format!(
                "expected error: {expected_error}, but planning succeeded"
            ))),
            Err(actual) if actual.to_string() == *expected_error => Ok(()),
            Err(actual) => Err(assertion_error(format!(
                "expected error: {expected_error}, but got: {actual}"
            ))),
        };
    }

    let forward = forward?;
    assert_expected_sql("up", test.up.as_deref(), &forward)?;
    assert_idempotent(&orchestrator, &test.desired, "desired schema")?;

    let reverse = orchestrator.plan_from_sql(&test.desired, &test.current)?;
    assert_expected_sql("down", test.down.as_deref(), &reverse)?;
    assert_idempotent(&orchestrator, &test.current, "current schema")?;

    Ok(())
}

fn assert_idempotent(orchestrator: &Orchestrator<'_>, sql: &str, phase: &str) -> Result<()> {
    let plan = orchestrator.plan_from_sql(sql, sql)?;
    if plan.is_empty() {
        return Ok(());
    }
    Err(assertion_error(format!(
        "{phase} is not idempotent; expected no changes but got:\n{}",
        render_plan(&plan, false).trim()
    )))
}

fn assert_expected_sql(direction: &str, expected: Option<&str>, plan: &Plan) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = render_plan(plan, false);
    if expected.trim() == actual.trim() {
        return Ok(());
    }
    Err(assertion_error(format!(
        "{direction} SQL mismatch; expected:\n{}\nactual:\n{}",
        expected.trim(),
        actual.trim()
    )))
}

fn assertion_error(message: String) -> sqldrift_core::Error {
    ExecutionError::message("yaml testcase", message).into()
}

fn excerpt(yaml: &str) -> String {
    const MAX_CHARS: usize = 256;
    let trimmed = yaml.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(MAX_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cases_parse_with_defaults() {
        let cases = load_test_cases_from_str(
            "add_column:\n  current: CREATE TABLE t (a int);\n  desired: CREATE TABLE t (a int, b int);\n",
        )
        .expect("should load");
        let case = &cases["add_column"];
        assert_eq!(case.enable_drop, None);
        assert!(case.up.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = load_test_cases_from_str(
            "bad:\n  current: ''\n  desired: ''\n  expected: whoops\n",
        )
        .expect_err("must fail");
        assert!(error.to_string().contains("expected"));
    }
}
