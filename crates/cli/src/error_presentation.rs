use std::{io, path::PathBuf};

use anyhow::Context;
use miette::Report;

const ORCHESTRATOR_CONTEXT: &str = "while running migration";
const FILE_READ_CONTEXT: &str = "while reading desired schema file";
const STDIN_READ_CONTEXT: &str = "while reading desired schema from stdin";
const CONFIG_READ_CONTEXT: &str = "while loading config file";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    MissingDesiredSchemaInput,
    ReadFile {
        path: PathBuf,
        source: io::Error,
    },
    ReadStdin(io::Error),
    ReadConfig {
        path: PathBuf,
        source: io::Error,
    },
    InvalidConfig {
        path: PathBuf,
        message: String,
    },
    InvalidFilterPattern(String),
    Core(sqldrift_core::Error),
    #[cfg(not(any(
        feature = "mysql",
        feature = "postgres",
        feature = "sqlite",
        feature = "mssql"
    )))]
    NoDialectsEnabled,
}

impl From<sqldrift_core::Error> for CliError {
    fn from(value: sqldrift_core::Error) -> Self {
        Self::Core(value)
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::MissingDesiredSchemaInput => {
            format!("[usage] {}", missing_desired_schema_message())
        }
        CliError::ReadFile { path, source } => {
            let context = format!("{FILE_READ_CONTEXT} `{}`", path.display());
            let report = report_with_context(source, context);
            format!("[io] {report}")
        }
        CliError::ReadStdin(source) => {
            let report = report_with_context(source, STDIN_READ_CONTEXT);
            format!("[io] {report}")
        }
        CliError::ReadConfig { path, source } => {
            let context = format!("{CONFIG_READ_CONTEXT} `{}`", path.display());
            let report = report_with_context(source, context);
            format!("[io] {report}")
        }
        CliError::InvalidConfig { path, message } => {
            format!("[config] invalid config file `{}`: {message}", path.display())
        }
        CliError::InvalidFilterPattern(message) => {
            format!("[config] invalid --target/--skip pattern: {message}")
        }
        CliError::Core(source) => {
            let category = core_category(&source);
            let report = report_with_context(source, ORCHESTRATOR_CONTEXT);
            format!("[{category}] {report}")
        }
        #[cfg(not(any(
            feature = "mysql",
            feature = "postgres",
            feature = "sqlite",
            feature = "mssql"
        )))]
        CliError::NoDialectsEnabled => format!("[config] {}", no_dialects_enabled_message()),
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error = std::result::Result::<(), E>::Err(source)
        .context(context)
        .expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}

fn core_category(error: &sqldrift_core::Error) -> &'static str {
    match error {
        sqldrift_core::Error::Parse(_) => "parse",
        sqldrift_core::Error::Unsupported(_) => "unsupported",
        sqldrift_core::Error::Dependency(_) => "dependency",
        sqldrift_core::Error::Execution(_) => "execute",
    }
}

pub(crate) fn missing_desired_schema_message() -> &'static str {
    "missing desired schema SQL: pass --file <PATH> or pipe SQL via stdin"
}

#[cfg(not(any(
    feature = "mysql",
    feature = "postgres",
    feature = "sqlite",
    feature = "mssql"
)))]
pub(crate) fn no_dialects_enabled_message() -> &'static str {
    "no dialect features are enabled for this build; enable at least one of mysql/postgres/sqlite/mssql"
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldrift_core::ParseError;

    #[test]
    fn core_errors_keep_their_category() {
        let error = CliError::Core(
            ParseError::syntax(1, 1, "expected CREATE", "SELECT 1").into(),
        );
        let rendered = render_runtime_error(error);
        assert!(rendered.starts_with("[parse]"));
        assert!(rendered.contains("while running migration"));
        assert!(rendered.contains("syntax error at line 1"));
    }

    #[test]
    fn missing_input_is_a_usage_error() {
        let rendered = render_runtime_error(CliError::MissingDesiredSchemaInput);
        assert!(rendered.starts_with("[usage]"));
        assert!(rendered.contains("--file"));
    }
}
