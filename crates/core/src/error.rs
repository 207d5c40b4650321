use std::error::Error as StdError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error taxonomy. Parse and dependency failures abort the whole
/// comparison; there is no partial-schema recovery.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// The parser could not derive a valid statement from the input.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: {message} in statement `{statement}`")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
        statement: String,
    },
    #[error("statement {statement_index} could not be converted: {message} in `{statement}`")]
    StatementConversion {
        statement_index: usize,
        message: String,
        statement: String,
    },
}

impl ParseError {
    pub fn syntax(
        line: usize,
        column: usize,
        message: impl Into<String>,
        statement: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
            statement: truncate_statement(statement.into()),
        }
    }
}

/// A statement parsed but the engine has no rule for one of its clauses.
/// Fatal rather than ignored, to avoid generating incorrect DDL.
#[derive(Debug, Error)]
#[error("unsupported {dialect} feature: {feature}")]
pub struct UnsupportedError {
    pub dialect: String,
    pub feature: String,
}

impl UnsupportedError {
    pub fn new(dialect: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            feature: feature.into(),
        }
    }
}

/// The desired schema references an object that will never exist.
#[derive(Debug, Error)]
#[error("{object} references unknown {referenced_kind} {referenced}")]
pub struct DependencyError {
    pub object: String,
    pub referenced_kind: String,
    pub referenced: String,
}

impl DependencyError {
    pub fn unknown_reference(
        object: impl Into<String>,
        referenced_kind: impl Into<String>,
        referenced: impl Into<String>,
    ) -> Self {
        Self {
            object: object.into(),
            referenced_kind: referenced_kind.into(),
            referenced: referenced.into(),
        }
    }
}

/// A statement was rejected by the live database or the adapter itself.
#[derive(Debug, Error)]
#[error("statement failed: `{sql}`: {source}")]
pub struct ExecutionError {
    pub sql: String,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl ExecutionError {
    pub fn statement_failed<E>(sql: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            sql: truncate_statement(sql.into()),
            source: Box::new(source),
        }
    }

    pub fn message(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::statement_failed(sql, std::io::Error::other(message.into()))
    }
}

const MAX_REPORTED_STATEMENT_LEN: usize = 200;

fn truncate_statement(statement: String) -> String {
    if statement.len() <= MAX_REPORTED_STATEMENT_LEN {
        return statement;
    }
    let mut end = MAX_REPORTED_STATEMENT_LEN;
    while !statement.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &statement[..end])
}
