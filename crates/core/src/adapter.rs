//! Database adapters: the minimal surface the engine needs from a live
//! database, plus the file adapter used when the "database" is a schema file
//! on disk.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::{ExecutionError, MigrationStatement, Result};

/// One connected database (or stand-in). Implementations live in the
/// dialect crates; the engine only ever sees this trait.
pub trait DatabaseAdapter {
    /// Dumps the current schema as DDL parseable by the owning dialect.
    fn export_schema(&self) -> Result<String>;

    fn execute(&self, sql: &str) -> Result<()>;

    /// Transaction bracket statements. Dialects override where the spelling
    /// differs.
    fn begin_sql(&self) -> &'static str {
        "BEGIN"
    }

    fn commit_sql(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK"
    }
}

/// Groups consecutive transactional statements into one transaction and runs
/// non-transactional ones bare. On failure inside a transaction the batch is
/// rolled back before the error is returned.
pub fn apply_statements(
    adapter: &dyn DatabaseAdapter,
    statements: &[MigrationStatement],
) -> Result<usize> {
    let mut applied = 0;
    let mut index = 0;
    while index < statements.len() {
        if !statements[index].transactional {
            tracing::debug!(sql = %statements[index].sql, "executing");
            adapter.execute(&statements[index].sql)?;
            applied += 1;
            index += 1;
            continue;
        }

        let batch_end = statements[index..]
            .iter()
            .position(|statement| !statement.transactional)
            .map_or(statements.len(), |offset| index + offset);
        adapter.execute(adapter.begin_sql())?;
        for statement in &statements[index..batch_end] {
            tracing::debug!(sql = %statement.sql, "executing");
            if let Err(error) = adapter.execute(&statement.sql) {
                let _ = adapter.execute(adapter.rollback_sql());
                return Err(error);
            }
            applied += 1;
        }
        adapter.execute(adapter.commit_sql())?;
        index = batch_end;
    }
    Ok(applied)
}

/// Treats a DDL file as the current schema. Exporting reads the file;
/// executing appends the statement, so applying a migration keeps the file
/// in sync with what a real database would contain.
pub struct FileAdapter {
    path: PathBuf,
}

impl FileAdapter {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatabaseAdapter for FileAdapter {
    fn export_schema(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&self.path)
            .map_err(|error| ExecutionError::statement_failed("<read schema file>", error).into())
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|error| ExecutionError::statement_failed(sql, error))?;
        writeln!(file, "{sql};").map_err(|error| ExecutionError::statement_failed(sql, error))?;
        Ok(())
    }

    // Files have no transactions; the brackets become no-op comments.
    fn begin_sql(&self) -> &'static str {
        "-- begin"
    }

    fn commit_sql(&self) -> &'static str {
        "-- commit"
    }

    fn rollback_sql(&self) -> &'static str {
        "-- rollback"
    }
}
