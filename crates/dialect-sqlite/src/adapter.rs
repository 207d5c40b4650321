//! Live SQLite adapter. The "connection string" is a database file path;
//! exporting reads DDL verbatim out of sqlite_master.

use std::error::Error as StdError;
use std::io;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use sqldrift_core::{ConnectionConfig, DatabaseAdapter, ExecutionError, Result};

use crate::export_queries;

const CONNECT_SQL: &str = "CONNECT sqlite";
// DROP COLUMN needs 3.35.
const MINIMUM_VERSION: (u32, u32) = (3, 35);
const POISONED_CONNECTION_MESSAGE: &str = "sqlite connection state was poisoned";

pub(crate) struct SqliteAdapter {
    connection: Mutex<Connection>,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
    let connection = Connection::open(config.database.as_str())
        .map_err(|source| execution_error(CONNECT_SQL, source))?;
    let raw_version = query_server_version(&connection)?;
    ensure_minimum_version(&raw_version)?;
    Ok(Box::new(SqliteAdapter {
        connection: Mutex::new(connection),
    }))
}

impl SqliteAdapter {
    fn lock_connection(&self, sql: &str) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| execution_error(sql, io::Error::other(POISONED_CONNECTION_MESSAGE)))
    }
}

impl DatabaseAdapter for SqliteAdapter {
    fn export_schema(&self) -> Result<String> {
        let connection = self.lock_connection(export_queries::TABLE_NAMES_QUERY)?;
        let table_names = query_string_rows(&connection, export_queries::TABLE_NAMES_QUERY)?;

        let mut statements = Vec::new();
        for table_name in table_names {
            let table_sql: String = connection
                .query_row(export_queries::TABLE_DDL_QUERY, [&table_name], |row| {
                    row.get(0)
                })
                .map_err(|source| execution_error(export_queries::TABLE_DDL_QUERY, source))?;
            statements.push(ensure_statement_terminated(table_sql));
        }

        statements.extend(query_sql_statements(
            &connection,
            export_queries::VIEW_DDLS_QUERY,
        )?);
        statements.extend(query_sql_statements(
            &connection,
            export_queries::INDEX_DDLS_QUERY,
        )?);
        statements.extend(query_sql_statements(
            &connection,
            export_queries::TRIGGER_DDLS_QUERY,
        )?);

        Ok(statements.join("\n\n"))
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let connection = self.lock_connection(sql)?;
        connection
            .execute_batch(sql)
            .map_err(|source| execution_error(sql, source))
    }
}

fn query_server_version(connection: &Connection) -> Result<String> {
    connection
        .query_row(export_queries::SHOW_SERVER_VERSION_QUERY, [], |row| {
            row.get(0)
        })
        .map_err(|source| execution_error(export_queries::SHOW_SERVER_VERSION_QUERY, source))
}

fn query_string_rows(connection: &Connection, query: &str) -> Result<Vec<String>> {
    let mut statement = connection
        .prepare(query)
        .map_err(|source| execution_error(query, source))?;
    let mut rows = statement
        .query([])
        .map_err(|source| execution_error(query, source))?;

    let mut values = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|source| execution_error(query, source))?
    {
        values.push(
            row.get::<_, String>(0)
                .map_err(|source| execution_error(query, source))?,
        );
    }
    Ok(values)
}

fn query_sql_statements(connection: &Connection, query: &str) -> Result<Vec<String>> {
    query_string_rows(connection, query)
        .map(|rows| rows.into_iter().map(ensure_statement_terminated).collect())
}

fn ensure_statement_terminated(sql: String) -> String {
    let trimmed = sql.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

pub(crate) fn parse_version(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split_whitespace().next()?.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|part| part.parse().ok()).unwrap_or(0);
    Some((major, minor))
}

fn ensure_minimum_version(raw_version: &str) -> Result<()> {
    let version = parse_version(raw_version).ok_or_else(|| {
        execution_error(
            export_queries::SHOW_SERVER_VERSION_QUERY,
            io::Error::other(format!(
                "failed to parse sqlite version string: `{raw_version}`"
            )),
        )
    })?;
    if version >= MINIMUM_VERSION {
        return Ok(());
    }
    Err(execution_error(
        export_queries::SHOW_SERVER_VERSION_QUERY,
        io::Error::other(format!(
            "sqlite version `{raw_version}` is not supported; requires {}.{}+",
            MINIMUM_VERSION.0, MINIMUM_VERSION.1
        )),
    ))
}

fn execution_error<E>(sql: &str, source: E) -> sqldrift_core::Error
where
    E: StdError + Send + Sync + 'static,
{
    ExecutionError::statement_failed(sql, source).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldrift_core::adapter::apply_statements;
    use sqldrift_core::MigrationStatement;

    fn memory_adapter() -> SqliteAdapter {
        SqliteAdapter {
            connection: Mutex::new(Connection::open_in_memory().expect("open in-memory db")),
        }
    }

    #[test]
    fn version_gate() {
        assert!(ensure_minimum_version("3.45.1").is_ok());
        assert!(ensure_minimum_version("3.34.0").is_err());
        assert!(ensure_minimum_version("junk").is_err());
    }

    #[test]
    fn export_round_trips_sqlite_master() {
        let adapter = memory_adapter();
        adapter
            .execute("CREATE TABLE t (id integer PRIMARY KEY, name text)")
            .expect("create table");
        adapter
            .execute("CREATE INDEX idx_t_name ON t (name)")
            .expect("create index");

        let exported = adapter.export_schema().expect("export");
        assert!(exported.contains("CREATE TABLE t"));
        assert!(exported.contains("CREATE INDEX idx_t_name"));
        assert!(exported.ends_with(';'));
    }

    #[test]
    fn transactional_batches_commit() {
        let adapter = memory_adapter();
        let statements = vec![
            MigrationStatement::new("CREATE TABLE a (id integer)".to_string()),
            MigrationStatement::new("CREATE TABLE b (id integer)".to_string()),
        ];
        let applied = apply_statements(&adapter, &statements).expect("apply");
        assert_eq!(applied, 2);
        assert!(adapter.export_schema().expect("export").contains("CREATE TABLE b"));
    }
}
