//! Live MySQL adapter. Exporting leans on `SHOW CREATE TABLE`, which already
//! emits DDL in the server's canonical spelling; views and triggers come from
//! INFORMATION_SCHEMA and are re-rendered as CREATE statements.

use std::error::Error as StdError;
use std::io;
use std::sync::{Mutex, MutexGuard};

use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Pool, PooledConn, Row};
use sqldrift_core::{ConnectionConfig, DatabaseAdapter, ExecutionError, Result};

use crate::export_queries;

const CONNECT_SQL: &str = "CONNECT mysql";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3306;
const MINIMUM_MAJOR_VERSION: u32 = 8;
const POISONED_CONNECTION_MESSAGE: &str = "mysql connection state was poisoned";

pub(crate) struct MysqlAdapter {
    connection: Mutex<PooledConn>,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
    let mut connection = connect_connection(config)?;
    let raw_version = query_scalar(&mut connection, export_queries::SHOW_SERVER_VERSION_QUERY)?;
    ensure_minimum_version(&raw_version)?;
    Ok(Box::new(MysqlAdapter {
        connection: Mutex::new(connection),
    }))
}

impl MysqlAdapter {
    fn lock_connection(&self, sql: &str) -> Result<MutexGuard<'_, PooledConn>> {
        self.connection
            .lock()
            .map_err(|_| execution_error(sql, io::Error::other(POISONED_CONNECTION_MESSAGE)))
    }
}

impl DatabaseAdapter for MysqlAdapter {
    fn export_schema(&self) -> Result<String> {
        let mut connection = self.lock_connection(export_queries::TABLE_NAMES_QUERY)?;
        let table_names = query_table_names(&mut connection)?;

        let mut statements = Vec::new();
        for table_name in table_names {
            statements.push(export_table_ddl(&mut connection, &table_name)?);
        }
        statements.extend(export_views(&mut connection)?);
        statements.extend(export_triggers(&mut connection)?);

        Ok(statements.join("\n\n"))
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let mut connection = self.lock_connection(sql)?;
        connection
            .query_drop(sql)
            .map_err(|source| execution_error(sql, source))
    }
}

fn connect_connection(config: &ConnectionConfig) -> Result<PooledConn> {
    let host = if config.host.is_empty() {
        DEFAULT_HOST.to_string()
    } else {
        config.host.clone()
    };
    let mut builder = OptsBuilder::new()
        .ip_or_hostname(Some(host))
        .tcp_port(config.port.unwrap_or(DEFAULT_PORT))
        .user(Some(config.user.clone()))
        .pass(config.password.clone())
        .db_name(Some(config.database.clone()));
    if let Some(socket) = &config.socket {
        builder = builder.socket(Some(socket.clone()));
    }

    let pool = Pool::new(builder).map_err(|source| execution_error(CONNECT_SQL, source))?;
    pool.get_conn()
        .map_err(|source| execution_error(CONNECT_SQL, source))
}

fn query_scalar(connection: &mut PooledConn, sql: &str) -> Result<String> {
    connection
        .query_first::<String, _>(sql)
        .map_err(|source| execution_error(sql, source))?
        .ok_or_else(|| execution_error(sql, io::Error::other("query returned no rows")))
}

fn query_table_names(connection: &mut PooledConn) -> Result<Vec<String>> {
    let query = export_queries::TABLE_NAMES_QUERY;
    let rows = connection
        .query::<Row, _>(query)
        .map_err(|source| execution_error(query, source))?;
    let mut table_names = rows
        .iter()
        .map(|row| row_string(row, 0, query, "table_name"))
        .collect::<Result<Vec<_>>>()?;
    table_names.sort_unstable();
    Ok(table_names)
}

fn export_table_ddl(connection: &mut PooledConn, table_name: &str) -> Result<String> {
    let escaped_table_name = table_name.replace('`', "``");
    let query = format!("SHOW CREATE TABLE `{escaped_table_name}`");
    let row = connection
        .query_first::<Row, _>(query.as_str())
        .map_err(|source| execution_error(&query, source))?
        .ok_or_else(|| execution_error(&query, io::Error::other("query returned no rows")))?;
    let ddl = row_string(&row, 1, &query, "Create Table")?;
    Ok(ensure_statement_terminated(ddl))
}

fn export_views(connection: &mut PooledConn) -> Result<Vec<String>> {
    let query = export_queries::VIEWS_QUERY;
    let rows = connection
        .query::<Row, _>(query)
        .map_err(|source| execution_error(query, source))?;

    let mut statements = Vec::with_capacity(rows.len());
    for row in &rows {
        let view_name = row_string(row, 0, query, "TABLE_NAME")?;
        let view_definition = row_string(row, 1, query, "VIEW_DEFINITION")?;
        let security_type = row_string(row, 2, query, "SECURITY_TYPE")?;
        statements.push(format!(
            "CREATE SQL SECURITY {} VIEW {} AS {};",
            security_type.trim().to_ascii_uppercase(),
            quote_identifier(view_name.as_str()),
            view_definition.trim()
        ));
    }
    Ok(statements)
}

fn export_triggers(connection: &mut PooledConn) -> Result<Vec<String>> {
    let query = export_queries::TRIGGERS_QUERY;
    let rows = connection
        .query::<Row, _>(query)
        .map_err(|source| execution_error(query, source))?;

    let mut statements = Vec::with_capacity(rows.len());
    for row in &rows {
        let trigger_name = row_string(row, 0, query, "TRIGGER_NAME")?;
        let event = row_string(row, 1, query, "EVENT_MANIPULATION")?;
        let table = row_string(row, 2, query, "EVENT_OBJECT_TABLE")?;
        let timing = row_string(row, 3, query, "ACTION_TIMING")?;
        let statement = row_string(row, 4, query, "ACTION_STATEMENT")?;

        let body = statement.trim().trim_end_matches(';').trim();
        statements.push(format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {};",
            quote_identifier(trigger_name.as_str()),
            timing.trim().to_ascii_uppercase(),
            event.trim().to_ascii_uppercase(),
            quote_identifier(table.as_str()),
            body
        ));
    }

    Ok(statements)
}

fn ensure_statement_terminated(sql: String) -> String {
    let trimmed = sql.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

fn row_string(row: &Row, index: usize, query: &str, label: &str) -> Result<String> {
    row.get::<String, usize>(index).ok_or_else(|| {
        execution_error(
            query,
            io::Error::other(format!("missing column `{label}` in query result")),
        )
    })
}

pub(crate) fn parse_major_version(raw: &str) -> Option<u32> {
    let digits = raw
        .split_whitespace()
        .next()?
        .split('.')
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>();
    digits.parse().ok()
}

fn ensure_minimum_version(raw_version: &str) -> Result<()> {
    let major = parse_major_version(raw_version).ok_or_else(|| {
        execution_error(
            export_queries::SHOW_SERVER_VERSION_QUERY,
            io::Error::other(format!(
                "failed to parse mysql server version string: `{raw_version}`"
            )),
        )
    })?;
    if major >= MINIMUM_MAJOR_VERSION {
        return Ok(());
    }
    Err(execution_error(
        export_queries::SHOW_SERVER_VERSION_QUERY,
        io::Error::other(format!(
            "mysql server version `{raw_version}` is not supported; requires {MINIMUM_MAJOR_VERSION}.0+"
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

    #[test]
    fn server_version_strings_parse() {
        assert_eq!(parse_major_version("8.0.36"), Some(8));
        assert_eq!(parse_major_version("8.4.0-log"), Some(8));
        assert_eq!(parse_major_version("notaversion"), None);
    }

    #[test]
    fn version_gate_rejects_old_servers() {
        assert!(ensure_minimum_version("5.7.44").is_err());
        assert!(ensure_minimum_version("8.0.36").is_ok());
    }

    #[test]
    fn exported_ddl_is_semicolon_terminated() {
        assert_eq!(
            ensure_statement_terminated("CREATE TABLE `t` (`id` int)".to_string()),
            "CREATE TABLE `t` (`id` int);"
        );
        assert_eq!(
            ensure_statement_terminated("CREATE TABLE `t` (`id` int);\n".to_string()),
            "CREATE TABLE `t` (`id` int);"
        );
    }
}
