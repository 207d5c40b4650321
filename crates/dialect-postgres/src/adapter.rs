//! Live PostgreSQL adapter. Exporting rebuilds DDL from pg_catalog so the
//! result parses back through the shared grammar; the server's own
//! `pg_get_*def` helpers do the rendering where one exists.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::io;
use std::sync::{Mutex, MutexGuard};

use postgres::types::FromSqlOwned;
use postgres::{Client, NoTls, Row};
use sqldrift_core::{ConnectionConfig, DatabaseAdapter, ExecutionError, Result};

use crate::export_queries;

const CONNECT_SQL: &str = "CONNECT postgres";
const DEFAULT_HOST: &str = "127.0.0.1";
const MINIMUM_MAJOR_VERSION: u32 = 13;
const POISONED_CLIENT_MESSAGE: &str = "postgres connection state was poisoned";

pub(crate) struct PostgresAdapter {
    client: Mutex<Client>,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
    let mut client = connect_client(config)?;
    let raw_version = query_scalar(&mut client, export_queries::SHOW_SERVER_VERSION_QUERY)?;
    ensure_minimum_version(&raw_version)?;
    Ok(Box::new(PostgresAdapter {
        client: Mutex::new(client),
    }))
}

impl PostgresAdapter {
    fn lock_client(&self, sql: &str) -> Result<MutexGuard<'_, Client>> {
        self.client
            .lock()
            .map_err(|_| execution_error(sql, io::Error::other(POISONED_CLIENT_MESSAGE)))
    }
}

impl DatabaseAdapter for PostgresAdapter {
    fn export_schema(&self) -> Result<String> {
        let mut client = self.lock_client(export_queries::TABLE_NAMES_QUERY)?;
        let mut statements = Vec::new();

        for row in &query(&mut client, export_queries::SCHEMAS_QUERY)? {
            let schema: String = row_value(row, "schema_name", export_queries::SCHEMAS_QUERY)?;
            statements.push(format!("CREATE SCHEMA {};", quote_identifier(&schema)));
        }

        for row in &query(&mut client, export_queries::EXTENSIONS_QUERY)? {
            let name: String =
                row_value(row, "extension_name", export_queries::EXTENSIONS_QUERY)?;
            statements.push(format!("CREATE EXTENSION {};", quote_identifier(&name)));
        }

        statements.extend(export_enums(&mut client)?);
        statements.extend(export_sequences(&mut client)?);
        statements.extend(export_tables(&mut client)?);
        statements.extend(export_indexes(&mut client)?);
        statements.extend(export_views(&mut client)?);

        for row in &query(&mut client, export_queries::TRIGGERS_QUERY)? {
            let definition: String =
                row_value(row, "definition", export_queries::TRIGGERS_QUERY)?;
            statements.push(format!("{definition};"));
        }

        statements.extend(export_policies(&mut client)?);

        Ok(statements.join("\n\n"))
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let mut client = self.lock_client(sql)?;
        client
            .batch_execute(sql)
            .map_err(|source| execution_error(sql, source))
    }
}

fn export_enums(client: &mut Client) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    for row in &query(client, export_queries::ENUMS_QUERY)? {
        let schema: String = row_value(row, "type_schema", export_queries::ENUMS_QUERY)?;
        let name: String = row_value(row, "type_name", export_queries::ENUMS_QUERY)?;
        let label: String = row_value(row, "enum_label", export_queries::ENUMS_QUERY)?;
        let qualified = render_qualified_name(&schema, &name);
        match &mut current {
            Some((open_name, labels)) if *open_name == qualified => labels.push(label),
            _ => {
                if let Some(open) = current.take() {
                    statements.push(render_create_enum(&open));
                }
                current = Some((qualified, vec![label]));
            }
        }
    }
    if let Some(open) = current {
        statements.push(render_create_enum(&open));
    }
    Ok(statements)
}

fn render_create_enum((name, labels): &(String, Vec<String>)) -> String {
    let labels = labels
        .iter()
        .map(|label| quote_literal(label))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TYPE {name} AS ENUM ({labels});")
}

// Default bounds are left unspoken so they compare equal to a plain
// CREATE SEQUENCE on the desired side.
fn export_sequences(client: &mut Client) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for row in &query(client, export_queries::SEQUENCES_QUERY)? {
        let sql = export_queries::SEQUENCES_QUERY;
        let schema: String = row_value(row, "sequence_schema", sql)?;
        let name: String = row_value(row, "sequence_name", sql)?;
        let increment: i64 = row_value(row, "increment", sql)?;
        let min_value: i64 = row_value(row, "min_value", sql)?;
        let max_value: i64 = row_value(row, "max_value", sql)?;
        let start: i64 = row_value(row, "start_value", sql)?;
        let cache: i64 = row_value(row, "cache_size", sql)?;
        let cycle: bool = row_value(row, "cycle", sql)?;

        let mut statement = format!("CREATE SEQUENCE {}", render_qualified_name(&schema, &name));
        if increment != 1 {
            write!(statement, " INCREMENT BY {increment}").expect("write to String");
        }
        if min_value != 1 && min_value != i64::MIN {
            write!(statement, " MINVALUE {min_value}").expect("write to String");
        }
        if max_value != i64::MAX && max_value != -1 {
            write!(statement, " MAXVALUE {max_value}").expect("write to String");
        }
        if start != min_value.max(1) {
            write!(statement, " START WITH {start}").expect("write to String");
        }
        if cache != 1 {
            write!(statement, " CACHE {cache}").expect("write to String");
        }
        if cycle {
            statement.push_str(" CYCLE");
        }
        statement.push(';');
        statements.push(statement);
    }
    Ok(statements)
}

fn export_tables(client: &mut Client) -> Result<Vec<String>> {
    struct TableRow {
        schema: String,
        name: String,
        partition_key: Option<String>,
    }

    let tables = query(client, export_queries::TABLE_NAMES_QUERY)?
        .iter()
        .map(|row| {
            let sql = export_queries::TABLE_NAMES_QUERY;
            Ok(TableRow {
                schema: row_value(row, "table_schema", sql)?,
                name: row_value(row, "table_name", sql)?,
                partition_key: row_value(row, "partition_key", sql)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut statements = Vec::new();
    for table in &tables {
        let mut lines = Vec::new();
        let column_rows = client
            .query(
                export_queries::TABLE_COLUMNS_QUERY,
                &[&table.schema, &table.name],
            )
            .map_err(|source| execution_error(export_queries::TABLE_COLUMNS_QUERY, source))?;
        for row in &column_rows {
            lines.push(render_column(row)?);
        }

        let mut statement = format!(
            "CREATE TABLE {} (\n  {}\n)",
            render_qualified_name(&table.schema, &table.name),
            lines.join(",\n  ")
        );
        if let Some(partition_key) = table
            .partition_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            write!(statement, " PARTITION BY {partition_key}").expect("write to String");
        }
        statement.push(';');
        statements.push(statement);

        let constraint_rows = client
            .query(
                export_queries::TABLE_CONSTRAINTS_QUERY,
                &[&table.schema, &table.name],
            )
            .map_err(|source| execution_error(export_queries::TABLE_CONSTRAINTS_QUERY, source))?;
        for row in &constraint_rows {
            let sql = export_queries::TABLE_CONSTRAINTS_QUERY;
            let name: String = row_value(row, "constraint_name", sql)?;
            let definition: String = row_value(row, "definition", sql)?;
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {definition};",
                render_qualified_name(&table.schema, &table.name),
                quote_identifier(&name)
            ));
        }
    }
    Ok(statements)
}

fn render_column(row: &Row) -> Result<String> {
    let sql = export_queries::TABLE_COLUMNS_QUERY;
    let name: String = row_value(row, "column_name", sql)?;
    let data_type: String = row_value(row, "data_type", sql)?;
    let not_null: bool = row_value(row, "not_null", sql)?;
    let default_expr: Option<String> = row_value(row, "default_expr", sql)?;
    let is_identity: bool = row_value(row, "is_identity", sql)?;
    let is_generated: bool = row_value(row, "is_generated", sql)?;
    let collation: Option<String> = row_value(row, "collation_name", sql)?;

    let mut line = format!("{} {data_type}", quote_identifier(&name));
    if let Some(collation) = collation {
        write!(line, " COLLATE {}", quote_identifier(&collation)).expect("write to String");
    }
    if is_generated {
        if let Some(expr) = default_expr.as_deref() {
            write!(line, " GENERATED ALWAYS AS ({expr}) STORED").expect("write to String");
        }
        if not_null {
            line.push_str(" NOT NULL");
        }
        return Ok(line);
    }
    if is_identity {
        line.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }
    if not_null {
        line.push_str(" NOT NULL");
    }
    if let Some(expr) = default_expr
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        write!(line, " DEFAULT {expr}").expect("write to String");
    }
    Ok(line)
}

fn export_indexes(client: &mut Client) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for row in &query(client, export_queries::INDEXES_QUERY)? {
        let definition: String = row_value(row, "definition", export_queries::INDEXES_QUERY)?;
        statements.push(format!("{definition};"));
    }
    Ok(statements)
}

fn export_views(client: &mut Client) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for row in &query(client, export_queries::VIEWS_QUERY)? {
        let sql = export_queries::VIEWS_QUERY;
        let schema: String = row_value(row, "view_schema", sql)?;
        let name: String = row_value(row, "view_name", sql)?;
        let materialized: bool = row_value(row, "materialized", sql)?;
        let definition: String = row_value(row, "definition", sql)?;
        let kind = if materialized {
            "MATERIALIZED VIEW"
        } else {
            "VIEW"
        };
        statements.push(format!(
            "CREATE {kind} {} AS {};",
            render_qualified_name(&schema, &name),
            definition.trim().trim_end_matches(';')
        ));
    }
    Ok(statements)
}

fn export_policies(client: &mut Client) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for row in &query(client, export_queries::POLICIES_QUERY)? {
        let sql = export_queries::POLICIES_QUERY;
        let schema: String = row_value(row, "table_schema", sql)?;
        let table: String = row_value(row, "table_name", sql)?;
        let name: String = row_value(row, "policy_name", sql)?;
        let permissive: String = row_value(row, "permissive", sql)?;
        let roles: Vec<String> = row_value(row, "roles", sql)?;
        let command: Option<String> = row_value(row, "command", sql)?;
        let using_expr: Option<String> = row_value(row, "using_expr", sql)?;
        let check_expr: Option<String> = row_value(row, "check_expr", sql)?;

        let mut statement = format!(
            "CREATE POLICY {} ON {} AS {}",
            quote_identifier(&name),
            render_qualified_name(&schema, &table),
            permissive.to_ascii_uppercase()
        );
        if let Some(command) = command {
            write!(statement, " FOR {command}").expect("write to String");
        }
        if !roles.is_empty() {
            let roles = roles
                .iter()
                .map(|role| {
                    if role.eq_ignore_ascii_case("public") {
                        "PUBLIC".to_string()
                    } else {
                        quote_identifier(role)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            write!(statement, " TO {roles}").expect("write to String");
        }
        if let Some(using_expr) = using_expr {
            write!(statement, " USING ({using_expr})").expect("write to String");
        }
        if let Some(check_expr) = check_expr {
            write!(statement, " WITH CHECK ({check_expr})").expect("write to String");
        }
        statement.push(';');
        statements.push(statement);
    }
    Ok(statements)
}

fn connect_client(config: &ConnectionConfig) -> Result<Client> {
    let mut postgres_config = postgres::Config::new();

    if let Some(socket_path) = &config.socket {
        postgres_config.host_path(socket_path);
    } else if config.host.is_empty() {
        postgres_config.host(DEFAULT_HOST);
    } else {
        postgres_config.host(&config.host);
    }

    if let Some(port) = config.port {
        postgres_config.port(port);
    }
    if !config.user.is_empty() {
        postgres_config.user(&config.user);
    }
    if let Some(password) = &config.password {
        postgres_config.password(password);
    }
    postgres_config.dbname(&config.database);

    postgres_config
        .connect(NoTls)
        .map_err(|source| execution_error(CONNECT_SQL, source))
}

fn query(client: &mut Client, sql: &str) -> Result<Vec<Row>> {
    client
        .query(sql, &[])
        .map_err(|source| execution_error(sql, source))
}

fn query_scalar(client: &mut Client, sql: &str) -> Result<String> {
    let row = client
        .query_one(sql, &[])
        .map_err(|source| execution_error(sql, source))?;
    row.try_get::<_, String>(0)
        .map_err(|source| execution_error(sql, source))
}

pub(crate) fn parse_major_version(raw: &str) -> Option<u32> {
    let first = raw.split_whitespace().next()?;
    let digits = first
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
                "failed to parse postgres server version string: `{raw_version}`"
            )),
        )
    })?;
    if major >= MINIMUM_MAJOR_VERSION {
        return Ok(());
    }
    Err(execution_error(
        export_queries::SHOW_SERVER_VERSION_QUERY,
        io::Error::other(format!(
            "postgres server version `{raw_version}` is not supported; requires {MINIMUM_MAJOR_VERSION}+"
        )),
    ))
}

fn render_qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}

fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn row_value<T>(row: &Row, column: &str, sql: &str) -> Result<T>
where
    T: FromSqlOwned,
{
    row.try_get(column)
        .map_err(|source| execution_error(sql, source))
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
        assert_eq!(parse_major_version("15.4"), Some(15));
        assert_eq!(
            parse_major_version("16.1 (Debian 16.1-1.pgdg120+1)"),
            Some(16)
        );
        assert_eq!(parse_major_version("13beta1"), Some(13));
        assert_eq!(parse_major_version("devel"), None);
    }

    #[test]
    fn version_gate_rejects_old_servers() {
        assert!(ensure_minimum_version("12.9").is_err());
        assert!(ensure_minimum_version("13.0").is_ok());
    }

    #[test]
    fn identifier_quoting_doubles_embedded_quotes() {
        assert_eq!(quote_identifier("weird\"name"), "\"weird\"\"name\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
