//! Live SQL Server adapter. tiberius is async-only, so the adapter owns a
//! current-thread tokio runtime and blocks on it; exporting reconstructs DDL
//! from the sys.* catalog views.

use std::error::Error as StdError;
use std::io;
use std::sync::{Mutex, MutexGuard};

use futures_util::TryStreamExt;
use sqldrift_core::{ConnectionConfig, DatabaseAdapter, ExecutionError, Result};
use tiberius::{AuthMethod, Client, Config, QueryItem};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::export_queries;

type TdsClient = Client<Compat<TcpStream>>;

const CONNECT_SQL: &str = "CONNECT mssql";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1433;
// ProductVersion reports either a year ("2019") or a product major ("15").
const MINIMUM_PRODUCT_MAJOR_VERSION: u16 = 15;
const MINIMUM_YEAR_VERSION: u16 = 2019;
const YEAR_VERSION_THRESHOLD: u16 = 1000;
const SEQUENCE_DEFAULT_START: &str = "-9223372036854775808";
const POISONED_CONNECTION_MESSAGE: &str = "mssql connection state was poisoned";

pub(crate) struct MssqlAdapter {
    state: Mutex<LiveState>,
}

struct LiveState {
    runtime: Runtime,
    client: TdsClient,
}

struct ExportColumn {
    name: String,
    data_type: String,
    max_length: i32,
    precision: i32,
    scale: i32,
    not_null: bool,
    identity: bool,
    default: Option<String>,
    computed: Option<String>,
    persisted: bool,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
    let mut state = connect_live_state(config)?;
    let raw_version = query_scalar_string(&mut state, export_queries::SHOW_SERVER_VERSION_QUERY)?;
    ensure_minimum_version(&raw_version)?;
    Ok(Box::new(MssqlAdapter {
        state: Mutex::new(state),
    }))
}

impl MssqlAdapter {
    fn lock_state(&self, sql: &str) -> Result<MutexGuard<'_, LiveState>> {
        self.state
            .lock()
            .map_err(|_| execution_error(sql, io::Error::other(POISONED_CONNECTION_MESSAGE)))
    }
}

impl DatabaseAdapter for MssqlAdapter {
    fn export_schema(&self) -> Result<String> {
        let mut state = self.lock_state(export_queries::TABLE_NAMES_QUERY)?;
        export_schema_live(&mut state)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.lock_state(sql)?;
        execute_live_sql(&mut state, sql)
    }

    fn begin_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn commit_sql(&self) -> &'static str {
        "COMMIT TRANSACTION"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK TRANSACTION"
    }
}

fn connect_live_state(config: &ConnectionConfig) -> Result<LiveState> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| execution_error(CONNECT_SQL, source))?;
    let tds_config = build_tiberius_config(config);

    let client = runtime.block_on(async {
        let tcp = TcpStream::connect(tds_config.get_addr())
            .await
            .map_err(|source| execution_error(CONNECT_SQL, source))?;
        tcp.set_nodelay(true)
            .map_err(|source| execution_error(CONNECT_SQL, source))?;

        Client::connect(tds_config, tcp.compat_write())
            .await
            .map_err(|source| execution_error(CONNECT_SQL, source))
    })?;

    Ok(LiveState { runtime, client })
}

fn build_tiberius_config(config: &ConnectionConfig) -> Config {
    let host = if config.host.is_empty() {
        DEFAULT_HOST
    } else {
        config.host.as_str()
    };
    let mut tds_config = Config::new();
    tds_config.host(host);
    tds_config.port(config.port.unwrap_or(DEFAULT_PORT));
    tds_config.database(config.database.clone());
    tds_config.authentication(AuthMethod::sql_server(
        config.user.clone(),
        config.password.clone().unwrap_or_default(),
    ));
    tds_config.trust_cert();
    tds_config
}

fn export_schema_live(state: &mut LiveState) -> Result<String> {
    let mut statements = Vec::new();

    for row in query_rows(state, export_queries::SCHEMAS_QUERY)? {
        let name = row.first().map(String::as_str).unwrap_or_default().trim();
        if !name.is_empty() {
            statements.push(format!("CREATE SCHEMA {};", quote_ident(name)));
        }
    }

    statements.extend(export_sequences(state)?);

    let table_rows = query_rows(state, export_queries::TABLE_NAMES_QUERY)?;
    let mut tables = Vec::new();
    for row in &table_rows {
        let schema_name = row.first().map(String::as_str).unwrap_or_default().trim();
        let table_name = row.get(1).map(String::as_str).unwrap_or_default().trim();
        if schema_name.is_empty() || table_name.is_empty() {
            continue;
        }
        tables.push((schema_name.to_string(), table_name.to_string()));
    }

    for (schema_name, table_name) in &tables {
        statements.push(render_table_ddl(state, schema_name, table_name)?);
    }
    for (schema_name, table_name) in &tables {
        statements.extend(export_table_constraints(state, schema_name, table_name)?);
    }

    statements.extend(export_module_definitions(
        state,
        export_queries::VIEWS_QUERY,
    )?);
    statements.extend(export_module_definitions(
        state,
        export_queries::TRIGGERS_QUERY,
    )?);

    Ok(statements.join("\n\n"))
}

fn export_sequences(state: &mut LiveState) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for row in query_rows(state, export_queries::SEQUENCES_QUERY)? {
        let schema_name = row.first().map(String::as_str).unwrap_or_default().trim();
        let name = row.get(1).map(String::as_str).unwrap_or_default().trim();
        if name.is_empty() {
            continue;
        }
        let mut sql = format!(
            "CREATE SEQUENCE {}.{}",
            quote_ident(schema_name),
            quote_ident(name)
        );
        if let Some(start) = row.get(2).map(|value| value.trim())
            && !start.is_empty()
            && start != SEQUENCE_DEFAULT_START
        {
            sql.push_str(&format!(" START WITH {start}"));
        }
        if let Some(increment) = row.get(3).map(|value| value.trim())
            && !increment.is_empty()
            && increment != "1"
        {
            sql.push_str(&format!(" INCREMENT BY {increment}"));
        }
        if let Some(cache) = row.get(4).map(|value| value.trim())
            && !cache.is_empty()
        {
            sql.push_str(&format!(" CACHE {cache}"));
        }
        if row.get(5).is_some_and(|value| value.trim() == "1") {
            sql.push_str(" CYCLE");
        }
        sql.push(';');
        statements.push(sql);
    }
    Ok(statements)
}

fn render_table_ddl(state: &mut LiveState, schema_name: &str, table_name: &str) -> Result<String> {
    let object_name = format!("{}.{}", quote_ident(schema_name), quote_ident(table_name));
    let object_id_literal = quote_string(&format!("{schema_name}.{table_name}"));

    let columns_query = export_queries::COLUMN_DEFINITIONS_QUERY_TEMPLATE
        .replace("{object_id_literal}", &object_id_literal);
    let primary_key_query = export_queries::PRIMARY_KEY_QUERY_TEMPLATE
        .replace("{object_id_literal}", &object_id_literal);

    let column_rows = query_rows(state, &columns_query)?;
    if column_rows.is_empty() {
        return Err(execution_error(
            &columns_query,
            io::Error::other("table export produced no columns"),
        ));
    }

    let mut definitions = column_rows
        .iter()
        .map(|row| render_export_column(&parse_export_column(row)))
        .collect::<Vec<_>>();

    let primary_key_rows = query_rows(state, &primary_key_query)?;
    if let Some(first) = primary_key_rows.first() {
        let name = first.first().map(String::as_str).unwrap_or_default().trim();
        let columns = primary_key_rows
            .iter()
            .filter_map(|row| row.get(1))
            .map(|column| quote_ident(column.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = String::new();
        if !name.is_empty() {
            sql.push_str(&format!("CONSTRAINT {} ", quote_ident(name)));
        }
        sql.push_str(&format!("PRIMARY KEY ({columns})"));
        definitions.push(sql);
    }

    Ok(format!(
        "CREATE TABLE {object_name} (\n    {}\n);",
        definitions.join(",\n    ")
    ))
}

fn export_table_constraints(
    state: &mut LiveState,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<String>> {
    let object_name = format!("{}.{}", quote_ident(schema_name), quote_ident(table_name));
    let object_id_literal = quote_string(&format!("{schema_name}.{table_name}"));
    let mut statements = Vec::new();

    let checks_query = export_queries::CHECK_CONSTRAINTS_QUERY_TEMPLATE
        .replace("{object_id_literal}", &object_id_literal);
    for row in query_rows(state, &checks_query)? {
        let name = row.first().map(String::as_str).unwrap_or_default().trim();
        let definition = row.get(1).map(String::as_str).unwrap_or_default().trim();
        if name.is_empty() || definition.is_empty() {
            continue;
        }
        statements.push(format!(
            "ALTER TABLE {object_name} ADD CONSTRAINT {} CHECK {definition};",
            quote_ident(name)
        ));
    }

    statements.extend(export_foreign_keys(state, &object_name, &object_id_literal)?);
    statements.extend(export_indexes(state, &object_name, &object_id_literal)?);
    Ok(statements)
}

fn export_foreign_keys(
    state: &mut LiveState,
    object_name: &str,
    object_id_literal: &str,
) -> Result<Vec<String>> {
    let query = export_queries::FOREIGN_KEYS_QUERY_TEMPLATE
        .replace("{object_id_literal}", object_id_literal);
    let rows = query_rows(state, &query)?;

    // Rows are ordered by constraint then column position; fold the column
    // pairs of each constraint back together.
    let mut statements = Vec::new();
    let mut index = 0;
    while index < rows.len() {
        let name = rows[index][0].trim().to_string();
        let mut columns = Vec::new();
        let mut referenced_columns = Vec::new();
        let referenced_table = format!(
            "{}.{}",
            quote_ident(rows[index][2].trim()),
            quote_ident(rows[index][3].trim())
        );
        let on_delete = referential_action(rows[index].get(5));
        let on_update = referential_action(rows[index].get(6));
        while index < rows.len() && rows[index][0].trim() == name {
            columns.push(quote_ident(rows[index][1].trim()));
            referenced_columns.push(quote_ident(rows[index][4].trim()));
            index += 1;
        }

        let mut sql = format!(
            "ALTER TABLE {object_name} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {referenced_table} ({})",
            quote_ident(&name),
            columns.join(", "),
            referenced_columns.join(", ")
        );
        if let Some(action) = on_delete {
            sql.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = on_update {
            sql.push_str(&format!(" ON UPDATE {action}"));
        }
        sql.push(';');
        statements.push(sql);
    }
    Ok(statements)
}

fn export_indexes(
    state: &mut LiveState,
    object_name: &str,
    object_id_literal: &str,
) -> Result<Vec<String>> {
    let query =
        export_queries::INDEXES_QUERY_TEMPLATE.replace("{object_id_literal}", object_id_literal);
    let rows = query_rows(state, &query)?;

    let mut statements = Vec::new();
    let mut index = 0;
    while index < rows.len() {
        let name = rows[index][0].trim().to_string();
        let unique = rows[index].get(1).is_some_and(|value| value.trim() == "1");
        let unique_constraint = rows[index].get(2).is_some_and(|value| value.trim() == "1");
        let filter = rows[index]
            .get(3)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let mut elems = Vec::new();
        while index < rows.len() && rows[index][0].trim() == name {
            let mut elem = quote_ident(rows[index][4].trim());
            if rows[index].get(5).is_some_and(|value| value.trim() == "1") {
                elem.push_str(" DESC");
            }
            elems.push(elem);
            index += 1;
        }

        if unique_constraint {
            statements.push(format!(
                "ALTER TABLE {object_name} ADD CONSTRAINT {} UNIQUE ({});",
                quote_ident(&name),
                elems.join(", ")
            ));
            continue;
        }
        let keyword = if unique { "UNIQUE INDEX" } else { "INDEX" };
        let mut sql = format!(
            "CREATE {keyword} {} ON {object_name} ({})",
            quote_ident(&name),
            elems.join(", ")
        );
        if let Some(filter) = filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }
        sql.push(';');
        statements.push(sql);
    }
    Ok(statements)
}

fn export_module_definitions(state: &mut LiveState, query: &str) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for row in query_rows(state, query)? {
        let definition = row.first().map(String::as_str).unwrap_or_default().trim();
        if definition.is_empty() {
            continue;
        }
        statements.push(ensure_statement_terminated(definition));
    }
    Ok(statements)
}

fn parse_export_column(row: &[String]) -> ExportColumn {
    ExportColumn {
        name: row.first().cloned().unwrap_or_default().trim().to_string(),
        data_type: row.get(1).cloned().unwrap_or_default(),
        max_length: parse_i32_field(row.get(2)),
        precision: parse_i32_field(row.get(3)),
        scale: parse_i32_field(row.get(4)),
        not_null: row.get(5).is_some_and(|value| value.trim() == "0"),
        identity: row.get(6).is_some_and(|value| value.trim() == "1"),
        default: non_empty(row.get(7)),
        computed: non_empty(row.get(8)),
        persisted: row.get(9).is_some_and(|value| value.trim() == "1"),
    }
}

fn render_export_column(column: &ExportColumn) -> String {
    if let Some(computed) = &column.computed {
        let mut sql = format!("{} AS {computed}", quote_ident(&column.name));
        if column.persisted {
            sql.push_str(" PERSISTED");
        }
        return sql;
    }

    let mut sql = format!(
        "{} {}",
        quote_ident(&column.name),
        render_export_data_type(column)
    );
    if column.identity {
        sql.push_str(" IDENTITY(1,1)");
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(strip_wrapping_parens(default));
    }
    sql
}

fn render_export_data_type(column: &ExportColumn) -> String {
    let data_type = column.data_type.trim().to_ascii_lowercase();
    match data_type.as_str() {
        // max_length counts bytes; the n-types store two per character.
        "nvarchar" | "nchar" => {
            if column.max_length == -1 {
                format!("{data_type}(MAX)")
            } else {
                format!("{data_type}({})", (column.max_length / 2).max(1))
            }
        }
        "varchar" | "char" | "varbinary" | "binary" => {
            if column.max_length == -1 {
                format!("{data_type}(MAX)")
            } else {
                format!("{data_type}({})", column.max_length.max(1))
            }
        }
        "decimal" | "numeric" => {
            if column.precision > 0 {
                format!("{data_type}({}, {})", column.precision, column.scale.max(0))
            } else {
                data_type
            }
        }
        "datetime2" | "time" | "datetimeoffset" => {
            if column.scale > 0 {
                format!("{data_type}({})", column.scale)
            } else {
                data_type
            }
        }
        _ => data_type,
    }
}

// sys.default_constraints wraps definitions in one or two layers of
// parentheses: `((0))` for a literal zero.
fn strip_wrapping_parens(definition: &str) -> &str {
    let mut stripped = definition.trim();
    while let Some(inner) = stripped
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        if !parens_balanced(inner) {
            break;
        }
        stripped = inner.trim();
    }
    stripped
}

fn parens_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn referential_action(raw: Option<&String>) -> Option<&'static str> {
    match raw.map(|value| value.trim().to_ascii_uppercase())?.as_str() {
        "CASCADE" => Some("CASCADE"),
        "SET_NULL" => Some("SET NULL"),
        "SET_DEFAULT" => Some("SET DEFAULT"),
        _ => None,
    }
}

fn execute_live_sql(state: &mut LiveState, sql: &str) -> Result<()> {
    let LiveState { runtime, client } = state;

    runtime.block_on(async {
        let mut stream = client
            .simple_query(sql)
            .await
            .map_err(|source| execution_error(sql, source))?;
        while stream
            .try_next()
            .await
            .map_err(|source| execution_error(sql, source))?
            .is_some()
        {}
        Ok(())
    })
}

fn query_scalar_string(state: &mut LiveState, sql: &str) -> Result<String> {
    query_rows(state, sql)?
        .into_iter()
        .next()
        .and_then(|columns| columns.into_iter().next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| execution_error(sql, io::Error::other("query returned no rows")))
}

fn query_rows(state: &mut LiveState, sql: &str) -> Result<Vec<Vec<String>>> {
    let LiveState { runtime, client } = state;

    runtime.block_on(async {
        let mut stream = client
            .simple_query(sql)
            .await
            .map_err(|source| execution_error(sql, source))?;
        let mut rows = Vec::new();

        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|source| execution_error(sql, source))?
        {
            if let QueryItem::Row(row) = item {
                let mut values = Vec::with_capacity(row.columns().len());
                for index in 0..row.columns().len() {
                    values.push(
                        row.get::<&str, usize>(index)
                            .unwrap_or_default()
                            .to_string(),
                    );
                }
                rows.push(values);
            }
        }

        Ok(rows)
    })
}

fn ensure_statement_terminated(sql: &str) -> String {
    if sql.ends_with(';') {
        sql.to_string()
    } else {
        format!("{sql};")
    }
}

fn parse_i32_field(raw: Option<&String>) -> i32 {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or_default()
}

fn non_empty(raw: Option<&String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn parse_major_version(raw: &str) -> Option<u16> {
    let digits = raw
        .split_whitespace()
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn ensure_minimum_version(raw_version: &str) -> Result<()> {
    let major = parse_major_version(raw_version).ok_or_else(|| {
        execution_error(
            export_queries::SHOW_SERVER_VERSION_QUERY,
            io::Error::other(format!(
                "failed to parse mssql server version string: `{raw_version}`"
            )),
        )
    })?;
    let supported = if major >= YEAR_VERSION_THRESHOLD {
        major >= MINIMUM_YEAR_VERSION
    } else {
        major >= MINIMUM_PRODUCT_MAJOR_VERSION
    };
    if supported {
        return Ok(());
    }
    Err(execution_error(
        export_queries::SHOW_SERVER_VERSION_QUERY,
        io::Error::other(format!(
            "mssql server version `{raw_version}` is not supported; requires SQL Server 2019+"
        )),
    ))
}

fn quote_ident(identifier: &str) -> String {
    format!("[{}]", identifier.replace(']', "]]"))
}

fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
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

    fn string_row(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn version_gate_accepts_both_version_schemes() {
        assert!(ensure_minimum_version("15.0.2000.5").is_ok());
        assert!(ensure_minimum_version("2019.150.2000.5").is_ok());
        assert!(ensure_minimum_version("14.0.1000.169").is_err());
        assert!(ensure_minimum_version("2017.140.1000.169").is_err());
        assert!(ensure_minimum_version("junk").is_err());
    }

    #[test]
    fn nvarchar_lengths_halve_the_byte_count() {
        let row = string_row(&["name", "nvarchar", "200", "0", "0", "1", "0", "", "", "0"]);
        let column = parse_export_column(&row);
        assert_eq!(render_export_data_type(&column), "nvarchar(100)");

        let row = string_row(&["body", "nvarchar", "-1", "0", "0", "1", "0", "", "", "0"]);
        let column = parse_export_column(&row);
        assert_eq!(render_export_data_type(&column), "nvarchar(MAX)");
    }

    #[test]
    fn default_definitions_lose_their_catalog_parens() {
        assert_eq!(strip_wrapping_parens("((0))"), "0");
        assert_eq!(strip_wrapping_parens("(getdate())"), "getdate()");
        // A concatenation of two parenthesized terms keeps its parens.
        assert_eq!(strip_wrapping_parens("(1)+(2)"), "(1)+(2)");
    }

    #[test]
    fn identity_columns_render_inline() {
        let row = string_row(&["id", "bigint", "8", "19", "0", "0", "1", "", "", "0"]);
        let column = parse_export_column(&row);
        assert_eq!(
            render_export_column(&column),
            "[id] bigint IDENTITY(1,1) NOT NULL"
        );
    }

    #[test]
    fn bracket_quoting_escapes_closing_brackets() {
        assert_eq!(quote_ident("weird]name"), "[weird]]name]");
    }
}
