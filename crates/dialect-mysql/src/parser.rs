//! Parsing with an ecosystem-grammar fallback. The shared grammar covers the
//! DDL the diff engine understands; `mysqldump` output also carries session
//! SETs, data statements and view headers like `ALGORITHM=UNDEFINED
//! DEFINER=... SQL SECURITY DEFINER`. When the native parse fails, the script
//! is retried through sqlparser's MySQL grammar: views are converted
//! directly, data and session statements are dropped, and everything else is
//! re-parsed from its canonical spelling.

use sqlparser::ast::{self as sp, CreateViewSecurity, ObjectName};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use sqldrift_core::ast::{CreateView, Statement, ViewSecurity};
use sqldrift_core::parser::{parse_sql, GrammarProfile};
use sqldrift_core::{Ident, ParseError, QualifiedName, Result};

pub(crate) fn parse_script(sql: &str, grammar: &GrammarProfile) -> Result<Vec<Statement>> {
    let native_error = match parse_sql(sql, grammar) {
        Ok(statements) => return Ok(statements),
        Err(error) => error,
    };

    let Ok(parsed) = Parser::parse_sql(&MySqlDialect {}, sql) else {
        // Not valid MySQL either; the native diagnostic has the better
        // line/column information.
        return Err(native_error);
    };
    tracing::debug!(
        statements = parsed.len(),
        "native parse failed, retrying per statement via sqlparser"
    );

    let mut statements = Vec::with_capacity(parsed.len());
    for (index, statement) in parsed.iter().enumerate() {
        if let sp::Statement::CreateView(view) = statement {
            statements.push(convert_view(view, index)?);
            continue;
        }
        // sqlparser's Display is clean canonical DDL; reparse it natively.
        let canonical = format!("{statement};");
        if is_ignorable(&canonical) {
            tracing::debug!(statement = %kind(&canonical), "skipping non-schema statement");
            continue;
        }
        match parse_sql(&canonical, grammar) {
            Ok(parsed) => statements.extend(parsed),
            Err(_) => {
                return Err(conversion_error(
                    index,
                    format!("unsupported mysql statement kind: {}", kind(&canonical)),
                    canonical,
                ));
            }
        }
    }
    Ok(statements)
}

fn convert_view(view: &sp::CreateView, index: usize) -> Result<Statement> {
    if view.materialized || view.temporary || view.to.is_some() || view.with_no_schema_binding {
        return Err(conversion_error(
            index,
            "unsupported CREATE VIEW variant".to_string(),
            view.to_string(),
        ));
    }

    Ok(Statement::CreateView(CreateView {
        name: object_name(&view.name, index)?,
        or_replace: view.or_replace,
        materialized: false,
        columns: view
            .columns
            .iter()
            .map(|column| ident(&column.name))
            .collect(),
        query: view.query.to_string(),
        // ALGORITHM= and DEFINER= are display noise from SHOW CREATE VIEW;
        // only the security mode participates in comparison.
        security: view
            .params
            .as_ref()
            .and_then(|params| params.security.as_ref())
            .map(|security| match security {
                CreateViewSecurity::Definer => ViewSecurity::Definer,
                CreateViewSecurity::Invoker => ViewSecurity::Invoker,
            }),
    }))
}

fn object_name(name: &ObjectName, index: usize) -> Result<QualifiedName> {
    let parts = name
        .0
        .iter()
        .map(|part| part.as_ident().map(ident))
        .collect::<Option<Vec<_>>>()
        .filter(|parts| matches!(parts.len(), 1 | 2))
        .ok_or_else(|| {
            conversion_error(
                index,
                format!("unsupported qualified name in CREATE VIEW: {name}"),
                name.to_string(),
            )
        })?;

    let mut parts = parts.into_iter();
    let first = parts.next().unwrap_or_else(|| Ident::unquoted(""));
    Ok(match parts.next() {
        Some(second) => QualifiedName {
            schema: Some(first),
            name: second,
        },
        None => QualifiedName {
            schema: None,
            name: first,
        },
    })
}

fn ident(ident: &sp::Ident) -> Ident {
    if ident.quote_style.is_some() {
        Ident::quoted(ident.value.clone())
    } else {
        Ident::unquoted(ident.value.clone())
    }
}

/// Statements that change data or session state, not schema shape. A dump
/// containing them still describes the same schema without them.
fn is_ignorable(canonical: &str) -> bool {
    let first = canonical
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first.as_str(),
        "SELECT" | "INSERT" | "UPDATE" | "DELETE" | "SET" | "USE" | "LOCK" | "UNLOCK" | "START"
            | "BEGIN" | "COMMIT" | "ROLLBACK"
    )
}

fn kind(canonical: &str) -> String {
    canonical
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

fn conversion_error(index: usize, message: String, statement: String) -> sqldrift_core::Error {
    ParseError::StatementConversion {
        statement_index: index,
        message,
        statement,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_ddl_takes_the_native_path() {
        let statements = parse_script(
            "CREATE TABLE t (id bigint NOT NULL);",
            &GrammarProfile::mysql(),
        )
        .expect("should parse");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn dump_view_headers_convert_through_the_fallback() {
        let sql = "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER \
                   VIEW `active_users` AS select `id` from `users` where `active` = 1;";
        let statements = parse_script(sql, &GrammarProfile::mysql()).expect("should parse");
        assert_eq!(statements.len(), 1);
        let Statement::CreateView(view) = &statements[0] else {
            panic!("expected CREATE VIEW");
        };
        assert_eq!(view.name.name.value, "active_users");
        assert_eq!(view.security, Some(ViewSecurity::Definer));
    }

    #[test]
    fn dump_noise_is_dropped_in_the_fallback_path() {
        let sql = "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER \
                   VIEW `v` AS select `id` from `t`;\n\
                   INSERT INTO t VALUES (1);";
        let statements = parse_script(sql, &GrammarProfile::mysql()).expect("should parse");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn garbage_reports_the_native_diagnostic() {
        let error =
            parse_script("CREATE TABLE (", &GrammarProfile::mysql()).expect_err("must fail");
        assert!(matches!(error, sqldrift_core::Error::Parse(_)));
    }
}
