//! Parsing with a server-grammar fallback. The shared grammar covers the DDL
//! the diff engine understands; real-world dumps also carry SETs, COMMENTs,
//! COPY blocks and function bodies. When the native parse fails, the script
//! is re-split with `pg_query` (the server's own parser), statements the
//! model does not track are dropped, and the rest is parsed one by one.

use pg_query::protobuf::node::Node as NodeEnum;
use sqldrift_core::ast::Statement;
use sqldrift_core::parser::{parse_sql, GrammarProfile};
use sqldrift_core::{ParseError, Result};

pub(crate) fn parse_script(sql: &str, grammar: &GrammarProfile) -> Result<Vec<Statement>> {
    let native_error = match parse_sql(sql, grammar) {
        Ok(statements) => return Ok(statements),
        Err(error) => error,
    };

    let Ok(pieces) = pg_query::split_with_parser(sql) else {
        // Not valid PostgreSQL either; the native diagnostic has the better
        // line/column information.
        return Err(native_error);
    };
    tracing::debug!(
        statements = pieces.len(),
        "native parse failed, retrying per statement via server grammar"
    );

    let mut statements = Vec::with_capacity(pieces.len());
    for (index, piece) in pieces.iter().enumerate() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match parse_sql(piece, grammar) {
            Ok(parsed) => statements.extend(parsed),
            Err(error) => {
                if is_ignorable(piece) {
                    tracing::debug!(statement = %summary(piece), "skipping non-schema statement");
                    continue;
                }
                return Err(match error {
                    sqldrift_core::Error::Parse(ParseError::Syntax {
                        line,
                        column,
                        message,
                        ..
                    }) => ParseError::StatementConversion {
                        statement_index: index,
                        message: format!("line {line}, column {column}: {message}"),
                        statement: piece.to_string(),
                    }
                    .into(),
                    other => other,
                });
            }
        }
    }
    Ok(statements)
}

/// Statements the schema model has no representation for. They change data
/// or session state, not schema shape, so a dump containing them still
/// describes the same schema without them.
fn is_ignorable(sql: &str) -> bool {
    let Ok(parsed) = pg_query::parse(sql) else {
        return false;
    };
    parsed.protobuf.stmts.iter().all(|raw| {
        matches!(
            raw.stmt.as_ref().and_then(|stmt| stmt.node.as_ref()),
            Some(
                NodeEnum::SelectStmt(_)
                    | NodeEnum::InsertStmt(_)
                    | NodeEnum::UpdateStmt(_)
                    | NodeEnum::DeleteStmt(_)
                    | NodeEnum::VariableSetStmt(_)
                    | NodeEnum::CommentStmt(_)
                    | NodeEnum::CopyStmt(_)
                    | NodeEnum::DoStmt(_)
                    | NodeEnum::TransactionStmt(_)
                    | NodeEnum::CreateFunctionStmt(_)
            )
        )
    })
}

fn summary(sql: &str) -> &str {
    let end = sql.len().min(60);
    let mut end = end;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_ddl_takes_the_native_path() {
        let statements = parse_script(
            "CREATE TABLE t (id bigint NOT NULL);",
            &GrammarProfile::postgres(),
        )
        .expect("should parse");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn dump_noise_is_dropped_in_the_fallback_path() {
        let sql = "SET statement_timeout = 0;\n\
                   COMMENT ON SCHEMA public IS 'standard public schema';\n\
                   CREATE TABLE users (id bigint NOT NULL);\n\
                   INSERT INTO users VALUES (1);";
        let statements =
            parse_script(sql, &GrammarProfile::postgres()).expect("should parse");
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Statement::CreateTable(_)));
    }

    #[test]
    fn function_bodies_do_not_break_the_split() {
        let sql = "CREATE FUNCTION bump() RETURNS trigger AS $$\n\
                   BEGIN NEW.updated_at := now(); RETURN NEW; END;\n\
                   $$ LANGUAGE plpgsql;\n\
                   CREATE TABLE t (id bigint);";
        let statements =
            parse_script(sql, &GrammarProfile::postgres()).expect("should parse");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn garbage_reports_the_native_diagnostic() {
        let error = parse_script("CREATE TABLE (", &GrammarProfile::postgres())
            .expect_err("must fail");
        assert!(matches!(error, sqldrift_core::Error::Parse(_)));
    }
}
