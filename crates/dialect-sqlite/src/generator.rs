//! Turns migration operations into SQLite DDL. SQLite's ALTER surface is
//! deliberately small; anything it cannot express without rebuilding the
//! table comes back as an error instead of silently wrong DDL.

use sqldrift_core::diff::DiffOp;
use sqldrift_core::model::{Index, Table, Trigger, View};
use sqldrift_core::{MigrationStatement, QualifiedName, Result, UnsupportedError};

use crate::to_sql::{
    check_sql, column_sql, expr_sql, foreign_key_sql, ident_list, index_elems_sql,
    primary_key_sql, quote_ident, quote_name, unique_sql,
};

const DIALECT: &str = "sqlite";

pub(crate) fn render_op(op: &DiffOp) -> Result<Vec<MigrationStatement>> {
    let statements = match op {
        DiffOp::CreateTable(table) => single(create_table_sql(table)),
        DiffOp::DropTable { name } => single(format!("DROP TABLE {}", quote_name(name))),
        DiffOp::AddColumn { table, column, .. } => {
            // ADD COLUMN always appends; positions are a MySQL notion.
            single(format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_name(table),
                column_sql(column)
            ))
        }
        DiffOp::DropColumn { table, name } => single(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_name(table),
            quote_ident(name)
        )),
        DiffOp::CreateIndex { table, index } => single(create_index_sql(table, index)),
        DiffOp::DropIndex { name, .. } => {
            single(format!("DROP INDEX {}", quote_ident(name)))
        }
        DiffOp::CreateView(view) => single(create_view_sql(view)?),
        DiffOp::DropView { name, materialized } => {
            if *materialized {
                return Err(UnsupportedError::new(DIALECT, "materialized views").into());
            }
            single(format!("DROP VIEW {}", quote_name(name)))
        }
        DiffOp::CreateTrigger(trigger) => single(create_trigger_sql(trigger)),
        DiffOp::DropTrigger { name, .. } => {
            single(format!("DROP TRIGGER {}", quote_ident(name)))
        }
        DiffOp::ChangeColumn { table, to, .. } => {
            return Err(UnsupportedError::new(
                DIALECT,
                format!(
                    "changing column {} on table {} requires recreating the table",
                    to.name.value, table
                ),
            )
            .into());
        }
        DiffOp::AddPrimaryKey { table, .. } | DiffOp::DropPrimaryKey { table, .. } => {
            return Err(constraint_change_error("primary key", table));
        }
        DiffOp::AddUnique { table, .. } | DiffOp::DropUnique { table, .. } => {
            return Err(constraint_change_error("unique constraint", table));
        }
        DiffOp::AddCheck { table, .. } | DiffOp::DropCheck { table, .. } => {
            return Err(constraint_change_error("check constraint", table));
        }
        DiffOp::AddForeignKey { table, .. } | DiffOp::DropForeignKey { table, .. } => {
            return Err(constraint_change_error("foreign key", table));
        }
        DiffOp::SetTableOption { .. } | DiffOp::SetPartition { .. } => {
            return Err(UnsupportedError::new(DIALECT, "table options and partitioning").into());
        }
        DiffOp::ReplaceView(_) => {
            return Err(UnsupportedError::new(DIALECT, "CREATE OR REPLACE VIEW").into());
        }
        DiffOp::CreateSchema { .. } => {
            return Err(UnsupportedError::new(DIALECT, "schemas").into());
        }
        DiffOp::CreateExtension { .. } | DiffOp::DropExtension { .. } => {
            return Err(UnsupportedError::new(DIALECT, "extensions").into());
        }
        DiffOp::CreateEnum(_) | DiffOp::AddEnumValue { .. } | DiffOp::DropEnum { .. } => {
            return Err(UnsupportedError::new(DIALECT, "enum types").into());
        }
        DiffOp::CreateSequence(_) | DiffOp::AlterSequence(_) | DiffOp::DropSequence { .. } => {
            return Err(UnsupportedError::new(DIALECT, "sequences").into());
        }
        DiffOp::CreatePolicy(_) | DiffOp::DropPolicy { .. } => {
            return Err(UnsupportedError::new(DIALECT, "row-level security policies").into());
        }
        DiffOp::Grant(_) | DiffOp::Revoke(_) => {
            return Err(UnsupportedError::new(DIALECT, "privileges").into());
        }
    };
    Ok(statements)
}

fn single(sql: String) -> Vec<MigrationStatement> {
    vec![MigrationStatement::new(sql)]
}

fn constraint_change_error(kind: &str, table: &QualifiedName) -> sqldrift_core::Error {
    UnsupportedError::new(
        DIALECT,
        format!("altering a {kind} on table {table} requires recreating the table"),
    )
    .into()
}

fn create_table_sql(table: &Table) -> String {
    let mut lines = table.columns.iter().map(column_sql).collect::<Vec<_>>();
    if let Some(pk) = &table.primary_key {
        lines.push(primary_key_sql(pk));
    }
    lines.extend(table.uniques.iter().map(unique_sql));
    lines.extend(table.checks.iter().map(check_sql));
    lines.extend(table.foreign_keys.iter().map(foreign_key_sql));

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_name(&table.name),
        lines.join(",\n    ")
    )
}

fn create_index_sql(table: &QualifiedName, index: &Index) -> String {
    let mut sql = String::from("CREATE ");
    if index.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    sql.push_str(&quote_ident(&index.name));
    sql.push_str(" ON ");
    sql.push_str(&quote_name(table));
    sql.push_str(" (");
    sql.push_str(&index_elems_sql(&index.columns));
    sql.push(')');
    if let Some(predicate) = &index.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&expr_sql(predicate));
    }
    sql
}

fn create_view_sql(view: &View) -> Result<String> {
    if view.materialized {
        return Err(UnsupportedError::new(DIALECT, "materialized views").into());
    }
    let mut sql = format!("CREATE VIEW {}", quote_name(&view.name));
    if !view.columns.is_empty() {
        sql.push_str(&format!(" ({})", ident_list(&view.columns)));
    }
    sql.push_str(" AS ");
    sql.push_str(&view.query);
    Ok(sql)
}

fn create_trigger_sql(trigger: &Trigger) -> String {
    let mut sql = format!(
        "CREATE TRIGGER {} {} {} ON {}",
        quote_ident(&trigger.name),
        trigger.timing,
        trigger.events.join(" OR "),
        quote_name(&trigger.table)
    );
    if trigger.for_each_row {
        sql.push_str(" FOR EACH ROW");
    }
    sql.push(' ');
    sql.push_str(&trigger.body);
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldrift_core::builder::{build_schema, BuildOptions};
    use sqldrift_core::diff::{diff_schemas, DiffOptions};
    use sqldrift_core::model::SchemaModel;
    use sqldrift_core::order::sort_ops;
    use sqldrift_core::parser::{parse_sql, GrammarProfile};

    use crate::equivalence::SQLITE_EQUIVALENCE;

    fn model(sql: &str) -> SchemaModel {
        let statements = parse_sql(sql, &GrammarProfile::sqlite()).expect("should parse");
        build_schema(statements, &BuildOptions::default()).expect("should build")
    }

    fn generate(current: &str, desired: &str, options: &DiffOptions) -> Result<Vec<String>> {
        let outcome =
            diff_schemas(&model(current), &model(desired), &SQLITE_EQUIVALENCE, options);
        let mut statements = Vec::new();
        for op in sort_ops(outcome.ops) {
            statements.extend(render_op(&op)?.into_iter().map(|statement| statement.sql));
        }
        Ok(statements)
    }

    #[test]
    fn add_and_drop_column_are_supported() {
        let sql = generate(
            "CREATE TABLE t (id integer, old text);",
            "CREATE TABLE t (id integer, added text);",
            &DiffOptions {
                enable_drop: true,
                ..DiffOptions::default()
            },
        )
        .expect("should generate");
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"t\" DROP COLUMN \"old\"",
                "ALTER TABLE \"t\" ADD COLUMN \"added\" text",
            ]
        );
    }

    #[test]
    fn column_type_change_is_rejected() {
        let error = generate(
            "CREATE TABLE t (v text);",
            "CREATE TABLE t (v integer);",
            &DiffOptions::default(),
        )
        .expect_err("must fail");
        assert!(error.to_string().contains("recreating the table"));
    }

    #[test]
    fn partial_indexes_render_their_predicate() {
        let sql = generate(
            "CREATE TABLE t (id integer, deleted integer);",
            "CREATE TABLE t (id integer, deleted integer);
             CREATE INDEX idx_t_live ON t (id) WHERE deleted = 0;",
            &DiffOptions::default(),
        )
        .expect("should generate");
        assert_eq!(
            sql,
            vec!["CREATE INDEX \"idx_t_live\" ON \"t\" (\"id\") WHERE \"deleted\" = 0"]
        );
    }
}
