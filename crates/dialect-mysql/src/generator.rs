//! Turns migration operations into MySQL DDL. Column changes are full
//! `MODIFY COLUMN` restatements because that is the only ALTER shape MySQL
//! offers; optional `ALGORITHM=`/`LOCK=` hints are appended to every ALTER
//! TABLE so online DDL behavior can be pinned.

use sqldrift_core::ast::{ColumnPosition, PrivilegeStatement, ViewSecurity};
use sqldrift_core::diff::DiffOp;
use sqldrift_core::model::{Index, Table, Trigger, View};
use sqldrift_core::{
    MigrationStatement, QualifiedName, Result, UnsupportedError, Value,
};

use crate::to_sql::{
    check_sql, column_sql, foreign_key_sql, index_elems_sql, primary_key_sql, quote_ident,
    quote_name, quote_string, unique_sql,
};

const DIALECT: &str = "mysql";

/// `ALGORITHM=` / `LOCK=` clauses appended to ALTER TABLE statements.
#[derive(Debug, Clone, Default)]
pub struct AlterHints {
    pub algorithm: Option<String>,
    pub lock: Option<String>,
}

impl AlterHints {
    fn suffix(&self) -> String {
        let mut suffix = String::new();
        if let Some(algorithm) = &self.algorithm {
            suffix.push_str(", ALGORITHM=");
            suffix.push_str(algorithm);
        }
        if let Some(lock) = &self.lock {
            suffix.push_str(", LOCK=");
            suffix.push_str(lock);
        }
        suffix
    }
}

pub(crate) fn render_op(op: &DiffOp, hints: &AlterHints) -> Result<Vec<MigrationStatement>> {
    let statements = match op {
        DiffOp::CreateTable(table) => single(create_table_sql(table)),
        DiffOp::DropTable { name } => single(format!("DROP TABLE {}", quote_name(name))),
        DiffOp::AddColumn {
            table,
            column,
            position,
        } => {
            let mut sql = format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_name(table),
                column_sql(column)
            );
            match position {
                Some(ColumnPosition::First) => sql.push_str(" FIRST"),
                Some(ColumnPosition::After(name)) => {
                    sql.push_str(" AFTER ");
                    sql.push_str(&quote_ident(name));
                }
                None => {}
            }
            single(alter(sql, hints))
        }
        DiffOp::DropColumn { table, name } => single(alter(
            format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quote_name(table),
                quote_ident(name)
            ),
            hints,
        )),
        DiffOp::ChangeColumn { table, to, .. } => single(alter(
            format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                quote_name(table),
                column_sql(to)
            ),
            hints,
        )),
        DiffOp::AddPrimaryKey { table, primary_key } => single(alter(
            format!(
                "ALTER TABLE {} ADD {}",
                quote_name(table),
                primary_key_sql(primary_key)
            ),
            hints,
        )),
        DiffOp::DropPrimaryKey { table, .. } => single(alter(
            format!("ALTER TABLE {} DROP PRIMARY KEY", quote_name(table)),
            hints,
        )),
        DiffOp::AddUnique { table, unique } => single(alter(
            format!(
                "ALTER TABLE {} ADD {}",
                quote_name(table),
                unique_sql(unique)
            ),
            hints,
        )),
        DiffOp::DropUnique { table, name } => single(drop_index(table, name, hints)),
        DiffOp::AddCheck { table, check } => single(alter(
            format!(
                "ALTER TABLE {} ADD {}",
                quote_name(table),
                check_sql(check)
            ),
            hints,
        )),
        DiffOp::DropCheck { table, name } => single(alter(
            format!(
                "ALTER TABLE {} DROP CHECK {}",
                quote_name(table),
                quote_ident(name)
            ),
            hints,
        )),
        DiffOp::AddForeignKey { table, foreign_key } => single(alter(
            format!(
                "ALTER TABLE {} ADD {}",
                quote_name(table),
                foreign_key_sql(foreign_key)
            ),
            hints,
        )),
        DiffOp::DropForeignKey { table, name } => single(alter(
            format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                quote_name(table),
                quote_ident(name)
            ),
            hints,
        )),
        DiffOp::CreateIndex { table, index } => single(create_index_sql(table, index)),
        DiffOp::DropIndex { table, name } => single(drop_index(table, name, hints)),
        DiffOp::SetTableOption { table, option } => {
            let value = match &option.value {
                Value::String(value) => quote_string(value),
                other => other.to_string(),
            };
            single(alter(
                format!("ALTER TABLE {} {}={value}", quote_name(table), option.name),
                hints,
            ))
        }
        DiffOp::SetPartition { table, partition } => match partition {
            Some(partition) => single(format!(
                "ALTER TABLE {} {partition}",
                quote_name(table)
            )),
            None => single(format!(
                "ALTER TABLE {} REMOVE PARTITIONING",
                quote_name(table)
            )),
        },
        DiffOp::CreateView(view) => single(create_view_sql("CREATE", view)?),
        DiffOp::ReplaceView(view) => single(create_view_sql("CREATE OR REPLACE", view)?),
        DiffOp::DropView { name, materialized } => {
            if *materialized {
                return Err(
                    UnsupportedError::new(DIALECT, "materialized views").into()
                );
            }
            single(format!("DROP VIEW {}", quote_name(name)))
        }
        DiffOp::CreateTrigger(trigger) => single(create_trigger_sql(trigger)),
        DiffOp::DropTrigger { name, .. } => {
            single(format!("DROP TRIGGER {}", quote_ident(name)))
        }
        DiffOp::Grant(privilege) => single(privilege_sql("GRANT", "TO", privilege)),
        DiffOp::Revoke(privilege) => single(privilege_sql("REVOKE", "FROM", privilege)),
        DiffOp::CreateSchema { .. } => {
            return Err(UnsupportedError::new(DIALECT, "CREATE SCHEMA").into());
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
    };
    Ok(statements)
}

fn single(sql: String) -> Vec<MigrationStatement> {
    vec![MigrationStatement::new(sql)]
}

fn alter(sql: String, hints: &AlterHints) -> String {
    format!("{sql}{}", hints.suffix())
}

fn create_table_sql(table: &Table) -> String {
    let mut lines = table.columns.iter().map(column_sql).collect::<Vec<_>>();
    if let Some(pk) = &table.primary_key {
        lines.push(primary_key_sql(pk));
    }
    lines.extend(table.uniques.iter().map(unique_sql));
    lines.extend(table.checks.iter().map(check_sql));
    lines.extend(table.foreign_keys.iter().map(foreign_key_sql));

    let mut sql = format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_name(&table.name),
        lines.join(",\n    ")
    );
    for option in &table.options {
        let value = match &option.value {
            Value::String(value) if option.name.eq_ignore_ascii_case("comment") => {
                quote_string(value)
            }
            other => other.to_string(),
        };
        sql.push_str(&format!(" {}={value}", option.name));
    }
    if let Some(partition) = &table.partition {
        sql.push(' ');
        sql.push_str(partition);
    }
    sql
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
    if let Some(method) = &index.method {
        sql.push_str(" USING ");
        sql.push_str(method);
    }
    sql
}

fn drop_index(table: &QualifiedName, name: &sqldrift_core::Ident, hints: &AlterHints) -> String {
    alter(
        format!(
            "ALTER TABLE {} DROP INDEX {}",
            quote_name(table),
            quote_ident(name)
        ),
        hints,
    )
}

fn create_view_sql(verb: &str, view: &View) -> Result<String> {
    if view.materialized {
        return Err(UnsupportedError::new(DIALECT, "materialized views").into());
    }
    let mut sql = String::from(verb);
    match view.security {
        Some(ViewSecurity::Definer) => sql.push_str(" SQL SECURITY DEFINER"),
        Some(ViewSecurity::Invoker) => sql.push_str(" SQL SECURITY INVOKER"),
        None => {}
    }
    sql.push_str(" VIEW ");
    sql.push_str(&quote_name(&view.name));
    if !view.columns.is_empty() {
        let columns = view
            .columns
            .iter()
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ({columns})"));
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

fn privilege_sql(verb: &str, connector: &str, privilege: &PrivilegeStatement) -> String {
    let grantees = privilege
        .grantees
        .iter()
        .map(|grantee| quote_string(&grantee.value))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{verb} {} ON {} {connector} {grantees}",
        privilege.privileges.join(", "),
        quote_name(&privilege.object)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldrift_core::builder::{build_schema, BuildOptions};
    use sqldrift_core::diff::{diff_schemas, DiffOptions};
    use sqldrift_core::model::SchemaModel;
    use sqldrift_core::order::sort_ops;
    use sqldrift_core::parser::{parse_sql, GrammarProfile};

    use crate::equivalence::MYSQL_EQUIVALENCE;

    fn model(sql: &str) -> SchemaModel {
        let statements = parse_sql(sql, &GrammarProfile::mysql()).expect("should parse");
        build_schema(statements, &BuildOptions::default()).expect("should build")
    }

    fn generate(current: &str, desired: &str, options: &DiffOptions) -> Vec<String> {
        let outcome = diff_schemas(&model(current), &model(desired), &MYSQL_EQUIVALENCE, options);
        sort_ops(outcome.ops)
            .iter()
            .flat_map(|op| render_op(op, &AlterHints::default()).expect("should render"))
            .map(|statement| statement.sql)
            .collect()
    }

    #[test]
    fn column_change_is_one_modify_statement() {
        let sql = generate(
            "CREATE TABLE t (name varchar(100));",
            "CREATE TABLE t (name varchar(200) NOT NULL DEFAULT 'x');",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE `t` MODIFY COLUMN `name` varchar(200) NOT NULL DEFAULT 'x'"]
        );
    }

    #[test]
    fn added_column_keeps_its_declared_position() {
        let sql = generate(
            "CREATE TABLE t (a int, c int);",
            "CREATE TABLE t (a int, b int, c int);",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE `t` ADD COLUMN `b` int AFTER `a`"]
        );
    }

    #[test]
    fn alter_hints_are_appended() {
        let hints = AlterHints {
            algorithm: Some("INPLACE".to_string()),
            lock: Some("NONE".to_string()),
        };
        let statements = render_op(
            &DiffOp::DropColumn {
                table: QualifiedName::bare("t"),
                name: sqldrift_core::Ident::unquoted("a"),
            },
            &hints,
        )
        .expect("should render");
        assert_eq!(
            statements[0].sql,
            "ALTER TABLE `t` DROP COLUMN `a`, ALGORITHM=INPLACE, LOCK=NONE"
        );
    }

    #[test]
    fn auto_increment_and_comment_render_in_order() {
        let sql = generate(
            "",
            "CREATE TABLE t (id bigint NOT NULL AUTO_INCREMENT COMMENT 'pk', PRIMARY KEY (id));",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE `t` (\n    `id` bigint NOT NULL AUTO_INCREMENT COMMENT 'pk',\n    PRIMARY KEY (`id`)\n)"
            ]
        );
    }

    #[test]
    fn sequences_are_rejected() {
        let error = render_op(
            &DiffOp::DropSequence {
                name: QualifiedName::bare("s"),
            },
            &AlterHints::default(),
        )
        .expect_err("must fail");
        assert!(error.to_string().contains("sequences"));
    }
}
