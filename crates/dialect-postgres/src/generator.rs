//! Turns migration operations into PostgreSQL DDL. One statement per
//! logical change; `CREATE INDEX CONCURRENTLY` is flagged non-transactional
//! so the executor runs it outside the surrounding transaction.

use sqldrift_core::ast::{CreateSequence, PrivilegeStatement};
use sqldrift_core::diff::{ColumnChange, DiffOp};
use sqldrift_core::model::{Index, Table, Trigger, View};
use sqldrift_core::{
    Ident, MigrationStatement, QualifiedName, Result, UnsupportedError,
};

use crate::to_sql::{
    check_sql, column_sql, expr_sql, foreign_key_sql, ident_list, index_elems_sql,
    primary_key_sql, quote_ident, quote_name, quote_string, unique_sql,
};

const DIALECT: &str = "postgres";

pub(crate) fn render_op(op: &DiffOp) -> Result<Vec<MigrationStatement>> {
    let statements = match op {
        DiffOp::CreateSchema { name } => single(format!("CREATE SCHEMA {}", quote_ident(name))),
        DiffOp::CreateExtension { name } => {
            single(format!("CREATE EXTENSION {}", quote_ident(name)))
        }
        DiffOp::DropExtension { name } => single(format!("DROP EXTENSION {}", quote_ident(name))),
        DiffOp::CreateEnum(enum_type) => {
            let values = enum_type
                .values
                .iter()
                .map(|value| quote_string(value))
                .collect::<Vec<_>>()
                .join(", ");
            single(format!(
                "CREATE TYPE {} AS ENUM ({values})",
                quote_name(&enum_type.name)
            ))
        }
        DiffOp::AddEnumValue {
            name,
            value,
            before,
        } => {
            let mut sql = format!(
                "ALTER TYPE {} ADD VALUE {}",
                quote_name(name),
                quote_string(value)
            );
            if let Some(before) = before {
                sql.push_str(" BEFORE ");
                sql.push_str(&quote_string(before));
            }
            single(sql)
        }
        DiffOp::DropEnum { name } => single(format!("DROP TYPE {}", quote_name(name))),
        DiffOp::CreateSequence(sequence) => single(format!(
            "CREATE SEQUENCE {}{}",
            quote_name(&sequence.name),
            sequence_clauses(sequence, false)
        )),
        DiffOp::AlterSequence(sequence) => single(format!(
            "ALTER SEQUENCE {}{}",
            quote_name(&sequence.name),
            sequence_clauses(sequence, true)
        )),
        DiffOp::DropSequence { name } => single(format!("DROP SEQUENCE {}", quote_name(name))),
        DiffOp::CreateTable(table) => single(create_table_sql(table)),
        DiffOp::DropTable { name } => single(format!("DROP TABLE {}", quote_name(name))),
        DiffOp::AddColumn { table, column, .. } => {
            // Column position is a MySQL notion; PostgreSQL appends.
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
        DiffOp::ChangeColumn {
            table,
            to,
            changes,
            ..
        } => change_column(table, to, changes)?,
        DiffOp::AddPrimaryKey { table, primary_key } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            primary_key_sql(primary_key)
        )),
        DiffOp::DropPrimaryKey { table, name } => {
            let name = name
                .clone()
                .unwrap_or_else(|| Ident::unquoted(format!("{}_pkey", table.name.value)));
            single(drop_constraint_sql(table, &name))
        }
        DiffOp::AddUnique { table, unique } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            unique_sql(unique)
        )),
        DiffOp::DropUnique { table, name } => single(drop_constraint_sql(table, name)),
        DiffOp::AddCheck { table, check } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            check_sql(check)
        )),
        DiffOp::DropCheck { table, name } => single(drop_constraint_sql(table, name)),
        DiffOp::AddForeignKey { table, foreign_key } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            foreign_key_sql(foreign_key)
        )),
        DiffOp::DropForeignKey { table, name } => single(drop_constraint_sql(table, name)),
        DiffOp::CreateIndex { table, index } => vec![create_index(table, index)],
        DiffOp::DropIndex { table, name } => {
            // Indexes live in the table's schema.
            let qualified = QualifiedName {
                schema: table.schema.clone(),
                name: name.clone(),
            };
            single(format!("DROP INDEX {}", quote_name(&qualified)))
        }
        DiffOp::SetTableOption { table, option } => single(format!(
            "ALTER TABLE {} SET ({} = {})",
            quote_name(table),
            option.name,
            option.value
        )),
        DiffOp::SetPartition { .. } => {
            return Err(UnsupportedError::new(
                DIALECT,
                "changing table partitioning requires recreating the table",
            )
            .into());
        }
        DiffOp::CreateView(view) => single(create_view_sql("CREATE", view)),
        DiffOp::ReplaceView(view) => single(create_view_sql("CREATE OR REPLACE", view)),
        DiffOp::DropView { name, materialized } => {
            let kind = if *materialized {
                "MATERIALIZED VIEW"
            } else {
                "VIEW"
            };
            single(format!("DROP {kind} {}", quote_name(name)))
        }
        DiffOp::CreateTrigger(trigger) => single(create_trigger_sql(trigger)),
        DiffOp::DropTrigger { name, table } => single(format!(
            "DROP TRIGGER {} ON {}",
            quote_ident(name),
            quote_name(table)
        )),
        DiffOp::CreatePolicy(policy) => single(format!(
            "CREATE POLICY {} ON {} {}",
            quote_ident(&policy.name),
            quote_name(&policy.table),
            policy.definition
        )),
        DiffOp::DropPolicy { name, table } => single(format!(
            "DROP POLICY {} ON {}",
            quote_ident(name),
            quote_name(table)
        )),
        DiffOp::Grant(privilege) => single(privilege_sql("GRANT", "TO", privilege)),
        DiffOp::Revoke(privilege) => single(privilege_sql("REVOKE", "FROM", privilege)),
    };
    Ok(statements)
}

fn single(sql: String) -> Vec<MigrationStatement> {
    vec![MigrationStatement::new(sql)]
}

fn drop_constraint_sql(table: &QualifiedName, name: &Ident) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        quote_name(table),
        quote_ident(name)
    )
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
    if let Some(partition) = &table.partition {
        sql.push(' ');
        sql.push_str(partition);
    }
    sql
}

fn change_column(
    table: &QualifiedName,
    to: &sqldrift_core::ast::Column,
    changes: &[ColumnChange],
) -> Result<Vec<MigrationStatement>> {
    let mut statements = Vec::with_capacity(changes.len());
    let prefix = format!(
        "ALTER TABLE {} ALTER COLUMN {}",
        quote_name(table),
        quote_ident(&to.name)
    );
    for change in changes {
        let sql = match change {
            ColumnChange::SetType => format!("{prefix} TYPE {}", to.type_name.raw),
            ColumnChange::SetNotNull => format!("{prefix} SET NOT NULL"),
            ColumnChange::DropNotNull => format!("{prefix} DROP NOT NULL"),
            ColumnChange::SetDefault => match &to.default {
                Some(default) => format!("{prefix} SET DEFAULT {}", expr_sql(default)),
                None => format!("{prefix} DROP DEFAULT"),
            },
            ColumnChange::DropDefault => format!("{prefix} DROP DEFAULT"),
            ColumnChange::SetComment => {
                let comment = match &to.comment {
                    Some(comment) => quote_string(comment),
                    None => "NULL".to_string(),
                };
                format!(
                    "COMMENT ON COLUMN {}.{} IS {comment}",
                    quote_name(table),
                    quote_ident(&to.name)
                )
            }
            ColumnChange::SetAutoIncrement => {
                if to.auto_increment {
                    format!("{prefix} ADD GENERATED BY DEFAULT AS IDENTITY")
                } else {
                    format!("{prefix} DROP IDENTITY")
                }
            }
            ColumnChange::SetCollation => match &to.collation {
                Some(collation) => format!(
                    "{prefix} TYPE {} COLLATE {}",
                    to.type_name.raw,
                    quote_ident(&Ident::unquoted(collation.clone()))
                ),
                None => {
                    return Err(UnsupportedError::new(
                        DIALECT,
                        "removing an explicit column collation",
                    )
                    .into());
                }
            },
            ColumnChange::SetGenerated => {
                return Err(UnsupportedError::new(
                    DIALECT,
                    "changing a generated column expression",
                )
                .into());
            }
            ColumnChange::SetCharset | ColumnChange::SetOnUpdate => {
                return Err(UnsupportedError::new(
                    DIALECT,
                    "MySQL column attributes (CHARACTER SET / ON UPDATE)",
                )
                .into());
            }
        };
        statements.push(MigrationStatement::new(sql));
    }
    Ok(statements)
}

fn create_index(table: &QualifiedName, index: &Index) -> MigrationStatement {
    let mut sql = String::from("CREATE ");
    if index.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    if index.concurrently {
        sql.push_str("CONCURRENTLY ");
    }
    sql.push_str(&quote_ident(&index.name));
    sql.push_str(" ON ");
    sql.push_str(&quote_name(table));
    if let Some(method) = &index.method {
        sql.push_str(" USING ");
        sql.push_str(method);
    }
    sql.push_str(" (");
    sql.push_str(&index_elems_sql(&index.columns));
    sql.push(')');
    if let Some(predicate) = &index.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&expr_sql(predicate));
    }
    if index.concurrently {
        MigrationStatement::non_transactional(sql)
    } else {
        MigrationStatement::new(sql)
    }
}

/// `restate_defaults` renders every clause so an ALTER fully describes the
/// sequence; a bare CREATE keeps only what the source said.
fn sequence_clauses(sequence: &CreateSequence, restate_defaults: bool) -> String {
    let mut sql = String::new();
    match (sequence.increment, restate_defaults) {
        (Some(value), _) => sql.push_str(&format!(" INCREMENT BY {value}")),
        (None, true) => sql.push_str(" INCREMENT BY 1"),
        (None, false) => {}
    }
    match (sequence.min_value, restate_defaults) {
        (Some(value), _) => sql.push_str(&format!(" MINVALUE {value}")),
        (None, true) => sql.push_str(" NO MINVALUE"),
        (None, false) => {}
    }
    match (sequence.max_value, restate_defaults) {
        (Some(value), _) => sql.push_str(&format!(" MAXVALUE {value}")),
        (None, true) => sql.push_str(" NO MAXVALUE"),
        (None, false) => {}
    }
    match (sequence.start, restate_defaults) {
        (Some(value), _) => sql.push_str(&format!(" START WITH {value}")),
        (None, true) => sql.push_str(" START WITH 1"),
        (None, false) => {}
    }
    match (sequence.cache, restate_defaults) {
        (Some(value), _) => sql.push_str(&format!(" CACHE {value}")),
        (None, true) => sql.push_str(" CACHE 1"),
        (None, false) => {}
    }
    if sequence.cycle {
        sql.push_str(" CYCLE");
    } else if restate_defaults {
        sql.push_str(" NO CYCLE");
    }
    sql
}

fn create_view_sql(verb: &str, view: &View) -> String {
    let kind = if view.materialized {
        "MATERIALIZED VIEW"
    } else {
        "VIEW"
    };
    let mut sql = format!("{verb} {kind} {}", quote_name(&view.name));
    if !view.columns.is_empty() {
        sql.push_str(&format!(" ({})", ident_list(&view.columns)));
    }
    sql.push_str(" AS ");
    sql.push_str(&view.query);
    sql
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
        .map(|grantee| {
            if grantee.value.eq_ignore_ascii_case("public") {
                "PUBLIC".to_string()
            } else {
                quote_ident(grantee)
            }
        })
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
    use sqldrift_core::normalize::DefaultEquivalence;
    use sqldrift_core::order::sort_ops;
    use sqldrift_core::parser::{parse_sql, GrammarProfile};

    fn model(sql: &str) -> SchemaModel {
        let statements = parse_sql(sql, &GrammarProfile::postgres()).expect("should parse");
        let options = BuildOptions {
            default_schema: Some("public".to_string()),
            ..BuildOptions::default()
        };
        build_schema(statements, &options).expect("should build")
    }

    fn generate(current: &str, desired: &str, options: &DiffOptions) -> Vec<String> {
        let outcome = diff_schemas(&model(current), &model(desired), &DefaultEquivalence, options);
        sort_ops(outcome.ops)
            .iter()
            .flat_map(|op| render_op(op).expect("should render"))
            .map(|statement| statement.sql)
            .collect()
    }

    #[test]
    fn new_table_renders_with_quoted_identifiers() {
        let sql = generate(
            "",
            "CREATE TABLE users (id bigint NOT NULL, PRIMARY KEY (id));",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE \"public\".\"users\" (\n    \"id\" bigint NOT NULL,\n    PRIMARY KEY (\"id\")\n)"
            ]
        );
    }

    #[test]
    fn column_changes_become_discrete_alter_clauses() {
        let sql = generate(
            "CREATE TABLE t (name varchar(100));",
            "CREATE TABLE t (name varchar(200) NOT NULL DEFAULT 'x');",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"public\".\"t\" ALTER COLUMN \"name\" TYPE varchar(200)",
                "ALTER TABLE \"public\".\"t\" ALTER COLUMN \"name\" SET NOT NULL",
                "ALTER TABLE \"public\".\"t\" ALTER COLUMN \"name\" SET DEFAULT 'x'",
            ]
        );
    }

    #[test]
    fn concurrent_index_is_non_transactional() {
        let statement = create_index(
            &QualifiedName::schema_qualified("public", "t"),
            &Index {
                name: Ident::unquoted("idx_t_a"),
                columns: vec![sqldrift_core::ast::IndexElem::column("a")],
                unique: false,
                method: None,
                where_clause: None,
                concurrently: true,
            },
        );
        assert!(!statement.transactional);
        assert_eq!(
            statement.sql,
            "CREATE INDEX CONCURRENTLY \"idx_t_a\" ON \"public\".\"t\" (\"a\")"
        );
    }

    #[test]
    fn enum_addition_preserves_position() {
        let sql = generate(
            "CREATE TYPE mood AS ENUM ('sad', 'happy');",
            "CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec!["ALTER TYPE \"public\".\"mood\" ADD VALUE 'ok' BEFORE 'happy'"]
        );
    }

    #[test]
    fn foreign_keys_trail_table_creation() {
        let sql = generate(
            "",
            "CREATE TABLE a (id bigint, b_id bigint, PRIMARY KEY (id),
               CONSTRAINT a_b_fkey FOREIGN KEY (b_id) REFERENCES b (id));
             CREATE TABLE b (id bigint, PRIMARY KEY (id));",
            &DiffOptions::default(),
        );
        let fk_line = sql
            .iter()
            .position(|line| line.contains("ADD CONSTRAINT \"a_b_fkey\""))
            .expect("fk statement");
        assert_eq!(fk_line, sql.len() - 1);
        assert!(sql[fk_line].contains("REFERENCES \"public\".\"b\" (\"id\")"));
    }

    #[test]
    fn partition_change_is_rejected() {
        let error = render_op(&DiffOp::SetPartition {
            table: QualifiedName::bare("t"),
            partition: Some("PARTITION BY RANGE (id)".to_string()),
        })
        .expect_err("must fail");
        assert!(error.to_string().contains("partitioning"));
    }
}
