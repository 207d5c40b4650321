//! Turns migration operations into SQL Server DDL. Constraints are dropped by
//! name with `DROP CONSTRAINT`, type and nullability changes restate the
//! column through `ALTER COLUMN`, and defaults travel as named `DF_` default
//! constraints because SQL Server stores them that way.

use sqldrift_core::ast::{CreateSequence, PrivilegeStatement};
use sqldrift_core::diff::{ColumnChange, DiffOp};
use sqldrift_core::model::{Index, Table, Trigger, View};
use sqldrift_core::{Ident, MigrationStatement, QualifiedName, Result, UnsupportedError};

use crate::to_sql::{
    check_sql, column_sql, expr_sql, foreign_key_sql, index_elems_sql, primary_key_sql,
    quote_ident, quote_name, unique_sql,
};

const DIALECT: &str = "mssql";

pub(crate) fn render_op(op: &DiffOp) -> Result<Vec<MigrationStatement>> {
    let statements = match op {
        DiffOp::CreateSchema { name } => {
            single(format!("CREATE SCHEMA {}", quote_ident(name)))
        }
        DiffOp::CreateSequence(sequence) => single(sequence_sql("CREATE", sequence)),
        DiffOp::AlterSequence(sequence) => single(sequence_sql("ALTER", sequence)),
        DiffOp::DropSequence { name } => {
            single(format!("DROP SEQUENCE {}", quote_name(name)))
        }
        DiffOp::CreateTable(table) => single(create_table_sql(table)),
        DiffOp::DropTable { name } => single(format!("DROP TABLE {}", quote_name(name))),
        DiffOp::AddColumn { table, column, .. } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            column_sql(column)
        )),
        DiffOp::DropColumn { table, name } => single(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_name(table),
            quote_ident(name)
        )),
        DiffOp::ChangeColumn {
            table,
            from,
            to,
            changes,
        } => change_column(table, from, to, changes)?,
        DiffOp::AddPrimaryKey { table, primary_key } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            primary_key_sql(primary_key)
        )),
        DiffOp::DropPrimaryKey { table, name } => {
            let name = name.as_ref().ok_or_else(|| {
                UnsupportedError::new(DIALECT, "dropping an unnamed primary key")
            })?;
            single(drop_constraint_sql(table, name))
        }
        DiffOp::AddUnique { table, unique } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            unique_sql(unique)
        )),
        DiffOp::DropUnique { table, name }
        | DiffOp::DropCheck { table, name }
        | DiffOp::DropForeignKey { table, name } => single(drop_constraint_sql(table, name)),
        DiffOp::AddCheck { table, check } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            check_sql(check)
        )),
        DiffOp::AddForeignKey { table, foreign_key } => single(format!(
            "ALTER TABLE {} ADD {}",
            quote_name(table),
            foreign_key_sql(foreign_key)
        )),
        DiffOp::CreateIndex { table, index } => single(create_index_sql(table, index)),
        DiffOp::DropIndex { table, name } => single(format!(
            "DROP INDEX {} ON {}",
            quote_ident(name),
            quote_name(table)
        )),
        DiffOp::CreateView(view) => single(create_view_sql("CREATE", view)?),
        DiffOp::ReplaceView(view) => single(create_view_sql("CREATE OR ALTER", view)?),
        DiffOp::DropView { name, materialized } => {
            if *materialized {
                return Err(UnsupportedError::new(DIALECT, "materialized views").into());
            }
            single(format!("DROP VIEW {}", quote_name(name)))
        }
        DiffOp::CreateTrigger(trigger) => single(create_trigger_sql(trigger)?),
        DiffOp::DropTrigger { name, .. } => {
            single(format!("DROP TRIGGER {}", quote_ident(name)))
        }
        DiffOp::Grant(privilege) => single(privilege_sql("GRANT", "TO", privilege)),
        DiffOp::Revoke(privilege) => single(privilege_sql("REVOKE", "FROM", privilege)),
        DiffOp::SetTableOption { .. } => {
            return Err(UnsupportedError::new(DIALECT, "table options").into());
        }
        DiffOp::SetPartition { .. } => {
            return Err(UnsupportedError::new(DIALECT, "partition changes").into());
        }
        DiffOp::CreateExtension { .. } | DiffOp::DropExtension { .. } => {
            return Err(UnsupportedError::new(DIALECT, "extensions").into());
        }
        DiffOp::CreateEnum(_) | DiffOp::AddEnumValue { .. } | DiffOp::DropEnum { .. } => {
            return Err(UnsupportedError::new(DIALECT, "enum types").into());
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

fn change_column(
    table: &QualifiedName,
    from: &sqldrift_core::ast::Column,
    to: &sqldrift_core::ast::Column,
    changes: &[ColumnChange],
) -> Result<Vec<MigrationStatement>> {
    let mut statements = Vec::new();
    let mut restated = false;
    for change in changes {
        match change {
            // Type, nullability and collation all ride on the same ALTER
            // COLUMN restatement; emit it once.
            ColumnChange::SetType
            | ColumnChange::SetNotNull
            | ColumnChange::DropNotNull
            | ColumnChange::SetCollation => {
                if !restated {
                    statements.push(MigrationStatement::new(alter_column_sql(table, to)));
                    restated = true;
                }
            }
            ColumnChange::SetDefault => {
                let default = to.default.as_ref().map(expr_sql).unwrap_or_default();
                statements.push(MigrationStatement::new(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {default} FOR {}",
                    quote_name(table),
                    quote_ident(&default_constraint_name(table, to)),
                    quote_ident(&to.name)
                )));
            }
            ColumnChange::DropDefault => {
                statements.push(MigrationStatement::new(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    quote_name(table),
                    quote_ident(&default_constraint_name(table, from))
                )));
            }
            ColumnChange::SetAutoIncrement => {
                return Err(UnsupportedError::new(
                    DIALECT,
                    "changing the IDENTITY property of an existing column",
                )
                .into());
            }
            ColumnChange::SetComment => {
                return Err(UnsupportedError::new(DIALECT, "column comments").into());
            }
            ColumnChange::SetCharset => {
                return Err(UnsupportedError::new(DIALECT, "column character sets").into());
            }
            ColumnChange::SetOnUpdate => {
                return Err(UnsupportedError::new(DIALECT, "ON UPDATE clauses").into());
            }
            ColumnChange::SetGenerated => {
                return Err(UnsupportedError::new(
                    DIALECT,
                    "changing a computed column expression",
                )
                .into());
            }
        }
    }
    Ok(statements)
}

fn alter_column_sql(table: &QualifiedName, column: &sqldrift_core::ast::Column) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ALTER COLUMN {} {}",
        quote_name(table),
        quote_ident(&column.name),
        column.type_name.raw
    );
    if let Some(collation) = &column.collation {
        sql.push_str(" COLLATE ");
        sql.push_str(collation);
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    } else {
        sql.push_str(" NULL");
    }
    sql
}

// Mirrors the DF_<table>_<column> convention SQL Server tooling uses, so the
// constraint can be found again when the default is later dropped.
fn default_constraint_name(table: &QualifiedName, column: &sqldrift_core::ast::Column) -> Ident {
    Ident::unquoted(format!(
        "DF_{}_{}",
        table.name.value, column.name.value
    ))
}

fn drop_constraint_sql(table: &QualifiedName, name: &Ident) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        quote_name(table),
        quote_ident(name)
    )
}

fn sequence_sql(verb: &str, sequence: &CreateSequence) -> String {
    let mut sql = format!("{verb} SEQUENCE {}", quote_name(&sequence.name));
    if let Some(start) = sequence.start {
        sql.push_str(&format!(" START WITH {start}"));
    }
    if let Some(increment) = sequence.increment {
        sql.push_str(&format!(" INCREMENT BY {increment}"));
    }
    if let Some(min_value) = sequence.min_value {
        sql.push_str(&format!(" MINVALUE {min_value}"));
    }
    if let Some(max_value) = sequence.max_value {
        sql.push_str(&format!(" MAXVALUE {max_value}"));
    }
    if let Some(cache) = sequence.cache {
        sql.push_str(&format!(" CACHE {cache}"));
    }
    if sequence.cycle {
        sql.push_str(" CYCLE");
    }
    sql
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
    // CLUSTERED / NONCLUSTERED sits between UNIQUE and INDEX.
    if let Some(method) = &index.method {
        sql.push_str(method);
        sql.push(' ');
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

fn create_view_sql(verb: &str, view: &View) -> Result<String> {
    if view.materialized {
        return Err(UnsupportedError::new(DIALECT, "materialized views").into());
    }
    if view.security.is_some() {
        return Err(UnsupportedError::new(DIALECT, "view security clauses").into());
    }
    let mut sql = format!("{verb} VIEW {}", quote_name(&view.name));
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

fn create_trigger_sql(trigger: &Trigger) -> Result<String> {
    // SQL Server triggers fire per statement.
    if trigger.for_each_row {
        return Err(UnsupportedError::new(DIALECT, "row-level triggers").into());
    }
    Ok(format!(
        "CREATE TRIGGER {} ON {} {} {} {}",
        quote_ident(&trigger.name),
        quote_name(&trigger.table),
        trigger.timing,
        trigger.events.join(", "),
        trigger.body
    ))
}

fn privilege_sql(verb: &str, connector: &str, privilege: &PrivilegeStatement) -> String {
    let grantees = privilege
        .grantees
        .iter()
        .map(|grantee| {
            if grantee.value.eq_ignore_ascii_case("public") {
                grantee.value.clone()
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
    use sqldrift_core::order::sort_ops;
    use sqldrift_core::parser::{parse_sql, GrammarProfile};

    use crate::equivalence::MSSQL_EQUIVALENCE;

    fn model(sql: &str) -> SchemaModel {
        let statements = parse_sql(sql, &GrammarProfile::mssql()).expect("should parse");
        let options = BuildOptions {
            default_schema: Some("dbo".to_string()),
            ..BuildOptions::default()
        };
        build_schema(statements, &options).expect("should build")
    }

    fn generate(current: &str, desired: &str, options: &DiffOptions) -> Vec<String> {
        let outcome = diff_schemas(&model(current), &model(desired), &MSSQL_EQUIVALENCE, options);
        sort_ops(outcome.ops)
            .iter()
            .flat_map(|op| render_op(op).expect("should render"))
            .map(|statement| statement.sql)
            .collect()
    }

    #[test]
    fn new_table_renders_with_bracket_identifiers() {
        let sql = generate(
            "",
            "CREATE TABLE dbo.users (id bigint NOT NULL IDENTITY(1,1), name nvarchar(100), PRIMARY KEY (id));",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE [dbo].[users] (\n    [id] bigint IDENTITY(1,1) NOT NULL,\n    [name] nvarchar(100),\n    PRIMARY KEY ([id])\n)"
            ]
        );
    }

    #[test]
    fn type_and_nullability_restate_the_column_once() {
        let sql = generate(
            "CREATE TABLE dbo.t (name nvarchar(100));",
            "CREATE TABLE dbo.t (name nvarchar(200) NOT NULL);",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE [dbo].[t] ALTER COLUMN [name] nvarchar(200) NOT NULL"]
        );
    }

    #[test]
    fn new_default_becomes_a_named_constraint() {
        let sql = generate(
            "CREATE TABLE dbo.t (flag bit NOT NULL);",
            "CREATE TABLE dbo.t (flag bit NOT NULL DEFAULT 0);",
            &DiffOptions::default(),
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE [dbo].[t] ADD CONSTRAINT [DF_t_flag] DEFAULT 0 FOR [flag]"]
        );
    }

    #[test]
    fn constraints_are_dropped_by_name() {
        let statements = render_op(&DiffOp::DropForeignKey {
            table: QualifiedName::schema_qualified("dbo", "orders"),
            name: Ident::unquoted("FK_orders_users"),
        })
        .expect("should render");
        assert_eq!(
            statements[0].sql,
            "ALTER TABLE [dbo].[orders] DROP CONSTRAINT [FK_orders_users]"
        );
    }

    #[test]
    fn sequences_render_their_stated_clauses() {
        let statements = render_op(&DiffOp::CreateSequence(CreateSequence {
            name: QualifiedName::schema_qualified("dbo", "order_seq"),
            increment: Some(10),
            min_value: None,
            max_value: None,
            start: Some(1000),
            cache: None,
            cycle: false,
        }))
        .expect("should render");
        assert_eq!(
            statements[0].sql,
            "CREATE SEQUENCE [dbo].[order_seq] START WITH 1000 INCREMENT BY 10"
        );
    }

    #[test]
    fn enum_types_are_rejected() {
        let error = render_op(&DiffOp::DropEnum {
            name: QualifiedName::bare("mood"),
        })
        .expect_err("must fail");
        assert!(error.to_string().contains("enum types"));
    }
}
