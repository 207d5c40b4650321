//! Folds parsed statements into a [`SchemaModel`]. CREATE defines an object,
//! ALTER mutates it in place, DROP removes it; what remains is the schema the
//! script describes, independent of how the statements were phrased.

use crate::ast::{
    AlterAction, AlterTable, Column, ColumnPosition, CreateIndex, CreateTable, CreateView,
    DropStatement, ForeignKey, IndexElem, ObjectKind, PrimaryKey, Statement, TableConstraint,
    UniqueConstraint,
};
use crate::model::{Index, SchemaModel, Table, Trigger, View};
use crate::{DependencyError, Ident, QualifiedName, Result};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Schema attached to unqualified names, when the dialect has schemas.
    pub default_schema: Option<String>,
    /// Treat `id` and `"id"` as the same name.
    pub ignore_quotes: bool,
    /// Reject foreign keys and triggers that point at tables the schema does
    /// not define. Disabled when object filters hide part of the schema.
    pub check_references: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            default_schema: None,
            ignore_quotes: true,
            check_references: true,
        }
    }
}

pub fn build_schema(statements: Vec<Statement>, options: &BuildOptions) -> Result<SchemaModel> {
    let mut builder = Builder {
        model: SchemaModel::default(),
        options,
    };
    for statement in statements {
        builder.apply(statement)?;
    }
    builder.finish()
}

struct Builder<'a> {
    model: SchemaModel,
    options: &'a BuildOptions,
}

impl Builder<'_> {
    fn qualify(&self, name: QualifiedName) -> QualifiedName {
        name.qualify(self.options.default_schema.as_deref())
    }

    fn apply(&mut self, statement: Statement) -> Result<()> {
        match statement {
            Statement::CreateTable(create) => self.apply_create_table(create),
            Statement::CreateIndex(create) => self.apply_create_index(create),
            Statement::AlterTable(alter) => self.apply_alter_table(alter),
            Statement::CreateView(create) => {
                self.apply_create_view(create);
                Ok(())
            }
            Statement::CreateTrigger(create) => {
                let trigger = Trigger {
                    name: create.name,
                    table: self.qualify(create.table),
                    timing: create.timing,
                    events: create.events,
                    for_each_row: create.for_each_row,
                    body: create.body,
                };
                self.model
                    .triggers
                    .retain(|existing| !existing.name.matches(&trigger.name, self.options.ignore_quotes));
                self.model.triggers.push(trigger);
                Ok(())
            }
            Statement::CreateSequence(mut create) => {
                create.name = self.qualify(create.name);
                self.model.sequences.retain(|existing| {
                    !existing.name.matches(&create.name, self.options.ignore_quotes)
                });
                self.model.sequences.push(create);
                Ok(())
            }
            Statement::CreateType(mut create) => {
                create.name = self.qualify(create.name);
                self.model.types.retain(|existing| {
                    !existing.name.matches(&create.name, self.options.ignore_quotes)
                });
                self.model.types.push(create);
                Ok(())
            }
            Statement::CreateExtension { name, .. } => {
                if !self
                    .model
                    .extensions
                    .iter()
                    .any(|existing| existing.matches(&name, self.options.ignore_quotes))
                {
                    self.model.extensions.push(name);
                }
                Ok(())
            }
            Statement::CreateSchema { name, .. } => {
                if !self
                    .model
                    .schemas
                    .iter()
                    .any(|existing| existing.matches(&name, self.options.ignore_quotes))
                {
                    self.model.schemas.push(name);
                }
                Ok(())
            }
            Statement::CreatePolicy(mut create) => {
                create.table = self.qualify(create.table);
                self.model.policies.retain(|existing| {
                    !(existing.name.matches(&create.name, self.options.ignore_quotes)
                        && existing.table.matches(&create.table, self.options.ignore_quotes))
                });
                self.model.policies.push(create);
                Ok(())
            }
            Statement::Grant(mut privilege) => {
                privilege.object = self.qualify(privilege.object);
                self.model.privileges.push(privilege);
                Ok(())
            }
            Statement::Revoke(mut privilege) => {
                privilege.object = self.qualify(privilege.object);
                self.model.privileges.retain(|existing| {
                    !(existing.object.matches(&privilege.object, self.options.ignore_quotes)
                        && existing.grantees == privilege.grantees
                        && existing.privileges == privilege.privileges)
                });
                Ok(())
            }
            Statement::Drop(drop) => {
                self.apply_drop(drop);
                Ok(())
            }
        }
    }

    fn apply_create_table(&mut self, create: CreateTable) -> Result<()> {
        let name = self.qualify(create.name);
        let mut table = Table::new(name);
        table.options = create.options;
        table.partition = create.partition;

        for mut column in create.columns {
            if column.inline_primary_key {
                table.primary_key = Some(PrimaryKey {
                    name: None,
                    columns: vec![IndexElem::column(column.name.value.clone())],
                });
            }
            if column.inline_unique {
                table.uniques.push(UniqueConstraint {
                    name: None,
                    columns: vec![IndexElem::column(column.name.value.clone())],
                });
            }
            if let Some(reference) = column.inline_references.take() {
                table.foreign_keys.push(ForeignKey {
                    name: None,
                    columns: vec![column.name.clone()],
                    reference,
                });
            }
            column.inline_primary_key = false;
            column.inline_unique = false;
            table.columns.push(column);
        }

        for constraint in create.constraints {
            self.add_constraint(&mut table, constraint);
        }
        for fk in &mut table.foreign_keys {
            fk.reference.table = fk
                .reference
                .table
                .clone()
                .qualify(self.options.default_schema.as_deref());
        }

        self.model
            .tables
            .retain(|existing| !existing.name.matches(&table.name, self.options.ignore_quotes));
        self.model.tables.push(table);
        Ok(())
    }

    fn add_constraint(&self, table: &mut Table, constraint: TableConstraint) {
        match constraint {
            TableConstraint::PrimaryKey(pk) => table.primary_key = Some(pk),
            TableConstraint::Unique(unique) => table.uniques.push(unique),
            TableConstraint::ForeignKey(mut fk) => {
                fk.reference.table = self.qualify(fk.reference.table.clone());
                table.foreign_keys.push(fk);
            }
            TableConstraint::Check(check) => table.checks.push(check),
        }
    }

    fn apply_create_index(&mut self, create: CreateIndex) -> Result<()> {
        let table_name = self.qualify(create.table);
        let ignore_quotes = self.options.ignore_quotes;
        let name = resolve_index_name(create.name, &table_name, &create.columns);
        let Some(table) = self.model.table_mut(&table_name, ignore_quotes) else {
            return Err(DependencyError::unknown_reference(
                format!("index {name}"),
                "table",
                table_name.to_string(),
            )
            .into());
        };
        table
            .indexes
            .retain(|existing| !existing.name.matches(&name, ignore_quotes));
        table.indexes.push(Index {
            name,
            columns: create.columns,
            unique: create.unique,
            method: create.method,
            where_clause: create.where_clause,
            concurrently: create.concurrently,
        });
        Ok(())
    }

    fn apply_create_view(&mut self, create: CreateView) {
        let view = View {
            name: self.qualify(create.name),
            materialized: create.materialized,
            columns: create.columns,
            query: create.query,
            security: create.security,
        };
        self.model
            .views
            .retain(|existing| !existing.name.matches(&view.name, self.options.ignore_quotes));
        self.model.views.push(view);
    }

    fn apply_alter_table(&mut self, alter: AlterTable) -> Result<()> {
        let table_name = self.qualify(alter.table);
        let ignore_quotes = self.options.ignore_quotes;
        let default_schema = self.options.default_schema.clone();
        let Some(table) = self.model.table_mut(&table_name, ignore_quotes) else {
            return Err(DependencyError::unknown_reference(
                "ALTER TABLE".to_string(),
                "table",
                table_name.to_string(),
            )
            .into());
        };

        for action in alter.actions {
            match action {
                AlterAction::AddColumn { column, position } => {
                    let mut column = column;
                    lift_inline_into(table, &mut column);
                    insert_column(table, column, position, ignore_quotes);
                }
                AlterAction::DropColumn { name } => {
                    table
                        .columns
                        .retain(|column| !column.name.matches(&name, ignore_quotes));
                }
                AlterAction::ModifyColumn {
                    from,
                    column,
                    position,
                } => {
                    let mut column = column;
                    lift_inline_into(table, &mut column);
                    let old_name = from.unwrap_or_else(|| column.name.clone());
                    table
                        .columns
                        .retain(|existing| !existing.name.matches(&old_name, ignore_quotes));
                    insert_column(table, column, position, ignore_quotes);
                }
                AlterAction::AlterColumnSetDefault { name, default } => {
                    if let Some(column) = table.column_mut(&name, ignore_quotes) {
                        column.default = default;
                    }
                }
                AlterAction::AlterColumnSetNotNull { name, not_null } => {
                    if let Some(column) = table.column_mut(&name, ignore_quotes) {
                        column.not_null = not_null;
                    }
                }
                AlterAction::AlterColumnType { name, type_name } => {
                    if let Some(column) = table.column_mut(&name, ignore_quotes) {
                        column.type_name = type_name;
                    }
                }
                AlterAction::AddConstraint(constraint) => match constraint {
                    TableConstraint::PrimaryKey(pk) => table.primary_key = Some(pk),
                    TableConstraint::Unique(unique) => table.uniques.push(unique),
                    TableConstraint::ForeignKey(mut fk) => {
                        fk.reference.table =
                            fk.reference.table.clone().qualify(default_schema.as_deref());
                        table.foreign_keys.push(fk);
                    }
                    TableConstraint::Check(check) => table.checks.push(check),
                },
                AlterAction::DropConstraint { name } => {
                    drop_constraint(table, &name, ignore_quotes);
                }
                AlterAction::DropPrimaryKey => table.primary_key = None,
                AlterAction::DropForeignKey { name } => {
                    table.foreign_keys.retain(|fk| {
                        fk.name
                            .as_ref()
                            .is_none_or(|fk_name| !fk_name.matches(&name, ignore_quotes))
                    });
                }
                AlterAction::DropIndex { name } => {
                    table
                        .indexes
                        .retain(|index| !index.name.matches(&name, ignore_quotes));
                    table.uniques.retain(|unique| {
                        unique
                            .name
                            .as_ref()
                            .is_none_or(|n| !n.matches(&name, ignore_quotes))
                    });
                }
                AlterAction::RenameTo { name } => {
                    table.name = name.qualify(default_schema.as_deref());
                }
                AlterAction::RenameColumn { from, to } => {
                    if let Some(column) = table.column_mut(&from, ignore_quotes) {
                        column.name = to;
                    }
                }
            }
        }
        for fk in &mut table.foreign_keys {
            fk.reference.table = fk.reference.table.clone().qualify(default_schema.as_deref());
        }
        Ok(())
    }

    fn apply_drop(&mut self, drop: DropStatement) {
        let name = self.qualify(drop.name);
        let ignore_quotes = self.options.ignore_quotes;
        match drop.kind {
            ObjectKind::Table => {
                self.model
                    .tables
                    .retain(|table| !table.name.matches(&name, ignore_quotes));
                self.model
                    .triggers
                    .retain(|trigger| !trigger.table.matches(&name, ignore_quotes));
                self.model
                    .policies
                    .retain(|policy| !policy.table.matches(&name, ignore_quotes));
            }
            ObjectKind::View | ObjectKind::MaterializedView => {
                self.model
                    .views
                    .retain(|view| !view.name.matches(&name, ignore_quotes));
            }
            ObjectKind::Index => {
                for table in &mut self.model.tables {
                    table
                        .indexes
                        .retain(|index| !index.name.matches(&name.name, ignore_quotes));
                }
            }
            ObjectKind::Trigger => {
                self.model
                    .triggers
                    .retain(|trigger| !trigger.name.matches(&name.name, ignore_quotes));
            }
            ObjectKind::Sequence => {
                self.model
                    .sequences
                    .retain(|sequence| !sequence.name.matches(&name, ignore_quotes));
            }
            ObjectKind::Type => {
                self.model
                    .types
                    .retain(|enum_type| !enum_type.name.matches(&name, ignore_quotes));
            }
            ObjectKind::Extension => {
                self.model
                    .extensions
                    .retain(|extension| !extension.matches(&name.name, ignore_quotes));
            }
            ObjectKind::Schema => {
                self.model
                    .schemas
                    .retain(|schema| !schema.matches(&name.name, ignore_quotes));
            }
            ObjectKind::Policy => {
                self.model
                    .policies
                    .retain(|policy| !policy.name.matches(&name.name, ignore_quotes));
            }
        }
    }

    fn finish(mut self) -> Result<SchemaModel> {
        // PRIMARY KEY implies NOT NULL; make it explicit so comparison does
        // not see a phantom nullability change.
        for table in &mut self.model.tables {
            let Some(pk) = table.primary_key.clone() else {
                continue;
            };
            for elem in &pk.columns {
                if let crate::Expr::Ident(column_name) = &elem.expr {
                    if let Some(column) =
                        table.column_mut(column_name, self.options.ignore_quotes)
                    {
                        column.not_null = true;
                    }
                }
            }
        }

        if self.options.check_references {
            self.check_references()?;
        }
        Ok(self.model)
    }

    fn check_references(&self) -> Result<()> {
        let ignore_quotes = self.options.ignore_quotes;
        for table in &self.model.tables {
            for fk in &table.foreign_keys {
                if self.model.table(&fk.reference.table, ignore_quotes).is_none() {
                    return Err(DependencyError::unknown_reference(
                        format!("table {}", table.name),
                        "table",
                        fk.reference.table.to_string(),
                    )
                    .into());
                }
            }
        }
        for trigger in &self.model.triggers {
            let on_table = self.model.table(&trigger.table, ignore_quotes).is_some();
            let on_view = self.model.view(&trigger.table, ignore_quotes).is_some();
            if !on_table && !on_view {
                return Err(DependencyError::unknown_reference(
                    format!("trigger {}", trigger.name),
                    "table",
                    trigger.table.to_string(),
                )
                .into());
            }
        }
        for policy in &self.model.policies {
            if self.model.table(&policy.table, ignore_quotes).is_none() {
                return Err(DependencyError::unknown_reference(
                    format!("policy {}", policy.name),
                    "table",
                    policy.table.to_string(),
                )
                .into());
            }
        }
        Ok(())
    }
}

fn lift_inline_into(table: &mut Table, column: &mut Column) {
    if column.inline_primary_key {
        table.primary_key = Some(PrimaryKey {
            name: None,
            columns: vec![IndexElem::column(column.name.value.clone())],
        });
        column.inline_primary_key = false;
    }
    if column.inline_unique {
        table.uniques.push(UniqueConstraint {
            name: None,
            columns: vec![IndexElem::column(column.name.value.clone())],
        });
        column.inline_unique = false;
    }
    if let Some(reference) = column.inline_references.take() {
        table.foreign_keys.push(ForeignKey {
            name: None,
            columns: vec![column.name.clone()],
            reference,
        });
    }
}

fn insert_column(
    table: &mut Table,
    column: Column,
    position: Option<ColumnPosition>,
    ignore_quotes: bool,
) {
    match position {
        Some(ColumnPosition::First) => table.columns.insert(0, column),
        Some(ColumnPosition::After(anchor)) => {
            let index = table
                .columns
                .iter()
                .position(|existing| existing.name.matches(&anchor, ignore_quotes))
                .map_or(table.columns.len(), |idx| idx + 1);
            table.columns.insert(index, column);
        }
        None => table.columns.push(column),
    }
}

fn drop_constraint(table: &mut Table, name: &Ident, ignore_quotes: bool) {
    if table
        .primary_key
        .as_ref()
        .and_then(|pk| pk.name.as_ref())
        .is_some_and(|pk_name| pk_name.matches(name, ignore_quotes))
    {
        table.primary_key = None;
        return;
    }
    let before = table.uniques.len();
    table.uniques.retain(|unique| {
        unique
            .name
            .as_ref()
            .is_none_or(|n| !n.matches(name, ignore_quotes))
    });
    if table.uniques.len() != before {
        return;
    }
    let before = table.foreign_keys.len();
    table.foreign_keys.retain(|fk| {
        fk.name
            .as_ref()
            .is_none_or(|n| !n.matches(name, ignore_quotes))
    });
    if table.foreign_keys.len() != before {
        return;
    }
    table.checks.retain(|check| {
        check
            .name
            .as_ref()
            .is_none_or(|n| !n.matches(name, ignore_quotes))
    });
}

/// MySQL names unnamed keys after their first column; other engines derive a
/// name too, so every model index has one.
fn resolve_index_name(
    name: Option<Ident>,
    table: &QualifiedName,
    columns: &[IndexElem],
) -> Ident {
    if let Some(name) = name {
        return name;
    }
    if let Some(IndexElem {
        expr: crate::Expr::Ident(first),
        ..
    }) = columns.first()
    {
        return first.clone();
    }
    Ident::unquoted(format!("{}_idx", table.name.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_sql, GrammarProfile};

    fn build(profile: &GrammarProfile, sql: &str) -> SchemaModel {
        let statements = parse_sql(sql, profile).expect("should parse");
        let options = BuildOptions {
            default_schema: profile.default_schema.map(str::to_string),
            ..BuildOptions::default()
        };
        build_schema(statements, &options).expect("should build")
    }

    #[test]
    fn inline_constraints_are_lifted() {
        let profile = GrammarProfile::postgres();
        let model = build(
            &profile,
            "CREATE TABLE users (id bigint PRIMARY KEY, email text UNIQUE, org_id bigint REFERENCES orgs (id));
             CREATE TABLE orgs (id bigint PRIMARY KEY);",
        );
        let table = &model.tables[0];
        assert!(table.primary_key.is_some());
        assert_eq!(table.uniques.len(), 1);
        assert_eq!(table.foreign_keys.len(), 1);
        assert_eq!(
            table.foreign_keys[0].reference.table.to_string(),
            "public.orgs"
        );
        assert!(table.columns.iter().all(|c| !c.inline_primary_key));
        // PK implies NOT NULL.
        assert!(table.columns[0].not_null);
    }

    #[test]
    fn alter_statements_mutate_the_model() {
        let profile = GrammarProfile::mysql();
        let model = build(
            &profile,
            "CREATE TABLE t (a int, c int);
             ALTER TABLE t ADD COLUMN b int AFTER a;
             ALTER TABLE t DROP COLUMN c;
             ALTER TABLE t ADD UNIQUE KEY uk_b (b);",
        );
        let table = &model.tables[0];
        let names: Vec<_> = table.columns.iter().map(|c| c.name.value.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.uniques.len(), 1);
    }

    #[test]
    fn alter_added_references_get_the_default_schema() {
        let profile = GrammarProfile::postgres();
        let model = build(
            &profile,
            "CREATE TABLE users (id bigint PRIMARY KEY);
             CREATE TABLE orders (id bigint, user_id bigint);
             ALTER TABLE orders ADD CONSTRAINT orders_user_fkey FOREIGN KEY (user_id) REFERENCES users (id);",
        );
        let orders = &model.tables[1];
        assert_eq!(
            orders.foreign_keys[0].reference.table.to_string(),
            "public.users"
        );
    }

    #[test]
    fn drop_removes_objects_and_dependents() {
        let profile = GrammarProfile::sqlite();
        let model = build(
            &profile,
            "CREATE TABLE t (a int);
             CREATE TRIGGER trg AFTER INSERT ON t BEGIN UPDATE t SET a = 1; END;
             DROP TABLE t;",
        );
        assert!(model.tables.is_empty());
        assert!(model.triggers.is_empty());
    }

    #[test]
    fn unnamed_mysql_key_uses_first_column_name() {
        let profile = GrammarProfile::mysql();
        let model = build(&profile, "CREATE TABLE t (a int, KEY (a));");
        assert_eq!(model.tables[0].indexes[0].name.value, "a");
    }

    #[test]
    fn dangling_foreign_key_is_rejected() {
        let profile = GrammarProfile::postgres();
        let statements = parse_sql(
            "CREATE TABLE orders (id bigint, user_id bigint REFERENCES users (id));",
            &profile,
        )
        .expect("should parse");
        let error = build_schema(statements, &BuildOptions::default()).expect_err("should fail");
        assert!(matches!(error, crate::Error::Dependency(_)));
    }
}
