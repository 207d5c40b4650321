//! Table-level comparison: columns, constraints, indexes and storage
//! options.

use crate::ast::{
    CheckConstraint, Column, ColumnPosition, ForeignKey, IndexElem, ReferentialAction,
    SortDirection, UniqueConstraint,
};
use crate::model::{Index, SchemaModel, Table};
use crate::normalize::{canonical_expr, normalize_sql_text};
use crate::{Ident, QualifiedName};

use super::{ColumnChange, DiffEngine, DiffOp};

impl DiffEngine<'_> {
    pub(super) fn diff_tables(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for table in &desired.tables {
            match current.table(&table.name, ignore_quotes) {
                None => self.create_table(table),
                Some(existing) => self.diff_table(existing, table),
            }
        }
        for table in &current.tables {
            if desired.table(&table.name, ignore_quotes).is_none() {
                self.push(DiffOp::DropTable {
                    name: table.name.clone(),
                });
            }
        }
    }

    /// Foreign keys are stripped off the create and emitted as trailing adds;
    /// the dependency sorter keeps them after every create, which is what
    /// makes reference cycles representable.
    fn create_table(&mut self, table: &Table) {
        let mut created = table.clone();
        let foreign_keys = std::mem::take(&mut created.foreign_keys);
        let indexes = std::mem::take(&mut created.indexes);
        self.push(DiffOp::CreateTable(created));
        for index in indexes {
            self.create_index(&table.name, index);
        }
        for foreign_key in foreign_keys {
            self.push(DiffOp::AddForeignKey {
                table: table.name.clone(),
                foreign_key,
            });
        }
    }

    fn diff_table(&mut self, current: &Table, desired: &Table) {
        self.diff_columns(current, desired);
        self.diff_primary_key(current, desired);
        self.diff_uniques(current, desired);
        self.diff_checks(current, desired);
        self.diff_foreign_keys(current, desired);
        self.diff_indexes(current, desired);
        self.diff_options(current, desired);
    }

    fn diff_columns(&mut self, current: &Table, desired: &Table) {
        let ignore_quotes = self.options.ignore_quotes;
        for (position, column) in desired.columns.iter().enumerate() {
            let Some(existing) = current.column(&column.name, ignore_quotes) else {
                let position = if position == 0 {
                    Some(ColumnPosition::First)
                } else {
                    desired
                        .columns
                        .get(position - 1)
                        .map(|prev| ColumnPosition::After(prev.name.clone()))
                };
                self.push(DiffOp::AddColumn {
                    table: desired.name.clone(),
                    column: column.clone(),
                    position,
                });
                continue;
            };
            let changes = self.column_changes(existing, column);
            if !changes.is_empty() {
                self.push(DiffOp::ChangeColumn {
                    table: desired.name.clone(),
                    from: existing.clone(),
                    to: column.clone(),
                    changes,
                });
            }
        }
        for column in &current.columns {
            if desired.column(&column.name, ignore_quotes).is_none() {
                self.push(DiffOp::DropColumn {
                    table: desired.name.clone(),
                    name: column.name.clone(),
                });
            }
        }
    }

    fn column_changes(&self, current: &Column, desired: &Column) -> Vec<ColumnChange> {
        let mut changes = Vec::new();
        if !self
            .policy
            .types_equivalent(&current.type_name, &desired.type_name)
        {
            changes.push(ColumnChange::SetType);
        }
        match (current.not_null, desired.not_null) {
            (false, true) => changes.push(ColumnChange::SetNotNull),
            (true, false) => changes.push(ColumnChange::DropNotNull),
            _ => {}
        }
        if !self
            .policy
            .exprs_equivalent(current.default.as_ref(), desired.default.as_ref())
        {
            changes.push(if desired.default.is_none() {
                ColumnChange::DropDefault
            } else {
                ColumnChange::SetDefault
            });
        }
        if current.auto_increment != desired.auto_increment {
            changes.push(ColumnChange::SetAutoIncrement);
        }
        if current.comment != desired.comment {
            changes.push(ColumnChange::SetComment);
        }
        // An omitted charset/collation inherits the table default; only an
        // explicit desired value can conflict.
        if desired.charset.is_some() && current.charset != desired.charset {
            changes.push(ColumnChange::SetCharset);
        }
        if desired.collation.is_some() && current.collation != desired.collation {
            changes.push(ColumnChange::SetCollation);
        }
        if !self
            .policy
            .exprs_equivalent(current.on_update.as_ref(), desired.on_update.as_ref())
        {
            changes.push(ColumnChange::SetOnUpdate);
        }
        let generated_equal = match (&current.generated, &desired.generated) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.stored == b.stored && canonical_expr(&a.expr) == canonical_expr(&b.expr)
            }
            _ => false,
        };
        if !generated_equal {
            changes.push(ColumnChange::SetGenerated);
        }
        changes
    }

    fn diff_primary_key(&mut self, current: &Table, desired: &Table) {
        match (&current.primary_key, &desired.primary_key) {
            (None, None) => {}
            (None, Some(pk)) => self.push(DiffOp::AddPrimaryKey {
                table: desired.name.clone(),
                primary_key: pk.clone(),
            }),
            (Some(pk), None) => self.push(DiffOp::DropPrimaryKey {
                table: desired.name.clone(),
                name: pk.name.clone(),
            }),
            (Some(existing), Some(pk)) => {
                if !index_elems_equivalent(&existing.columns, &pk.columns) {
                    self.push(DiffOp::DropPrimaryKey {
                        table: desired.name.clone(),
                        name: existing.name.clone(),
                    });
                    self.push(DiffOp::AddPrimaryKey {
                        table: desired.name.clone(),
                        primary_key: pk.clone(),
                    });
                }
            }
        }
    }

    fn diff_uniques(&mut self, current: &Table, desired: &Table) {
        let mut matched = vec![false; current.uniques.len()];
        for unique in &desired.uniques {
            let paired = current.uniques.iter().enumerate().find(|(idx, existing)| {
                !matched[*idx] && self.uniques_pair(existing, unique)
            });
            match paired {
                Some((idx, existing)) => {
                    matched[idx] = true;
                    if !index_elems_equivalent(&existing.columns, &unique.columns) {
                        let name = unique_name(&current.name, existing);
                        self.push(DiffOp::DropUnique {
                            table: desired.name.clone(),
                            name,
                        });
                        self.push(DiffOp::AddUnique {
                            table: desired.name.clone(),
                            unique: unique.clone(),
                        });
                    }
                }
                None => self.push(DiffOp::AddUnique {
                    table: desired.name.clone(),
                    unique: unique.clone(),
                }),
            }
        }
        for (idx, existing) in current.uniques.iter().enumerate() {
            if !matched[idx] {
                let name = unique_name(&current.name, existing);
                self.push(DiffOp::DropUnique {
                    table: desired.name.clone(),
                    name,
                });
            }
        }
    }

    fn uniques_pair(&self, a: &UniqueConstraint, b: &UniqueConstraint) -> bool {
        if let (Some(name_a), Some(name_b)) = (&a.name, &b.name) {
            return self.names_match(&name_a.value, &name_b.value);
        }
        index_elems_equivalent(&a.columns, &b.columns)
    }

    fn diff_checks(&mut self, current: &Table, desired: &Table) {
        let mut matched = vec![false; current.checks.len()];
        for check in &desired.checks {
            let paired = current.checks.iter().enumerate().find(|(idx, existing)| {
                !matched[*idx] && self.checks_pair(existing, check)
            });
            match paired {
                Some((idx, existing)) => {
                    matched[idx] = true;
                    let equal = existing.no_inherit == check.no_inherit
                        && self
                            .policy
                            .exprs_equivalent(Some(&existing.expr), Some(&check.expr));
                    if !equal {
                        self.push(DiffOp::DropCheck {
                            table: desired.name.clone(),
                            name: check_name(&current.name, existing),
                        });
                        self.push(DiffOp::AddCheck {
                            table: desired.name.clone(),
                            check: check.clone(),
                        });
                    }
                }
                None => self.push(DiffOp::AddCheck {
                    table: desired.name.clone(),
                    check: check.clone(),
                }),
            }
        }
        for (idx, existing) in current.checks.iter().enumerate() {
            if !matched[idx] {
                self.push(DiffOp::DropCheck {
                    table: desired.name.clone(),
                    name: check_name(&current.name, existing),
                });
            }
        }
    }

    fn checks_pair(&self, a: &CheckConstraint, b: &CheckConstraint) -> bool {
        if let (Some(name_a), Some(name_b)) = (&a.name, &b.name) {
            return self.names_match(&name_a.value, &name_b.value);
        }
        self.policy.exprs_equivalent(Some(&a.expr), Some(&b.expr))
    }

    fn diff_foreign_keys(&mut self, current: &Table, desired: &Table) {
        let mut matched = vec![false; current.foreign_keys.len()];
        for fk in &desired.foreign_keys {
            let paired = current
                .foreign_keys
                .iter()
                .enumerate()
                .find(|(idx, existing)| !matched[*idx] && self.foreign_keys_pair(existing, fk));
            match paired {
                Some((idx, existing)) => {
                    matched[idx] = true;
                    if !self.foreign_keys_equal(existing, fk) {
                        self.push(DiffOp::DropForeignKey {
                            table: desired.name.clone(),
                            name: foreign_key_name(&current.name, existing),
                        });
                        self.push(DiffOp::AddForeignKey {
                            table: desired.name.clone(),
                            foreign_key: fk.clone(),
                        });
                    }
                }
                None => self.push(DiffOp::AddForeignKey {
                    table: desired.name.clone(),
                    foreign_key: fk.clone(),
                }),
            }
        }
        for (idx, existing) in current.foreign_keys.iter().enumerate() {
            if !matched[idx] {
                self.push(DiffOp::DropForeignKey {
                    table: desired.name.clone(),
                    name: foreign_key_name(&current.name, existing),
                });
            }
        }
    }

    fn foreign_keys_pair(&self, a: &ForeignKey, b: &ForeignKey) -> bool {
        if let (Some(name_a), Some(name_b)) = (&a.name, &b.name) {
            return self.names_match(&name_a.value, &name_b.value);
        }
        ident_values(&a.columns) == ident_values(&b.columns)
            && a.reference
                .table
                .matches(&b.reference.table, self.options.ignore_quotes)
    }

    fn foreign_keys_equal(&self, a: &ForeignKey, b: &ForeignKey) -> bool {
        ident_values(&a.columns) == ident_values(&b.columns)
            && a.reference
                .table
                .matches(&b.reference.table, self.options.ignore_quotes)
            && ident_values(&a.reference.columns) == ident_values(&b.reference.columns)
            && action_of(a.reference.on_delete) == action_of(b.reference.on_delete)
            && action_of(a.reference.on_update) == action_of(b.reference.on_update)
    }

    fn create_index(&mut self, table: &QualifiedName, mut index: Index) {
        index.concurrently |= self.options.create_index_concurrently;
        self.push(DiffOp::CreateIndex {
            table: table.clone(),
            index,
        });
    }

    fn diff_indexes(&mut self, current: &Table, desired: &Table) {
        let ignore_quotes = self.options.ignore_quotes;
        for index in &desired.indexes {
            match current.index(&index.name, ignore_quotes) {
                None => self.create_index(&desired.name, index.clone()),
                Some(existing) => {
                    if !self.indexes_equal(existing, index) {
                        self.push(DiffOp::DropIndex {
                            table: desired.name.clone(),
                            name: existing.name.clone(),
                        });
                        self.create_index(&desired.name, index.clone());
                    }
                }
            }
        }
        for index in &current.indexes {
            if desired.index(&index.name, ignore_quotes).is_none() {
                self.push(DiffOp::DropIndex {
                    table: desired.name.clone(),
                    name: index.name.clone(),
                });
            }
        }
    }

    fn indexes_equal(&self, a: &Index, b: &Index) -> bool {
        // An omitted access method means the engine default; only two
        // explicit methods can conflict.
        let method_equal = match (&a.method, &b.method) {
            (Some(method_a), Some(method_b)) => method_a.eq_ignore_ascii_case(method_b),
            _ => true,
        };
        a.unique == b.unique
            && method_equal
            && index_elems_equivalent(&a.columns, &b.columns)
            && self
                .policy
                .exprs_equivalent(a.where_clause.as_ref(), b.where_clause.as_ref())
    }

    fn diff_options(&mut self, current: &Table, desired: &Table) {
        for option in &desired.options {
            // AUTO_INCREMENT is a counter, not schema.
            if option.name.eq_ignore_ascii_case("AUTO_INCREMENT") {
                continue;
            }
            let existing = current
                .options
                .iter()
                .find(|candidate| candidate.name.eq_ignore_ascii_case(&option.name));
            if existing.is_none_or(|candidate| candidate.value != option.value) {
                self.push(DiffOp::SetTableOption {
                    table: desired.name.clone(),
                    option: option.clone(),
                });
            }
        }

        let partition_equal = match (&current.partition, &desired.partition) {
            (None, None) => true,
            (Some(a), Some(b)) => normalize_sql_text(a) == normalize_sql_text(b),
            _ => false,
        };
        if !partition_equal {
            self.push(DiffOp::SetPartition {
                table: desired.name.clone(),
                partition: desired.partition.clone(),
            });
        }
    }
}

fn action_of(action: Option<ReferentialAction>) -> ReferentialAction {
    action.unwrap_or(ReferentialAction::NoAction)
}

fn ident_values(idents: &[Ident]) -> Vec<&str> {
    idents.iter().map(|ident| ident.value.as_str()).collect()
}

pub(super) fn index_elems_equivalent(a: &[IndexElem], b: &[IndexElem]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(elem_a, elem_b)| {
            canonical_expr(&elem_a.expr) == canonical_expr(&elem_b.expr)
                && elem_a.prefix == elem_b.prefix
                && direction_of(elem_a) == direction_of(elem_b)
        })
}

fn direction_of(elem: &IndexElem) -> SortDirection {
    elem.direction.unwrap_or(SortDirection::Asc)
}

/// Fallback names for constraints the source declared anonymously. The live
/// schema always reports generated names, so these only matter when both
/// sides are files.
fn unique_name(table: &QualifiedName, unique: &UniqueConstraint) -> Ident {
    unique.name.clone().unwrap_or_else(|| {
        let column = first_column(&unique.columns);
        Ident::unquoted(format!("{}_{column}_key", table.name.value))
    })
}

fn check_name(table: &QualifiedName, check: &CheckConstraint) -> Ident {
    check
        .name
        .clone()
        .unwrap_or_else(|| Ident::unquoted(format!("{}_check", table.name.value)))
}

fn foreign_key_name(table: &QualifiedName, fk: &ForeignKey) -> Ident {
    fk.name.clone().unwrap_or_else(|| {
        let column = fk
            .columns
            .first()
            .map_or("fk", |ident| ident.value.as_str());
        Ident::unquoted(format!("{}_{column}_fkey", table.name.value))
    })
}

fn first_column(elems: &[IndexElem]) -> String {
    match elems.first().map(|elem| &elem.expr) {
        Some(crate::Expr::Ident(ident)) => ident.value.clone(),
        _ => "expr".to_string(),
    }
}
