//! The schema model: parsed DDL folded into one object per database entity.
//! Declaration order is preserved so generated DDL stays stable across runs.

use crate::ast::{
    CheckConstraint, Column, CreatePolicy, CreateSequence, CreateType, ForeignKey, IndexElem,
    PrimaryKey, PrivilegeStatement, TableOption, UniqueConstraint, ViewSecurity,
};
use crate::{Ident, QualifiedName};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    pub schemas: Vec<Ident>,
    pub extensions: Vec<Ident>,
    pub types: Vec<CreateType>,
    pub sequences: Vec<CreateSequence>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub triggers: Vec<Trigger>,
    pub policies: Vec<CreatePolicy>,
    pub privileges: Vec<PrivilegeStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: QualifiedName,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub uniques: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<CheckConstraint>,
    pub indexes: Vec<Index>,
    pub options: Vec<TableOption>,
    pub partition: Option<String>,
}

impl Table {
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: None,
            uniques: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            indexes: Vec::new(),
            options: Vec::new(),
            partition: None,
        }
    }

    #[must_use]
    pub fn column(&self, name: &Ident, ignore_quotes: bool) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.matches(name, ignore_quotes))
    }

    pub fn column_mut(&mut self, name: &Ident, ignore_quotes: bool) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|column| column.name.matches(name, ignore_quotes))
    }

    #[must_use]
    pub fn index(&self, name: &Ident, ignore_quotes: bool) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|index| index.name.matches(name, ignore_quotes))
    }
}

/// A secondary index owned by its table. The name is always resolved: an
/// unnamed MySQL `KEY (col)` gets the engine's default, the first column
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: Ident,
    pub columns: Vec<IndexElem>,
    pub unique: bool,
    pub method: Option<String>,
    pub where_clause: Option<crate::Expr>,
    pub concurrently: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: QualifiedName,
    pub materialized: bool,
    pub columns: Vec<Ident>,
    pub query: String,
    pub security: Option<ViewSecurity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub name: Ident,
    pub table: QualifiedName,
    pub timing: String,
    pub events: Vec<String>,
    pub for_each_row: bool,
    pub body: String,
}

impl SchemaModel {
    #[must_use]
    pub fn table(&self, name: &QualifiedName, ignore_quotes: bool) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.name.matches(name, ignore_quotes))
    }

    pub fn table_mut(
        &mut self,
        name: &QualifiedName,
        ignore_quotes: bool,
    ) -> Option<&mut Table> {
        self.tables
            .iter_mut()
            .find(|table| table.name.matches(name, ignore_quotes))
    }

    #[must_use]
    pub fn view(&self, name: &QualifiedName, ignore_quotes: bool) -> Option<&View> {
        self.views
            .iter()
            .find(|view| view.name.matches(name, ignore_quotes))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.extensions.is_empty()
            && self.types.is_empty()
            && self.sequences.is_empty()
            && self.tables.is_empty()
            && self.views.is_empty()
            && self.triggers.is_empty()
            && self.policies.is_empty()
            && self.privileges.is_empty()
    }
}
