use crate::{Expr, Ident, QualifiedName, TypeName, Value};

/// A parsed DDL statement. All four dialect grammars produce these same
/// nodes; dialect differences are production toggles in the grammar profile,
/// not separate type hierarchies.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    CreateIndex(CreateIndex),
    CreateView(CreateView),
    CreateTrigger(CreateTrigger),
    CreateSequence(CreateSequence),
    CreateType(CreateType),
    CreateExtension { name: Ident, if_not_exists: bool },
    CreateSchema { name: Ident, if_not_exists: bool },
    CreatePolicy(CreatePolicy),
    Grant(PrivilegeStatement),
    Revoke(PrivilegeStatement),
    Drop(DropStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: QualifiedName,
    pub if_not_exists: bool,
    pub columns: Vec<Column>,
    pub constraints: Vec<TableConstraint>,
    pub options: Vec<TableOption>,
    /// Raw `PARTITION BY ...` tail, compared textually after whitespace
    /// normalization.
    pub partition: Option<String>,
}

/// A column definition. Inline PRIMARY KEY / UNIQUE / REFERENCES flags are
/// lifted to table-level constraints by the schema builder; the flags here
/// record only what the source said.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: Ident,
    pub type_name: TypeName,
    pub not_null: bool,
    pub default: Option<Expr>,
    pub auto_increment: bool,
    pub generated: Option<GeneratedColumn>,
    pub comment: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    /// MySQL `ON UPDATE CURRENT_TIMESTAMP`.
    pub on_update: Option<Expr>,
    pub inline_primary_key: bool,
    pub inline_unique: bool,
    pub inline_references: Option<ForeignKeyReference>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: TypeName) -> Self {
        Self {
            name: Ident::unquoted(name),
            type_name,
            not_null: false,
            default: None,
            auto_increment: false,
            generated: None,
            comment: None,
            charset: None,
            collation: None,
            on_update: None,
            inline_primary_key: false,
            inline_unique: false,
            inline_references: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedColumn {
    pub expr: Expr,
    pub stored: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey(PrimaryKey),
    Unique(UniqueConstraint),
    ForeignKey(ForeignKey),
    Check(CheckConstraint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey {
    pub name: Option<Ident>,
    pub columns: Vec<IndexElem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub name: Option<Ident>,
    pub columns: Vec<IndexElem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub name: Option<Ident>,
    pub columns: Vec<Ident>,
    pub reference: ForeignKeyReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyReference {
    pub table: QualifiedName,
    pub columns: Vec<Ident>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub name: Option<Ident>,
    pub expr: Expr,
    pub no_inherit: bool,
}

/// One indexed element: usually a plain column, optionally an expression,
/// a MySQL prefix length, or an explicit sort direction.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexElem {
    pub expr: Expr,
    pub prefix: Option<u32>,
    pub direction: Option<SortDirection>,
}

impl IndexElem {
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            expr: Expr::ident(name),
            prefix: None,
            direction: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableOption {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: QualifiedName,
    pub actions: Vec<AlterAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn {
        column: Column,
        position: Option<ColumnPosition>,
    },
    DropColumn {
        name: Ident,
    },
    /// MySQL `MODIFY`/`CHANGE` full redefinition.
    ModifyColumn {
        from: Option<Ident>,
        column: Column,
        position: Option<ColumnPosition>,
    },
    AlterColumnSetDefault {
        name: Ident,
        default: Option<Expr>,
    },
    AlterColumnType {
        name: Ident,
        type_name: TypeName,
    },
    AlterColumnSetNotNull {
        name: Ident,
        not_null: bool,
    },
    AddConstraint(TableConstraint),
    DropConstraint {
        name: Ident,
    },
    DropPrimaryKey,
    DropForeignKey {
        name: Ident,
    },
    DropIndex {
        name: Ident,
    },
    RenameTo {
        name: QualifiedName,
    },
    RenameColumn {
        from: Ident,
        to: Ident,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: Option<Ident>,
    pub table: QualifiedName,
    pub columns: Vec<IndexElem>,
    pub unique: bool,
    pub concurrently: bool,
    pub if_not_exists: bool,
    pub method: Option<String>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub name: QualifiedName,
    pub or_replace: bool,
    pub materialized: bool,
    pub columns: Vec<Ident>,
    /// The defining query, verbatim; compared after whitespace collapsing.
    pub query: String,
    pub security: Option<ViewSecurity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSecurity {
    Definer,
    Invoker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTrigger {
    pub name: Ident,
    pub table: QualifiedName,
    /// BEFORE / AFTER / INSTEAD OF.
    pub timing: String,
    /// INSERT / UPDATE / DELETE, in declaration order.
    pub events: Vec<String>,
    pub for_each_row: bool,
    /// Trigger body, verbatim.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSequence {
    pub name: QualifiedName,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub start: Option<i64>,
    pub cache: Option<i64>,
    pub cycle: bool,
}

/// `CREATE TYPE ... AS ENUM (...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateType {
    pub name: QualifiedName,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePolicy {
    pub name: Ident,
    pub table: QualifiedName,
    /// Everything after the table name, verbatim (USING / WITH CHECK / roles).
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivilegeStatement {
    pub privileges: Vec<String>,
    pub object: QualifiedName,
    pub grantees: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropStatement {
    pub kind: ObjectKind,
    pub name: QualifiedName,
    pub if_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
    MaterializedView,
    Index,
    Trigger,
    Sequence,
    Type,
    Extension,
    Schema,
    Policy,
}

impl ObjectKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::MaterializedView => "MATERIALIZED VIEW",
            Self::Index => "INDEX",
            Self::Trigger => "TRIGGER",
            Self::Sequence => "SEQUENCE",
            Self::Type => "TYPE",
            Self::Extension => "EXTENSION",
            Self::Schema => "SCHEMA",
            Self::Policy => "POLICY",
        }
    }
}
