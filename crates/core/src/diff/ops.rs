//! Migration operations produced by the comparison. Dialect generators turn
//! these into concrete DDL; the dependency sorter orders them.

use crate::ast::{
    Column, ColumnPosition, CreatePolicy, CreateSequence, CreateType, ForeignKey, PrimaryKey,
    PrivilegeStatement, TableOption,
};
use crate::model::{Index, Table, Trigger, View};
use crate::{Ident, QualifiedName};

#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    CreateSchema {
        name: Ident,
    },
    CreateExtension {
        name: Ident,
    },
    DropExtension {
        name: Ident,
    },
    CreateEnum(CreateType),
    /// `ALTER TYPE ... ADD VALUE`, optionally positioned before an existing
    /// label.
    AddEnumValue {
        name: QualifiedName,
        value: String,
        before: Option<String>,
    },
    DropEnum {
        name: QualifiedName,
    },
    CreateSequence(CreateSequence),
    /// Carries the full desired definition; sequences are cheap to restate.
    AlterSequence(CreateSequence),
    DropSequence {
        name: QualifiedName,
    },
    /// The table is created without its foreign keys; those always follow as
    /// separate [`DiffOp::AddForeignKey`] operations so reference cycles
    /// cannot produce forward references.
    CreateTable(Table),
    DropTable {
        name: QualifiedName,
    },
    AddColumn {
        table: QualifiedName,
        column: Column,
        position: Option<ColumnPosition>,
    },
    DropColumn {
        table: QualifiedName,
        name: Ident,
    },
    ChangeColumn {
        table: QualifiedName,
        from: Column,
        to: Column,
        changes: Vec<ColumnChange>,
    },
    AddPrimaryKey {
        table: QualifiedName,
        primary_key: PrimaryKey,
    },
    DropPrimaryKey {
        table: QualifiedName,
        name: Option<Ident>,
    },
    AddUnique {
        table: QualifiedName,
        unique: crate::ast::UniqueConstraint,
    },
    DropUnique {
        table: QualifiedName,
        name: Ident,
    },
    AddCheck {
        table: QualifiedName,
        check: crate::ast::CheckConstraint,
    },
    DropCheck {
        table: QualifiedName,
        name: Ident,
    },
    AddForeignKey {
        table: QualifiedName,
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        table: QualifiedName,
        name: Ident,
    },
    CreateIndex {
        table: QualifiedName,
        index: Index,
    },
    DropIndex {
        table: QualifiedName,
        name: Ident,
    },
    SetTableOption {
        table: QualifiedName,
        option: TableOption,
    },
    SetPartition {
        table: QualifiedName,
        partition: Option<String>,
    },
    CreateView(View),
    /// `CREATE OR REPLACE VIEW`; only emitted when the dialect supports it.
    ReplaceView(View),
    DropView {
        name: QualifiedName,
        materialized: bool,
    },
    CreateTrigger(Trigger),
    DropTrigger {
        name: Ident,
        table: QualifiedName,
    },
    CreatePolicy(CreatePolicy),
    DropPolicy {
        name: Ident,
        table: QualifiedName,
    },
    Grant(PrivilegeStatement),
    Revoke(PrivilegeStatement),
}

/// What exactly changed on a column. Generators that can only restate the
/// whole column (MySQL `MODIFY`) ignore the detail; generators with discrete
/// clauses (PostgreSQL `ALTER COLUMN`) emit one statement per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnChange {
    SetType,
    SetNotNull,
    DropNotNull,
    SetDefault,
    DropDefault,
    SetComment,
    SetAutoIncrement,
    SetGenerated,
    SetCharset,
    SetCollation,
    SetOnUpdate,
}

/// Why an operation was withheld from the migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Destructive and drops are not enabled.
    DropGuard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOp {
    pub op: DiffOp,
    pub reason: SkipReason,
}

/// The comparison result: operations to run, plus the destructive ones that
/// were held back so the output can surface them as comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffOutcome {
    pub ops: Vec<DiffOp>,
    pub skipped: Vec<SkippedOp>,
}

impl DiffOutcome {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.skipped.is_empty()
    }
}

impl DiffOp {
    /// Destructive operations are withheld unless drops are enabled.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropTable { .. }
                | Self::DropColumn { .. }
                | Self::DropView { .. }
                | Self::DropSequence { .. }
                | Self::DropEnum { .. }
                | Self::DropExtension { .. }
                | Self::Revoke(_)
        )
    }
}
