//! Deterministic ordering of migration operations: phases first (drops
//! before creates, foreign keys last), then a topological pass inside the
//! create-table and create-view phases so nothing references an object that
//! does not exist yet.

use crate::diff::DiffOp;
use crate::QualifiedName;

/// Execution phase of an operation. Variant order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    DropTriggers,
    DropPolicies,
    Revoke,
    DropViews,
    DropForeignKeys,
    DropConstraints,
    DropIndexes,
    DropColumns,
    DropTables,
    DropObjects,
    CreateSchemas,
    CreateExtensions,
    CreateEnums,
    CreateSequences,
    CreateTables,
    AlterTables,
    AddConstraints,
    CreateIndexes,
    /// Always after every create in the run; reference cycles between new
    /// tables are resolved by adding all foreign keys at the end.
    AddForeignKeys,
    CreateViews,
    CreateTriggers,
    CreatePolicies,
    Grant,
}

fn phase_of(op: &DiffOp) -> Phase {
    match op {
        DiffOp::DropTrigger { .. } => Phase::DropTriggers,
        DiffOp::DropPolicy { .. } => Phase::DropPolicies,
        DiffOp::Revoke(_) => Phase::Revoke,
        DiffOp::DropView { .. } => Phase::DropViews,
        DiffOp::DropForeignKey { .. } => Phase::DropForeignKeys,
        DiffOp::DropPrimaryKey { .. } | DiffOp::DropUnique { .. } | DiffOp::DropCheck { .. } => {
            Phase::DropConstraints
        }
        DiffOp::DropIndex { .. } => Phase::DropIndexes,
        DiffOp::DropColumn { .. } => Phase::DropColumns,
        DiffOp::DropTable { .. } => Phase::DropTables,
        DiffOp::DropSequence { .. } | DiffOp::DropEnum { .. } | DiffOp::DropExtension { .. } => {
            Phase::DropObjects
        }
        DiffOp::CreateSchema { .. } => Phase::CreateSchemas,
        DiffOp::CreateExtension { .. } => Phase::CreateExtensions,
        DiffOp::CreateEnum(_) | DiffOp::AddEnumValue { .. } => Phase::CreateEnums,
        DiffOp::CreateSequence(_) | DiffOp::AlterSequence(_) => Phase::CreateSequences,
        DiffOp::CreateTable(_) => Phase::CreateTables,
        DiffOp::AddColumn { .. }
        | DiffOp::ChangeColumn { .. }
        | DiffOp::SetTableOption { .. }
        | DiffOp::SetPartition { .. } => Phase::AlterTables,
        DiffOp::AddPrimaryKey { .. } | DiffOp::AddUnique { .. } | DiffOp::AddCheck { .. } => {
            Phase::AddConstraints
        }
        DiffOp::CreateIndex { .. } => Phase::CreateIndexes,
        DiffOp::AddForeignKey { .. } => Phase::AddForeignKeys,
        DiffOp::CreateView(_) | DiffOp::ReplaceView(_) => Phase::CreateViews,
        DiffOp::CreateTrigger(_) => Phase::CreateTriggers,
        DiffOp::CreatePolicy(_) => Phase::CreatePolicies,
        DiffOp::Grant(_) => Phase::Grant,
    }
}

/// Orders operations for execution. Stable within a phase, so the output is
/// deterministic for a given input.
#[must_use]
pub fn sort_ops(mut ops: Vec<DiffOp>) -> Vec<DiffOp> {
    ops.sort_by_key(phase_of);

    let tables_start = ops.partition_point(|op| phase_of(op) < Phase::CreateTables);
    let tables_end = ops.partition_point(|op| phase_of(op) <= Phase::CreateTables);
    let edges = foreign_key_edges(&ops);
    topo_sort(&mut ops[tables_start..tables_end], |op| match op {
        DiffOp::CreateTable(table) => Some(table.name.clone()),
        _ => None,
    }, &edges);

    let views_start = ops.partition_point(|op| phase_of(op) < Phase::CreateViews);
    let views_end = ops.partition_point(|op| phase_of(op) <= Phase::CreateViews);
    let view_edges = view_edges(&ops[views_start..views_end]);
    topo_sort(&mut ops[views_start..views_end], |op| match op {
        DiffOp::CreateView(view) | DiffOp::ReplaceView(view) => Some(view.name.clone()),
        _ => None,
    }, &view_edges);

    ops
}

/// `(before, after)` pairs derived from the foreign keys being added in this
/// run.
fn foreign_key_edges(ops: &[DiffOp]) -> Vec<(QualifiedName, QualifiedName)> {
    ops.iter()
        .filter_map(|op| match op {
            DiffOp::AddForeignKey { table, foreign_key } => Some((
                foreign_key.reference.table.clone(),
                table.clone(),
            )),
            _ => None,
        })
        .filter(|(before, after)| !before.matches(after, true))
        .collect()
}

/// A view depends on another view in the batch when its query mentions that
/// view's name as a word. Cheap token scan; false positives only cost
/// ordering, never correctness.
fn view_edges(views: &[DiffOp]) -> Vec<(QualifiedName, QualifiedName)> {
    let names: Vec<&QualifiedName> = views
        .iter()
        .filter_map(|op| match op {
            DiffOp::CreateView(view) | DiffOp::ReplaceView(view) => Some(&view.name),
            _ => None,
        })
        .collect();
    let mut edges = Vec::new();
    for op in views {
        let (DiffOp::CreateView(view) | DiffOp::ReplaceView(view)) = op else {
            continue;
        };
        for name in &names {
            if name.matches(&view.name, true) {
                continue;
            }
            if mentions_word(&view.query, &name.name.value) {
                edges.push(((*name).clone(), view.name.clone()));
            }
        }
    }
    edges
}

fn mentions_word(text: &str, word: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let word = word.to_ascii_lowercase();
    let mut rest = lower.as_str();
    while let Some(idx) = rest.find(&word) {
        let before_ok = idx == 0
            || !rest.as_bytes()[idx - 1].is_ascii_alphanumeric()
                && rest.as_bytes()[idx - 1] != b'_';
        let after = idx + word.len();
        let after_ok = after >= rest.len()
            || !rest.as_bytes()[after].is_ascii_alphanumeric() && rest.as_bytes()[after] != b'_';
        if before_ok && after_ok {
            return true;
        }
        rest = &rest[idx + 1..];
    }
    false
}

/// Kahn's algorithm over a slice, stable on the original order. On a cycle
/// the remaining operations keep their original order; foreign keys trail
/// every create, so a table cycle still executes.
fn topo_sort(
    ops: &mut [DiffOp],
    name_of: impl Fn(&DiffOp) -> Option<QualifiedName>,
    edges: &[(QualifiedName, QualifiedName)],
) {
    let names: Vec<Option<QualifiedName>> = ops.iter().map(&name_of).collect();
    let index_of = |name: &QualifiedName| {
        names
            .iter()
            .position(|candidate| candidate.as_ref().is_some_and(|c| c.matches(name, true)))
    };

    let mut indegree = vec![0usize; ops.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ops.len()];
    for (before, after) in edges {
        let (Some(from), Some(to)) = (index_of(before), index_of(after)) else {
            continue;
        };
        adjacency[from].push(to);
        indegree[to] += 1;
    }

    let mut placed = vec![false; ops.len()];
    let mut order = Vec::with_capacity(ops.len());
    loop {
        let next = (0..ops.len()).find(|&idx| !placed[idx] && indegree[idx] == 0);
        let Some(idx) = next else { break };
        placed[idx] = true;
        order.push(idx);
        for &to in &adjacency[idx] {
            indegree[to] = indegree[to].saturating_sub(1);
        }
    }
    // Cycle remainder, original order.
    for idx in 0..ops.len() {
        if !placed[idx] {
            order.push(idx);
        }
    }

    let mut reordered: Vec<Option<DiffOp>> = ops.iter().cloned().map(Some).collect();
    for (slot, &source) in order.iter().enumerate() {
        ops[slot] = reordered[source].take().expect("each op placed once");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ForeignKey;
    use crate::model::{Table, View};
    use crate::{Ident, QualifiedName};

    fn name(value: &str) -> QualifiedName {
        QualifiedName::bare(value)
    }

    fn create_table(table: &str) -> DiffOp {
        DiffOp::CreateTable(Table::new(name(table)))
    }

    fn add_fk(table: &str, references: &str) -> DiffOp {
        DiffOp::AddForeignKey {
            table: name(table),
            foreign_key: ForeignKey {
                name: Some(Ident::unquoted(format!("{table}_{references}_fkey"))),
                columns: vec![Ident::unquoted("ref_id")],
                reference: crate::ast::ForeignKeyReference {
                    table: name(references),
                    columns: vec![Ident::unquoted("id")],
                    on_delete: None,
                    on_update: None,
                },
            },
        }
    }

    fn positions(ops: &[DiffOp]) -> Vec<String> {
        ops.iter()
            .map(|op| match op {
                DiffOp::CreateTable(table) => format!("create {}", table.name),
                DiffOp::AddForeignKey { table, .. } => format!("fk {table}"),
                DiffOp::DropTable { name } => format!("drop {name}"),
                DiffOp::CreateView(view) => format!("view {}", view.name),
                _ => "other".to_string(),
            })
            .collect()
    }

    #[test]
    fn referenced_tables_come_first() {
        let ops = vec![
            create_table("posts"),
            create_table("users"),
            add_fk("posts", "users"),
        ];
        let sorted = sort_ops(ops);
        assert_eq!(
            positions(&sorted),
            vec!["create users", "create posts", "fk posts"]
        );
    }

    #[test]
    fn cycles_fall_back_to_declaration_order_with_fks_last() {
        let ops = vec![
            create_table("a"),
            create_table("b"),
            add_fk("a", "b"),
            add_fk("b", "a"),
        ];
        let sorted = sort_ops(ops);
        assert_eq!(
            positions(&sorted),
            vec!["create a", "create b", "fk a", "fk b"]
        );
    }

    #[test]
    fn drops_precede_creates() {
        let ops = vec![create_table("new"), DiffOp::DropTable { name: name("old") }];
        let sorted = sort_ops(ops);
        assert_eq!(positions(&sorted), vec!["drop old", "create new"]);
    }

    #[test]
    fn views_order_by_reference() {
        let base = View {
            name: name("v_base"),
            materialized: false,
            columns: Vec::new(),
            query: "SELECT id FROM users".to_string(),
            security: None,
        };
        let derived = View {
            name: name("v_derived"),
            materialized: false,
            columns: Vec::new(),
            query: "SELECT id FROM v_base WHERE id > 0".to_string(),
            security: None,
        };
        let sorted = sort_ops(vec![
            DiffOp::CreateView(derived),
            DiffOp::CreateView(base),
        ]);
        assert_eq!(positions(&sorted), vec!["view v_base", "view v_derived"]);
    }
}
