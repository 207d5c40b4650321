//! Text output for plans: what dry runs print and what apply logs echo.

use crate::MigrationStatement;

pub const NOTHING_MODIFIED: &str = "-- Nothing is modified --";
pub const SKIPPED_PREFIX: &str = "-- Skipped: ";

/// A fully generated migration: the statements to run, and the destructive
/// ones held back by the drop guard, already rendered to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub statements: Vec<MigrationStatement>,
    pub skipped: Vec<MigrationStatement>,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.skipped.is_empty()
    }
}

/// Renders a plan as SQL text. With `wrap_transactions`, consecutive
/// transactional statements are bracketed with BEGIN/COMMIT the way the
/// executor will run them.
#[must_use]
pub fn render_plan(plan: &Plan, wrap_transactions: bool) -> String {
    if plan.is_empty() {
        return format!("{NOTHING_MODIFIED}\n");
    }

    let mut out = String::new();
    let mut index = 0;
    while index < plan.statements.len() {
        let statement = &plan.statements[index];
        if !wrap_transactions || !statement.transactional {
            out.push_str(&statement.sql);
            out.push_str(";\n");
            index += 1;
            continue;
        }
        let batch_end = plan.statements[index..]
            .iter()
            .position(|candidate| !candidate.transactional)
            .map_or(plan.statements.len(), |offset| index + offset);
        out.push_str("BEGIN;\n");
        for statement in &plan.statements[index..batch_end] {
            out.push_str(&statement.sql);
            out.push_str(";\n");
        }
        out.push_str("COMMIT;\n");
        index = batch_end;
    }

    for statement in &plan.skipped {
        out.push_str(SKIPPED_PREFIX);
        out.push_str(&statement.sql);
        out.push_str(";\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_says_so() {
        assert_eq!(render_plan(&Plan::default(), false), "-- Nothing is modified --\n");
    }

    #[test]
    fn skipped_statements_render_as_comments() {
        let plan = Plan {
            statements: vec![MigrationStatement::new("CREATE TABLE a (id int)")],
            skipped: vec![MigrationStatement::new("DROP TABLE b")],
        };
        let rendered = render_plan(&plan, false);
        assert_eq!(
            rendered,
            "CREATE TABLE a (id int);\n-- Skipped: DROP TABLE b;\n"
        );
    }

    #[test]
    fn transactional_runs_are_bracketed() {
        let plan = Plan {
            statements: vec![
                MigrationStatement::new("ALTER TABLE t ADD COLUMN a int"),
                MigrationStatement::new("ALTER TABLE t ADD COLUMN b int"),
                MigrationStatement::non_transactional(
                    "CREATE INDEX CONCURRENTLY idx_a ON t (a)",
                ),
            ],
            skipped: Vec::new(),
        };
        let rendered = render_plan(&plan, true);
        assert_eq!(
            rendered,
            "BEGIN;\nALTER TABLE t ADD COLUMN a int;\nALTER TABLE t ADD COLUMN b int;\nCOMMIT;\nCREATE INDEX CONCURRENTLY idx_a ON t (a);\n"
        );
    }
}
