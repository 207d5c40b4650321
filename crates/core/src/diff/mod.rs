//! Schema comparison. Walks current and desired [`SchemaModel`]s bucket by
//! bucket and emits the operations that turn one into the other. Destructive
//! operations are withheld behind the drop guard and reported as skipped.

mod objects;
mod ops;
mod tables;

pub use ops::{ColumnChange, DiffOp, DiffOutcome, SkipReason, SkippedOp};

use crate::model::SchemaModel;
use crate::normalize::EquivalencePolicy;

#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Allow DROP TABLE / DROP COLUMN and friends. Off by default.
    pub enable_drop: bool,
    pub ignore_quotes: bool,
    /// Pairs names that the server truncated (generated constraint names).
    pub max_identifier_length: Option<usize>,
    /// Emit `CREATE OR REPLACE VIEW` instead of drop-and-create.
    pub replace_view: bool,
    /// Flag new indexes for concurrent creation where the dialect can.
    pub create_index_concurrently: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            enable_drop: false,
            ignore_quotes: true,
            max_identifier_length: None,
            replace_view: false,
            create_index_concurrently: false,
        }
    }
}

/// Compares two schema models and returns the migration operations.
pub fn diff_schemas(
    current: &SchemaModel,
    desired: &SchemaModel,
    policy: &dyn EquivalencePolicy,
    options: &DiffOptions,
) -> DiffOutcome {
    DiffEngine {
        policy,
        options,
        ops: Vec::new(),
        skipped: Vec::new(),
    }
    .run(current, desired)
}

pub(crate) struct DiffEngine<'a> {
    pub(crate) policy: &'a dyn EquivalencePolicy,
    pub(crate) options: &'a DiffOptions,
    ops: Vec<DiffOp>,
    skipped: Vec<SkippedOp>,
}

impl DiffEngine<'_> {
    fn run(mut self, current: &SchemaModel, desired: &SchemaModel) -> DiffOutcome {
        self.diff_namespaces(current, desired);
        self.diff_enums(current, desired);
        self.diff_sequences(current, desired);
        self.diff_tables(current, desired);
        self.diff_views(current, desired);
        self.diff_triggers(current, desired);
        self.diff_policies(current, desired);
        self.diff_privileges(current, desired);
        DiffOutcome {
            ops: self.ops,
            skipped: self.skipped,
        }
    }

    pub(crate) fn push(&mut self, op: DiffOp) {
        if op.is_destructive() && !self.options.enable_drop {
            self.skipped.push(SkippedOp {
                op,
                reason: SkipReason::DropGuard,
            });
        } else {
            self.ops.push(op);
        }
    }

    pub(crate) fn names_match(&self, a: &str, b: &str) -> bool {
        crate::normalize::names_match_with_truncation(a, b, self.options.max_identifier_length)
    }
}

#[cfg(test)]
mod diff_tests {
    use super::*;
    use crate::builder::{build_schema, BuildOptions};
    use crate::normalize::DefaultEquivalence;
    use crate::parser::{parse_sql, GrammarProfile};

    fn model(profile: &GrammarProfile, sql: &str) -> SchemaModel {
        let statements = parse_sql(sql, profile).expect("should parse");
        let options = BuildOptions {
            default_schema: profile.default_schema.map(str::to_string),
            ..BuildOptions::default()
        };
        build_schema(statements, &options).expect("should build")
    }

    fn diff(current: &str, desired: &str, options: &DiffOptions) -> DiffOutcome {
        let profile = GrammarProfile::postgres();
        diff_schemas(
            &model(&profile, current),
            &model(&profile, desired),
            &DefaultEquivalence,
            options,
        )
    }

    #[test]
    fn identical_schemas_produce_nothing() {
        let sql = "CREATE TABLE users (id bigint NOT NULL, email varchar(255), PRIMARY KEY (id));";
        let outcome = diff(sql, sql, &DiffOptions::default());
        assert!(outcome.is_empty(), "got {:?}", outcome.ops);
    }

    #[test]
    fn spelling_differences_produce_nothing() {
        let current = "CREATE TABLE t (x numeric DEFAULT 0.0, ts timestamp DEFAULT CURRENT_TIMESTAMP());";
        let desired = "CREATE TABLE t (\"x\" numeric DEFAULT 0, ts timestamp DEFAULT current_timestamp);";
        let outcome = diff(current, desired, &DiffOptions::default());
        assert!(outcome.is_empty(), "got {:?}", outcome.ops);
    }

    #[test]
    fn new_table_is_created_with_trailing_foreign_keys() {
        let current = "CREATE TABLE users (id bigint, PRIMARY KEY (id));";
        let desired = "CREATE TABLE users (id bigint, PRIMARY KEY (id));
            CREATE TABLE posts (
              id bigint,
              user_id bigint,
              PRIMARY KEY (id),
              CONSTRAINT posts_user_fk FOREIGN KEY (user_id) REFERENCES users (id)
            );";
        let outcome = diff(current, desired, &DiffOptions::default());
        let create = outcome
            .ops
            .iter()
            .position(|op| matches!(op, DiffOp::CreateTable(t) if t.name.name.value == "posts"))
            .expect("create table op");
        let fk = outcome
            .ops
            .iter()
            .position(|op| matches!(op, DiffOp::AddForeignKey { .. }))
            .expect("add fk op");
        assert!(create < fk);
        // The create itself must not carry the foreign key.
        let DiffOp::CreateTable(table) = &outcome.ops[create] else {
            unreachable!()
        };
        assert!(table.foreign_keys.is_empty());
    }

    #[test]
    fn drops_are_guarded() {
        let current = "CREATE TABLE a (id int); CREATE TABLE b (id int);";
        let desired = "CREATE TABLE a (id int);";
        let outcome = diff(current, desired, &DiffOptions::default());
        assert!(outcome.ops.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].reason, SkipReason::DropGuard);

        let outcome = diff(
            current,
            desired,
            &DiffOptions {
                enable_drop: true,
                ..DiffOptions::default()
            },
        );
        assert!(matches!(outcome.ops[..], [DiffOp::DropTable { .. }]));
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn column_change_lists_what_changed() {
        let current = "CREATE TABLE t (name varchar(100));";
        let desired = "CREATE TABLE t (name varchar(200) NOT NULL);";
        let outcome = diff(current, desired, &DiffOptions::default());
        let [DiffOp::ChangeColumn { changes, .. }] = &outcome.ops[..] else {
            panic!("expected one change, got {:?}", outcome.ops);
        };
        assert!(changes.contains(&ColumnChange::SetType));
        assert!(changes.contains(&ColumnChange::SetNotNull));
    }

    #[test]
    fn enum_values_append_in_place() {
        let current = "CREATE TYPE mood AS ENUM ('sad', 'happy');";
        let desired = "CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');";
        let outcome = diff(current, desired, &DiffOptions::default());
        let [DiffOp::AddEnumValue { value, before, .. }] = &outcome.ops[..] else {
            panic!("expected enum add, got {:?}", outcome.ops);
        };
        assert_eq!(value, "ok");
        assert_eq!(before.as_deref(), Some("happy"));
    }

    #[test]
    fn view_change_uses_replace_when_supported() {
        let current = "CREATE TABLE t (a int, b int); CREATE VIEW v AS SELECT a FROM t;";
        let desired = "CREATE TABLE t (a int, b int); CREATE VIEW v AS SELECT a, b FROM t;";
        let outcome = diff(
            current,
            desired,
            &DiffOptions {
                replace_view: true,
                ..DiffOptions::default()
            },
        );
        assert!(matches!(outcome.ops[..], [DiffOp::ReplaceView(_)]));

        let outcome = diff(current, desired, &DiffOptions::default());
        assert!(matches!(
            outcome.ops[..],
            [DiffOp::DropView { .. }, DiffOp::CreateView(_)]
        ));
    }
}
