//! End-to-end pipeline tests at the operation level: parse both sides,
//! build models, diff and sort, then assert on the resulting operation
//! stream.

use sqldrift_core::builder::{build_schema, BuildOptions};
use sqldrift_core::diff::{diff_schemas, DiffOp, DiffOptions};
use sqldrift_core::model::SchemaModel;
use sqldrift_core::normalize::DefaultEquivalence;
use sqldrift_core::order::sort_ops;
use sqldrift_core::parser::{parse_sql, GrammarProfile};

fn model(sql: &str) -> SchemaModel {
    let profile = GrammarProfile::postgres();
    let statements = parse_sql(sql, &profile).expect("should parse");
    let options = BuildOptions {
        default_schema: Some("public".to_string()),
        ..BuildOptions::default()
    };
    build_schema(statements, &options).expect("should build")
}

fn plan(current: &str, desired: &str, enable_drop: bool) -> Vec<DiffOp> {
    let options = DiffOptions {
        enable_drop,
        max_identifier_length: Some(63),
        ..DiffOptions::default()
    };
    let outcome = diff_schemas(
        &model(current),
        &model(desired),
        &DefaultEquivalence,
        &options,
    );
    sort_ops(outcome.ops)
}

#[test]
fn diff_of_identical_schemas_is_empty() {
    let sql = "
        CREATE TABLE users (
          id bigint NOT NULL,
          email varchar(255) NOT NULL,
          created_at timestamp DEFAULT CURRENT_TIMESTAMP,
          PRIMARY KEY (id),
          CONSTRAINT users_email_key UNIQUE (email)
        );
        CREATE INDEX idx_users_created ON users (created_at);
        CREATE VIEW recent_users AS SELECT id FROM users WHERE created_at > now();
    ";
    assert!(plan(sql, sql, false).is_empty());
}

#[test]
fn no_operation_references_a_table_created_later() {
    let desired = "
        CREATE TABLE users (id bigint, PRIMARY KEY (id));
        CREATE TABLE posts (
          id bigint,
          user_id bigint,
          PRIMARY KEY (id),
          CONSTRAINT posts_user_fkey FOREIGN KEY (user_id) REFERENCES users (id)
        );
        CREATE TABLE comments (
          id bigint,
          post_id bigint,
          PRIMARY KEY (id),
          CONSTRAINT comments_post_fkey FOREIGN KEY (post_id) REFERENCES posts (id)
        );
    ";
    let ops = plan("", desired, false);

    let mut created = Vec::new();
    for op in &ops {
        match op {
            DiffOp::CreateTable(table) => created.push(table.name.name.value.clone()),
            DiffOp::AddForeignKey { foreign_key, .. } => {
                let target = &foreign_key.reference.table.name.value;
                assert!(
                    created.contains(target),
                    "foreign key references {target} before it is created"
                );
            }
            _ => {}
        }
    }
    assert_eq!(created.len(), 3);
}

#[test]
fn circular_references_still_produce_a_runnable_order() {
    let desired = "
        CREATE TABLE a (
          id bigint,
          b_id bigint,
          PRIMARY KEY (id),
          CONSTRAINT a_b_fkey FOREIGN KEY (b_id) REFERENCES b (id)
        );
        CREATE TABLE b (
          id bigint,
          a_id bigint,
          PRIMARY KEY (id),
          CONSTRAINT b_a_fkey FOREIGN KEY (a_id) REFERENCES a (id)
        );
    ";
    let ops = plan("", desired, false);
    let last_create = ops
        .iter()
        .rposition(|op| matches!(op, DiffOp::CreateTable(_)))
        .expect("creates present");
    let first_fk = ops
        .iter()
        .position(|op| matches!(op, DiffOp::AddForeignKey { .. }))
        .expect("fks present");
    assert!(
        last_create < first_fk,
        "every foreign key must follow every create"
    );
}

#[test]
fn reapplying_the_desired_schema_converges() {
    let current = "CREATE TABLE t (a int);";
    let desired = "CREATE TABLE t (a int, b varchar(10) NOT NULL);";
    let first = plan(current, desired, false);
    assert_eq!(first.len(), 1);
    // Once the desired schema is in place, a second run finds nothing.
    assert!(plan(desired, desired, false).is_empty());
}

#[test]
fn drop_guard_holds_back_only_destructive_ops() {
    let current = "CREATE TABLE t (a int, b int); CREATE TABLE gone (id int);";
    let desired = "CREATE TABLE t (a int, c int);";
    let options = DiffOptions {
        enable_drop: false,
        ..DiffOptions::default()
    };
    let outcome = diff_schemas(&model(current), &model(desired), &DefaultEquivalence, &options);
    assert!(outcome
        .ops
        .iter()
        .all(|op| matches!(op, DiffOp::AddColumn { .. })));
    assert_eq!(outcome.skipped.len(), 2);
}

#[test]
fn revoke_is_held_back_without_enable_drop() {
    let current = "CREATE TABLE t (a int); GRANT SELECT ON t TO app;";
    let desired = "CREATE TABLE t (a int);";

    let guarded = diff_schemas(
        &model(current),
        &model(desired),
        &DefaultEquivalence,
        &DiffOptions::default(),
    );
    assert!(guarded.ops.is_empty(), "got: {:?}", guarded.ops);
    assert_eq!(guarded.skipped.len(), 1);
    assert!(matches!(guarded.skipped[0].op, DiffOp::Revoke(_)));

    let permitted = diff_schemas(
        &model(current),
        &model(desired),
        &DefaultEquivalence,
        &DiffOptions {
            enable_drop: true,
            ..DiffOptions::default()
        },
    );
    assert!(permitted
        .ops
        .iter()
        .any(|op| matches!(op, DiffOp::Revoke(_))));
}

#[test]
fn qualified_and_bare_names_compare_equal_under_default_schema() {
    let current = "CREATE TABLE public.users (id int);";
    let desired = "CREATE TABLE users (id int);";
    assert!(plan(current, desired, false).is_empty());
}
