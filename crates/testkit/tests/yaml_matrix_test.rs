use sqldrift_dialect_mssql::MssqlDialect;
use sqldrift_dialect_mysql::MysqlDialect;
use sqldrift_dialect_postgres::PostgresDialect;
use sqldrift_dialect_sqlite::SqliteDialect;
use sqldrift_testkit::{load_test_cases_from_str, run_offline_test, TestResult};

fn assert_all_pass(dialect: &dyn sqldrift_core::Dialect, yaml: &str) {
    let cases = load_test_cases_from_str(yaml).expect("cases should load");
    for (name, case) in &cases {
        match run_offline_test(dialect, case) {
            TestResult::Passed => {}
            TestResult::Failed(message) => panic!("case `{name}` failed: {message}"),
        }
    }
}

#[test]
fn mysql_cases() {
    assert_all_pass(
        &MysqlDialect::new(),
        r#"
add_column_in_place:
  current: CREATE TABLE t (a int, c int);
  desired: CREATE TABLE t (a int, b int, c int);
  up: |
    ALTER TABLE `t` ADD COLUMN `b` int AFTER `a`;
  down: |
    ALTER TABLE `t` DROP COLUMN `b`;
  enable_drop: true

widen_column:
  current: CREATE TABLE t (name varchar(100));
  desired: CREATE TABLE t (name varchar(200) NOT NULL DEFAULT 'x');
  up: |
    ALTER TABLE `t` MODIFY COLUMN `name` varchar(200) NOT NULL DEFAULT 'x';
"#,
    );
}

#[test]
fn mysql_drop_guard_surfaces_skipped_statements() {
    assert_all_pass(
        &MysqlDialect::new(),
        r#"
guarded_drop:
  current: |
    CREATE TABLE a (id int);
    CREATE TABLE b (id int);
  desired: CREATE TABLE a (id int);
  up: |
    -- Skipped: DROP TABLE `b`;
"#,
    );
}

#[test]
fn postgres_cases() {
    assert_all_pass(
        &PostgresDialect::new(),
        r#"
new_table_with_index:
  current: ''
  desired: |
    CREATE TABLE users (id bigint NOT NULL, email varchar(255), PRIMARY KEY (id));
    CREATE INDEX idx_users_email ON users (email);

discrete_column_changes:
  current: CREATE TABLE t (name varchar(100));
  desired: CREATE TABLE t (name varchar(200) NOT NULL DEFAULT 'x');

enum_growth:
  current: CREATE TYPE mood AS ENUM ('sad', 'happy');
  desired: CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');
"#,
    );
}

#[test]
fn sqlite_cases() {
    assert_all_pass(
        &SqliteDialect::new(),
        r#"
add_and_drop_column:
  current: CREATE TABLE t (a integer);
  desired: CREATE TABLE t (a integer, b text);
  up: |
    ALTER TABLE "t" ADD COLUMN "b" text;
  down: |
    ALTER TABLE "t" DROP COLUMN "b";
  enable_drop: true

type_change_is_rejected:
  current: CREATE TABLE t (a integer);
  desired: CREATE TABLE t (a text);
  error: "unsupported sqlite feature: changing column a on table t requires recreating the table"
"#,
    );
}

#[test]
fn mssql_cases() {
    assert_all_pass(
        &MssqlDialect::new(),
        r#"
alter_column:
  current: CREATE TABLE dbo.t (name nvarchar(100));
  desired: CREATE TABLE dbo.t (name nvarchar(200) NOT NULL);
  up: |
    ALTER TABLE [dbo].[t] ALTER COLUMN [name] nvarchar(200) NOT NULL;

new_table:
  current: ''
  desired: CREATE TABLE dbo.users (id bigint NOT NULL IDENTITY(1,1), PRIMARY KEY (id));
"#,
    );
}
