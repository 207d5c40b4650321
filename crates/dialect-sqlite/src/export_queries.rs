// sqlite_master stores DDL verbatim; deterministic ORDER BY clauses keep
// export output stable across runs.

pub(crate) const SHOW_SERVER_VERSION_QUERY: &str = "SELECT sqlite_version()";

pub(crate) const TABLE_NAMES_QUERY: &str = r#"
SELECT tbl_name
FROM sqlite_master
WHERE type = 'table' AND tbl_name NOT LIKE 'sqlite_%'
ORDER BY tbl_name ASC;
"#;

pub(crate) const TABLE_DDL_QUERY: &str = r#"
SELECT sql
FROM sqlite_master
WHERE tbl_name = ?1 AND type = 'table';
"#;

pub(crate) const VIEW_DDLS_QUERY: &str = r#"
SELECT sql
FROM sqlite_master
WHERE type = 'view' AND sql IS NOT NULL
ORDER BY tbl_name ASC;
"#;

// Automatically generated indexes (UNIQUE constraints, INTEGER PRIMARY KEY)
// have NULL definitions and are excluded.
pub(crate) const INDEX_DDLS_QUERY: &str = r#"
SELECT sql
FROM sqlite_master
WHERE type = 'index' AND sql IS NOT NULL
ORDER BY sql ASC;
"#;

pub(crate) const TRIGGER_DDLS_QUERY: &str = r#"
SELECT sql
FROM sqlite_master
WHERE type = 'trigger' AND sql IS NOT NULL
ORDER BY tbl_name ASC, name ASC;
"#;
