use std::fmt;

/// One executable DDL statement of a migration. `transactional` marks
/// whether it may run inside a transaction; `CREATE INDEX CONCURRENTLY` and
/// friends must not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatement {
    pub sql: String,
    pub transactional: bool,
}

impl MigrationStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            transactional: true,
        }
    }

    pub fn non_transactional(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            transactional: false,
        }
    }
}

impl fmt::Display for MigrationStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
