//! SQLite dialect: grammar profile, DDL generation for the ALTER surface
//! SQLite supports, and the file-backed live adapter.

mod adapter;
mod equivalence;
mod export_queries;
mod generator;
mod to_sql;

use sqldrift_core::adapter::DatabaseAdapter;
use sqldrift_core::diff::DiffOp;
use sqldrift_core::normalize::EquivalencePolicy;
use sqldrift_core::parser::GrammarProfile;
use sqldrift_core::{ConnectionConfig, Dialect, MigrationStatement, Result};

pub struct SqliteDialect {
    grammar: GrammarProfile,
}

impl SqliteDialect {
    #[must_use]
    pub fn new() -> Self {
        Self {
            grammar: GrammarProfile::sqlite(),
        }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn grammar(&self) -> &GrammarProfile {
        &self.grammar
    }

    fn equivalence(&self) -> &dyn EquivalencePolicy {
        &equivalence::SQLITE_EQUIVALENCE
    }

    fn render_op(&self, op: &DiffOp) -> Result<Vec<MigrationStatement>> {
        generator::render_op(op)
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
        adapter::connect(config)
    }
}
