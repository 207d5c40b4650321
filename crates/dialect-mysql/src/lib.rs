//! MySQL dialect: grammar profile, type equivalences, DDL generation and
//! the live adapter.

mod adapter;
mod equivalence;
mod export_queries;
mod generator;
mod parser;
mod to_sql;

pub use generator::AlterHints;

use sqldrift_core::adapter::DatabaseAdapter;
use sqldrift_core::ast::Statement;
use sqldrift_core::diff::DiffOp;
use sqldrift_core::normalize::EquivalencePolicy;
use sqldrift_core::parser::GrammarProfile;
use sqldrift_core::{ConnectionConfig, Dialect, MigrationStatement, Result};

pub struct MysqlDialect {
    grammar: GrammarProfile,
    hints: AlterHints,
}

impl MysqlDialect {
    #[must_use]
    pub fn new() -> Self {
        Self::with_hints(AlterHints::default())
    }

    /// Pins `ALGORITHM=`/`LOCK=` on every generated ALTER TABLE.
    #[must_use]
    pub fn with_hints(hints: AlterHints) -> Self {
        Self {
            grammar: GrammarProfile::mysql(),
            hints,
        }
    }
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn grammar(&self) -> &GrammarProfile {
        &self.grammar
    }

    fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        parser::parse_script(sql, &self.grammar)
    }

    fn equivalence(&self) -> &dyn EquivalencePolicy {
        &equivalence::MYSQL_EQUIVALENCE
    }

    fn render_op(&self, op: &DiffOp) -> Result<Vec<MigrationStatement>> {
        generator::render_op(op, &self.hints)
    }

    fn supports_replace_view(&self) -> bool {
        true
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
        adapter::connect(config)
    }
}
