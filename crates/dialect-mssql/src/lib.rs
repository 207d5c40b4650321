//! SQL Server dialect: grammar profile, type equivalences, DDL generation
//! and the tiberius-backed live adapter.

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

pub struct MssqlDialect {
    grammar: GrammarProfile,
}

impl MssqlDialect {
    #[must_use]
    pub fn new() -> Self {
        Self {
            grammar: GrammarProfile::mssql(),
        }
    }
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn grammar(&self) -> &GrammarProfile {
        &self.grammar
    }

    fn equivalence(&self) -> &dyn EquivalencePolicy {
        &equivalence::MSSQL_EQUIVALENCE
    }

    fn render_op(&self, op: &DiffOp) -> Result<Vec<MigrationStatement>> {
        generator::render_op(op)
    }

    fn supports_replace_view(&self) -> bool {
        true
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
        adapter::connect(config)
    }
}
