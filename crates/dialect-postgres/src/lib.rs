//! PostgreSQL dialect: grammar profile, type and default equivalences,
//! DDL generation and the live adapter.

mod adapter;
mod equivalence;
mod export_queries;
mod generator;
mod parser;
mod to_sql;

use sqldrift_core::adapter::DatabaseAdapter;
use sqldrift_core::ast::Statement;
use sqldrift_core::diff::DiffOp;
use sqldrift_core::normalize::EquivalencePolicy;
use sqldrift_core::parser::GrammarProfile;
use sqldrift_core::{ConnectionConfig, Dialect, MigrationStatement, Result};

pub struct PostgresDialect {
    grammar: GrammarProfile,
}

impl PostgresDialect {
    #[must_use]
    pub fn new() -> Self {
        Self {
            grammar: GrammarProfile::postgres(),
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn grammar(&self) -> &GrammarProfile {
        &self.grammar
    }

    fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        parser::parse_script(sql, &self.grammar)
    }

    fn equivalence(&self) -> &dyn EquivalencePolicy {
        &equivalence::POSTGRES_EQUIVALENCE
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
