//! The dialect seam: one implementation per engine family, living in its own
//! crate. The core engine is written entirely against this trait.

use crate::adapter::DatabaseAdapter;
use crate::ast::Statement;
use crate::builder::BuildOptions;
use crate::config::ConnectionConfig;
use crate::diff::{DiffOp, DiffOptions};
use crate::normalize::EquivalencePolicy;
use crate::parser::{self, GrammarProfile};
use crate::{MigrationStatement, Result};

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn grammar(&self) -> &GrammarProfile;

    /// Parses a DDL script. The default uses the shared grammar with this
    /// dialect's profile; dialects with a secondary parser (PostgreSQL's
    /// server grammar, MySQL view bodies) override and fall back to it.
    fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        parser::parse_sql(sql, self.grammar())
    }

    fn equivalence(&self) -> &dyn EquivalencePolicy;

    /// Renders one operation. Generators emit at least one statement per op;
    /// an op the dialect cannot express is an [`UnsupportedError`], never
    /// silence.
    ///
    /// [`UnsupportedError`]: crate::UnsupportedError
    fn render_op(&self, op: &DiffOp) -> Result<Vec<MigrationStatement>>;

    fn generate(&self, ops: &[DiffOp]) -> Result<Vec<MigrationStatement>> {
        let mut statements = Vec::new();
        for op in ops {
            statements.extend(self.render_op(op)?);
        }
        Ok(statements)
    }

    /// Whether `CREATE OR REPLACE VIEW` exists.
    fn supports_replace_view(&self) -> bool {
        false
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>>;

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            default_schema: self.grammar().default_schema.map(str::to_string),
            ..BuildOptions::default()
        }
    }

    fn diff_options(&self, enable_drop: bool, ignore_quotes: bool) -> DiffOptions {
        DiffOptions {
            enable_drop,
            ignore_quotes,
            max_identifier_length: self.grammar().max_identifier_length,
            replace_view: self.supports_replace_view(),
            ..DiffOptions::default()
        }
    }
}
