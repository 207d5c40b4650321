//! Ties the pipeline together: parse both sides, build and filter models,
//! diff, sort, generate, then print or apply.

use crate::adapter::{apply_statements, DatabaseAdapter};
use crate::builder::build_schema;
use crate::config::MigrationConfig;
use crate::diff::diff_schemas;
use crate::dialect::Dialect;
use crate::model::SchemaModel;
use crate::order::sort_ops;
use crate::render::{render_plan, Plan};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the migration without touching the database.
    DryRun,
    /// Execute the migration.
    Apply,
    /// Print the current schema as DDL.
    Export,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub output: String,
    pub applied: usize,
}

pub struct Orchestrator<'a> {
    dialect: &'a dyn Dialect,
    config: &'a MigrationConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(dialect: &'a dyn Dialect, config: &'a MigrationConfig) -> Self {
        Self { dialect, config }
    }

    /// Computes the migration from two DDL scripts.
    pub fn plan_from_sql(&self, current_sql: &str, desired_sql: &str) -> Result<Plan> {
        let current = self.load_model(current_sql)?;
        let desired = self.load_model(desired_sql)?;
        self.plan(&current, &desired)
    }

    pub fn plan(&self, current: &SchemaModel, desired: &SchemaModel) -> Result<Plan> {
        let current = self.filtered(current.clone());
        let desired = self.filtered(desired.clone());

        let mut options = self
            .dialect
            .diff_options(self.config.enable_drop, self.config.ignore_quotes);
        options.create_index_concurrently = self.config.create_index_concurrently;
        let outcome = diff_schemas(&current, &desired, self.dialect.equivalence(), &options);
        tracing::debug!(
            ops = outcome.ops.len(),
            skipped = outcome.skipped.len(),
            "schemas compared"
        );

        let ops = sort_ops(outcome.ops);
        let statements = self.dialect.generate(&ops)?;
        let mut skipped = Vec::new();
        for held_back in &outcome.skipped {
            skipped.extend(self.dialect.render_op(&held_back.op)?);
        }
        Ok(Plan {
            statements,
            skipped,
        })
    }

    pub fn run(
        &self,
        adapter: &dyn DatabaseAdapter,
        desired_sql: &str,
        mode: Mode,
    ) -> Result<RunOutcome> {
        if mode == Mode::Export {
            return Ok(RunOutcome {
                output: adapter.export_schema()?,
                applied: 0,
            });
        }

        let current_sql = adapter.export_schema()?;
        let plan = self.plan_from_sql(&current_sql, desired_sql)?;

        match mode {
            Mode::DryRun => Ok(RunOutcome {
                output: render_plan(&plan, true),
                applied: 0,
            }),
            Mode::Apply => {
                let applied = apply_statements(adapter, &plan.statements)?;
                tracing::info!(applied, "migration applied");
                Ok(RunOutcome {
                    output: render_plan(&plan, true),
                    applied,
                })
            }
            Mode::Export => unreachable!("handled above"),
        }
    }

    fn load_model(&self, sql: &str) -> Result<SchemaModel> {
        let statements = self.dialect.parse(sql)?;
        let mut options = self.dialect.build_options();
        options.ignore_quotes = self.config.ignore_quotes;
        // A filtered run sees only part of the world; unknown references are
        // expected there.
        options.check_references = self.config.filter.is_unrestricted();
        build_schema(statements, &options)
    }

    fn filtered(&self, mut model: SchemaModel) -> SchemaModel {
        if !self.config.managed_roles.is_empty() {
            let roles = &self.config.managed_roles;
            model.privileges.retain(|privilege| {
                privilege
                    .grantees
                    .iter()
                    .any(|grantee| roles.iter().any(|role| role == &grantee.value))
            });
        }
        if self.config.filter.is_unrestricted() {
            return model;
        }
        let filter = &self.config.filter;
        model.tables.retain(|table| filter.manages(&table.name));
        model.views.retain(|view| filter.manages(&view.name));
        model.triggers.retain(|trigger| filter.manages(&trigger.table));
        model.policies.retain(|policy| filter.manages(&policy.table));
        model
            .privileges
            .retain(|privilege| filter.manages(&privilege.object));
        // Foreign keys pointing outside the managed set cannot be compared
        // meaningfully; leave them to the tables that own them only when the
        // referenced side is visible.
        for table in &mut model.tables {
            table
                .foreign_keys
                .retain(|fk| filter.manages(&fk.reference.table));
        }
        model
    }
}
