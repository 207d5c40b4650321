//! Comparison for everything that is not a table: namespaces, enum types,
//! sequences, views, triggers, policies and privileges.

use crate::ast::{CreateSequence, PrivilegeStatement};
use crate::model::{SchemaModel, Trigger, View};
use crate::normalize::normalize_sql_text;

use super::{DiffEngine, DiffOp, SkipReason, SkippedOp};

impl DiffEngine<'_> {
    /// Schemas and extensions. Schemas are never dropped: the desired file
    /// describes the objects it manages, not everything living in a
    /// namespace.
    pub(super) fn diff_namespaces(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for schema in &desired.schemas {
            if !current
                .schemas
                .iter()
                .any(|existing| existing.matches(schema, ignore_quotes))
            {
                self.push(DiffOp::CreateSchema {
                    name: schema.clone(),
                });
            }
        }
        for extension in &desired.extensions {
            if !current
                .extensions
                .iter()
                .any(|existing| existing.matches(extension, ignore_quotes))
            {
                self.push(DiffOp::CreateExtension {
                    name: extension.clone(),
                });
            }
        }
        for extension in &current.extensions {
            if !desired
                .extensions
                .iter()
                .any(|wanted| wanted.matches(extension, ignore_quotes))
            {
                self.push(DiffOp::DropExtension {
                    name: extension.clone(),
                });
            }
        }
    }

    pub(super) fn diff_enums(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for enum_type in &desired.types {
            let existing = current
                .types
                .iter()
                .find(|candidate| candidate.name.matches(&enum_type.name, ignore_quotes));
            let Some(existing) = existing else {
                self.push(DiffOp::CreateEnum(enum_type.clone()));
                continue;
            };
            if existing.values == enum_type.values {
                continue;
            }

            // New labels can be added in place as long as the existing ones
            // keep their relative order; anything else needs a recreate.
            if let Some(adds) = enum_additions(&existing.values, &enum_type.values) {
                for (value, before) in adds {
                    self.push(DiffOp::AddEnumValue {
                        name: enum_type.name.clone(),
                        value,
                        before,
                    });
                }
            } else if self.options.enable_drop {
                self.push(DiffOp::DropEnum {
                    name: enum_type.name.clone(),
                });
                self.push(DiffOp::CreateEnum(enum_type.clone()));
            } else {
                // The recreate only makes sense as a pair; hold both back.
                self.skip(SkippedOp {
                    op: DiffOp::DropEnum {
                        name: enum_type.name.clone(),
                    },
                    reason: SkipReason::DropGuard,
                });
                self.skip(SkippedOp {
                    op: DiffOp::CreateEnum(enum_type.clone()),
                    reason: SkipReason::DropGuard,
                });
            }
        }
        for enum_type in &current.types {
            if !desired
                .types
                .iter()
                .any(|wanted| wanted.name.matches(&enum_type.name, ignore_quotes))
            {
                self.push(DiffOp::DropEnum {
                    name: enum_type.name.clone(),
                });
            }
        }
    }

    pub(super) fn diff_sequences(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for sequence in &desired.sequences {
            let existing = current
                .sequences
                .iter()
                .find(|candidate| candidate.name.matches(&sequence.name, ignore_quotes));
            match existing {
                None => self.push(DiffOp::CreateSequence(sequence.clone())),
                Some(existing) if !sequences_equal(existing, sequence) => {
                    self.push(DiffOp::AlterSequence(sequence.clone()));
                }
                Some(_) => {}
            }
        }
        for sequence in &current.sequences {
            if !desired
                .sequences
                .iter()
                .any(|wanted| wanted.name.matches(&sequence.name, ignore_quotes))
            {
                self.push(DiffOp::DropSequence {
                    name: sequence.name.clone(),
                });
            }
        }
    }

    pub(super) fn diff_views(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for view in &desired.views {
            let Some(existing) = current.view(&view.name, ignore_quotes) else {
                self.push(DiffOp::CreateView(view.clone()));
                continue;
            };
            if self.views_equal(existing, view) {
                continue;
            }
            // A changed view is replaced, not removed; no drop guard.
            if self.options.replace_view && !view.materialized && !existing.materialized {
                self.ops.push(DiffOp::ReplaceView(view.clone()));
            } else {
                self.ops.push(DiffOp::DropView {
                    name: existing.name.clone(),
                    materialized: existing.materialized,
                });
                self.ops.push(DiffOp::CreateView(view.clone()));
            }
        }
        for view in &current.views {
            if desired.view(&view.name, ignore_quotes).is_none() {
                self.push(DiffOp::DropView {
                    name: view.name.clone(),
                    materialized: view.materialized,
                });
            }
        }
    }

    fn views_equal(&self, a: &View, b: &View) -> bool {
        a.materialized == b.materialized
            && a.security == b.security
            && column_values(&a.columns) == column_values(&b.columns)
            && self.policy.queries_equivalent(&a.query, &b.query)
    }

    pub(super) fn diff_triggers(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for trigger in &desired.triggers {
            let existing = current.triggers.iter().find(|candidate| {
                candidate.name.matches(&trigger.name, ignore_quotes)
                    && candidate.table.matches(&trigger.table, ignore_quotes)
            });
            match existing {
                None => self.push(DiffOp::CreateTrigger(trigger.clone())),
                Some(existing) if !triggers_equal(existing, trigger) => {
                    self.ops.push(DiffOp::DropTrigger {
                        name: existing.name.clone(),
                        table: existing.table.clone(),
                    });
                    self.ops.push(DiffOp::CreateTrigger(trigger.clone()));
                }
                Some(_) => {}
            }
        }
        for trigger in &current.triggers {
            let wanted = desired.triggers.iter().any(|candidate| {
                candidate.name.matches(&trigger.name, ignore_quotes)
                    && candidate.table.matches(&trigger.table, ignore_quotes)
            });
            if !wanted {
                self.push(DiffOp::DropTrigger {
                    name: trigger.name.clone(),
                    table: trigger.table.clone(),
                });
            }
        }
    }

    pub(super) fn diff_policies(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        let ignore_quotes = self.options.ignore_quotes;
        for policy in &desired.policies {
            let existing = current.policies.iter().find(|candidate| {
                candidate.name.matches(&policy.name, ignore_quotes)
                    && candidate.table.matches(&policy.table, ignore_quotes)
            });
            match existing {
                None => self.push(DiffOp::CreatePolicy(policy.clone())),
                Some(existing)
                    if normalize_sql_text(&existing.definition)
                        != normalize_sql_text(&policy.definition) =>
                {
                    self.ops.push(DiffOp::DropPolicy {
                        name: existing.name.clone(),
                        table: existing.table.clone(),
                    });
                    self.ops.push(DiffOp::CreatePolicy(policy.clone()));
                }
                Some(_) => {}
            }
        }
        for policy in &current.policies {
            let wanted = desired.policies.iter().any(|candidate| {
                candidate.name.matches(&policy.name, ignore_quotes)
                    && candidate.table.matches(&policy.table, ignore_quotes)
            });
            if !wanted {
                self.push(DiffOp::DropPolicy {
                    name: policy.name.clone(),
                    table: policy.table.clone(),
                });
            }
        }
    }

    pub(super) fn diff_privileges(&mut self, current: &SchemaModel, desired: &SchemaModel) {
        for privilege in &desired.privileges {
            if !current
                .privileges
                .iter()
                .any(|existing| self.privileges_equal(existing, privilege))
            {
                self.push(DiffOp::Grant(privilege.clone()));
            }
        }
        for privilege in &current.privileges {
            if !desired
                .privileges
                .iter()
                .any(|wanted| self.privileges_equal(wanted, privilege))
            {
                self.push(DiffOp::Revoke(privilege.clone()));
            }
        }
    }

    fn privileges_equal(&self, a: &PrivilegeStatement, b: &PrivilegeStatement) -> bool {
        let mut privileges_a = a.privileges.clone();
        let mut privileges_b = b.privileges.clone();
        privileges_a.sort_unstable();
        privileges_b.sort_unstable();
        privileges_a == privileges_b
            && a.object.matches(&b.object, self.options.ignore_quotes)
            && column_values(&a.grantees) == column_values(&b.grantees)
    }

    fn skip(&mut self, skipped: SkippedOp) {
        self.skipped.push(skipped);
    }
}

fn column_values(idents: &[crate::Ident]) -> Vec<&str> {
    idents.iter().map(|ident| ident.value.as_str()).collect()
}

fn sequences_equal(a: &CreateSequence, b: &CreateSequence) -> bool {
    a.increment.unwrap_or(1) == b.increment.unwrap_or(1)
        && a.min_value == b.min_value
        && a.max_value == b.max_value
        && a.start.unwrap_or(1) == b.start.unwrap_or(1)
        && a.cache.unwrap_or(1) == b.cache.unwrap_or(1)
        && a.cycle == b.cycle
}

fn triggers_equal(a: &Trigger, b: &Trigger) -> bool {
    a.timing.eq_ignore_ascii_case(&b.timing)
        && a.events == b.events
        && a.for_each_row == b.for_each_row
        && normalize_sql_text(&a.body) == normalize_sql_text(&b.body)
}

/// If `current` is an ordered subsequence of `desired`, returns the missing
/// labels with the label each should be inserted before.
fn enum_additions(
    current: &[String],
    desired: &[String],
) -> Option<Vec<(String, Option<String>)>> {
    let mut adds = Vec::new();
    let mut current_iter = current.iter().peekable();
    for label in desired {
        if current_iter.peek().is_some_and(|existing| *existing == label) {
            current_iter.next();
        } else {
            adds.push((label.clone(), current_iter.peek().map(|s| (*s).clone())));
        }
    }
    if current_iter.next().is_some() {
        return None;
    }
    Some(adds)
}
