//! Runtime configuration: connection parameters and the managed-object
//! filter that scopes which tables the tool is allowed to touch.

use regex::Regex;

use crate::QualifiedName;

#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    /// Unix domain socket path, where the driver supports one.
    pub socket: Option<String>,
}

/// Regex scoping of managed objects. `targets` empty means "everything";
/// `skips` always wins over `targets`. Patterns are anchored to the whole
/// name and matched against both the bare and the schema-qualified form.
#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    targets: Vec<Regex>,
    skips: Vec<Regex>,
}

impl ObjectFilter {
    pub fn new(targets: &[String], skips: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            targets: compile_anchored(targets)?,
            skips: compile_anchored(skips)?,
        })
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.targets.is_empty() && self.skips.is_empty()
    }

    #[must_use]
    pub fn manages(&self, name: &QualifiedName) -> bool {
        let bare = name.name.value.as_str();
        let qualified = name.to_string();
        if self
            .skips
            .iter()
            .any(|regex| regex.is_match(bare) || regex.is_match(&qualified))
        {
            return false;
        }
        self.targets.is_empty()
            || self
                .targets
                .iter()
                .any(|regex| regex.is_match(bare) || regex.is_match(&qualified))
    }
}

fn compile_anchored(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns
        .iter()
        .map(|pattern| Regex::new(&format!("^(?:{pattern})$")))
        .collect()
}

/// Knobs for one comparison run.
#[derive(Debug, Clone, Default)]
pub struct MigrationConfig {
    /// Permit destructive operations.
    pub enable_drop: bool,
    /// Compare identifiers ignoring whether they were quoted. On by default
    /// through [`MigrationConfig::new`]; the strict mode exists for schemas
    /// that rely on case-sensitive quoted names.
    pub ignore_quotes: bool,
    pub filter: ObjectFilter,
    /// GRANT/REVOKE comparison is restricted to these roles; an empty list
    /// manages every grantee the schemas mention.
    pub managed_roles: Vec<String>,
    /// Build new indexes concurrently where the dialect supports it.
    pub create_index_concurrently: bool,
}

impl MigrationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enable_drop: false,
            ignore_quotes: true,
            filter: ObjectFilter::default(),
            managed_roles: Vec::new(),
            create_index_concurrently: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(schema: Option<&str>, name: &str) -> QualifiedName {
        match schema {
            Some(schema) => QualifiedName::schema_qualified(schema, name),
            None => QualifiedName::bare(name),
        }
    }

    #[test]
    fn empty_filter_manages_everything() {
        let filter = ObjectFilter::default();
        assert!(filter.manages(&table(None, "users")));
    }

    #[test]
    fn skips_win_over_targets() {
        let filter = ObjectFilter::new(
            &["users.*".to_string()],
            &["users_archive".to_string()],
        )
        .expect("valid patterns");
        assert!(filter.manages(&table(None, "users")));
        assert!(filter.manages(&table(None, "users_roles")));
        assert!(!filter.manages(&table(None, "users_archive")));
        assert!(!filter.manages(&table(None, "orders")));
    }

    #[test]
    fn patterns_are_anchored() {
        let filter =
            ObjectFilter::new(&["user".to_string()], &[]).expect("valid patterns");
        assert!(!filter.manages(&table(None, "users")));
    }

    #[test]
    fn qualified_names_match_too() {
        let filter = ObjectFilter::new(&[r"app\..*".to_string()], &[]).expect("valid patterns");
        assert!(filter.manages(&table(Some("app"), "jobs")));
        assert!(!filter.manages(&table(Some("public"), "jobs")));
    }
}
