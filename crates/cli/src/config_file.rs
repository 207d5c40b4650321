//! Optional YAML config file. Flags win by extending or overriding what the
//! file provides.

use serde::Deserialize;

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub enable_drop: bool,
    pub target_tables: Vec<String>,
    pub skip_tables: Vec<String>,
    pub managed_roles: Vec<String>,
    pub create_index_concurrently: bool,
    /// Quote-insensitive identifier comparison. Defaults to on; set to
    /// `false` to treat `"Users"` and `users` as different objects.
    pub ignore_quotes: Option<bool>,
    /// MySQL `ALGORITHM=` hint for ALTER TABLE statements.
    pub algorithm: Option<String>,
    /// MySQL `LOCK=` hint for ALTER TABLE statements.
    pub lock: Option<String>,
}

pub(crate) fn parse(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    serde_yaml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse("{}").expect("should parse"), ConfigFile::default());
    }

    #[test]
    fn known_fields_load() {
        let config = parse(
            "enable_drop: true\ntarget_tables:\n  - users.*\nskip_tables:\n  - users_archive\nmanaged_roles:\n  - app\n",
        )
        .expect("should parse");
        assert!(config.enable_drop);
        assert_eq!(config.target_tables, vec!["users.*"]);
        assert_eq!(config.skip_tables, vec!["users_archive"]);
        assert_eq!(config.managed_roles, vec!["app"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse("drop_enabled: true\n").is_err());
    }
}
