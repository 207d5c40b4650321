use std::fmt;

/// An identifier as it appeared in source, remembering whether it was quoted
/// so the quote-aware output policy can reproduce it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
}

impl Ident {
    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }

    pub fn unquoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }

    /// Identifier equality under a comparison policy: the legacy policy
    /// ignores source quoting, the quote-aware policy does not.
    #[must_use]
    pub fn matches(&self, other: &Self, ignore_quotes: bool) -> bool {
        if ignore_quotes {
            self.value == other.value
        } else {
            self == other
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

/// `schema.name`, with the schema part optional until the builder attaches
/// the default schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub schema: Option<Ident>,
    pub name: Ident,
}

impl QualifiedName {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: Ident::unquoted(name),
        }
    }

    pub fn schema_qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(Ident::unquoted(schema)),
            name: Ident::unquoted(name),
        }
    }

    /// Attaches `default_schema` when the source did not qualify the name.
    #[must_use]
    pub fn qualify(mut self, default_schema: Option<&str>) -> Self {
        if self.schema.is_none()
            && let Some(schema) = default_schema
        {
            self.schema = Some(Ident::unquoted(schema));
        }
        self
    }

    #[must_use]
    pub fn matches(&self, other: &Self, ignore_quotes: bool) -> bool {
        let schemas_match = match (&self.schema, &other.schema) {
            (Some(left), Some(right)) => left.matches(right, ignore_quotes),
            (None, None) => true,
            _ => false,
        };
        schemas_match && self.name.matches(&other.name, ignore_quotes)
    }

    /// Comparison key that collapses quoting when the legacy policy is in
    /// effect.
    #[must_use]
    pub fn lookup_key(&self, ignore_quotes: bool) -> String {
        let name = if ignore_quotes {
            self.name.value.clone()
        } else {
            self.name.to_string()
        };
        match &self.schema {
            Some(schema) if ignore_quotes => format!("{}.{}", schema.value, name),
            Some(schema) => format!("{schema}.{name}"),
            None => name,
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_matching_ignores_quoting() {
        let quoted = Ident::quoted("users");
        let unquoted = Ident::unquoted("users");
        assert!(quoted.matches(&unquoted, true));
        assert!(!quoted.matches(&unquoted, false));
    }

    #[test]
    fn qualify_only_fills_missing_schema() {
        let bare = QualifiedName::bare("users").qualify(Some("public"));
        assert_eq!(bare, QualifiedName::schema_qualified("public", "users"));

        let explicit = QualifiedName::schema_qualified("app", "users").qualify(Some("public"));
        assert_eq!(explicit.schema, Some(Ident::unquoted("app")));
    }
}
