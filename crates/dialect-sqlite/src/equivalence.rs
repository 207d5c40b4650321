//! SQLite equivalences. Type affinity makes most type spellings
//! interchangeable at runtime, but the schema is stored verbatim, so only
//! the documented alias spellings are folded together here.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use sqldrift_core::normalize::{normalize_sql_text, EquivalencePolicy};

pub(crate) struct SqliteEquivalence;

pub(crate) static SQLITE_EQUIVALENCE: SqliteEquivalence = SqliteEquivalence;

impl EquivalencePolicy for SqliteEquivalence {
    fn canonical_type_base<'a>(&self, base: &'a str) -> &'a str {
        match base {
            "int" => "integer",
            "bool" => "boolean",
            "character varying" => "varchar",
            other => other,
        }
    }

    fn queries_equivalent(&self, a: &str, b: &str) -> bool {
        match (parsed(a), parsed(b)) {
            (Some(a), Some(b)) => a == b,
            _ => normalize_sql_text(a) == normalize_sql_text(b),
        }
    }
}

fn parsed(query: &str) -> Option<String> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, query).ok()?;
    Some(
        statements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
            .to_ascii_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldrift_core::TypeName;

    #[test]
    fn int_and_integer_are_the_same_affinity() {
        let policy = SqliteEquivalence;
        assert!(policy.types_equivalent(
            &TypeName::simple("int"),
            &TypeName::simple("integer")
        ));
        assert!(!policy.types_equivalent(
            &TypeName::simple("text"),
            &TypeName::simple("integer")
        ));
    }

    #[test]
    fn view_bodies_compare_through_the_parser() {
        let policy = SqliteEquivalence;
        assert!(policy.queries_equivalent(
            "SELECT id FROM t WHERE deleted = 0",
            "select id\nfrom t\nwhere deleted = 0"
        ));
    }
}
