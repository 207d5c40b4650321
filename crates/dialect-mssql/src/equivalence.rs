//! SQL Server spelling equivalences. The catalog reports canonical type
//! names (`int` for `integer`, `decimal` for `numeric`), so desired DDL is
//! compared through the same lens.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;
use sqldrift_core::normalize::{normalize_sql_text, EquivalencePolicy};

pub(crate) struct MssqlEquivalence;

pub(crate) static MSSQL_EQUIVALENCE: MssqlEquivalence = MssqlEquivalence;

impl EquivalencePolicy for MssqlEquivalence {
    fn canonical_type_base<'a>(&self, base: &'a str) -> &'a str {
        match base {
            "integer" => "int",
            "numeric" | "dec" => "decimal",
            "bool" | "boolean" => "bit",
            "character varying" => "varchar",
            "character" => "char",
            "double precision" => "float",
            "rowversion" => "timestamp",
            other => other,
        }
    }

    /// View bodies round-trip through sqlparser's T-SQL grammar, which
    /// normalizes keyword case and whitespace. Definitions that fail to
    /// parse fall back to the raw-text comparison.
    fn queries_equivalent(&self, a: &str, b: &str) -> bool {
        match (parsed(a), parsed(b)) {
            (Some(a), Some(b)) => a == b,
            _ => normalize_sql_text(a) == normalize_sql_text(b),
        }
    }
}

fn parsed(query: &str) -> Option<String> {
    let statements = Parser::parse_sql(&MsSqlDialect {}, query).ok()?;
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
    fn type_synonyms_collapse() {
        let policy = MssqlEquivalence;
        assert!(policy.types_equivalent(&TypeName::simple("integer"), &TypeName::simple("int")));
        assert!(policy.types_equivalent(
            &TypeName::with_args("numeric", vec![10, 2]),
            &TypeName::with_args("decimal", vec![10, 2])
        ));
        assert!(!policy.types_equivalent(
            &TypeName::with_args("decimal", vec![10, 2]),
            &TypeName::with_args("decimal", vec![12, 2])
        ));
    }

    #[test]
    fn view_bodies_compare_through_the_parser() {
        let policy = MssqlEquivalence;
        assert!(policy.queries_equivalent(
            "select [id], [name] from [dbo].[users]",
            "SELECT [id],\n       [name]\nFROM [dbo].[users]"
        ));
        assert!(!policy.queries_equivalent(
            "select id from users",
            "select id from users where active = 1"
        ));
    }
}
