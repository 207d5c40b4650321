//! MySQL spelling equivalences. `SHOW CREATE TABLE` reports canonical
//! spellings (`int` for `integer`, no display widths on MySQL 8), so the
//! desired DDL has to be compared through the same lens.

use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqldrift_core::normalize::{normalize_sql_text, EquivalencePolicy};

pub(crate) struct MysqlEquivalence;

pub(crate) static MYSQL_EQUIVALENCE: MysqlEquivalence = MysqlEquivalence;

impl EquivalencePolicy for MysqlEquivalence {
    fn canonical_type_base<'a>(&self, base: &'a str) -> &'a str {
        match base {
            "integer" => "int",
            "dec" | "numeric" | "fixed" => "decimal",
            "bool" | "boolean" => "tinyint",
            "character varying" => "varchar",
            "character" => "char",
            other => other,
        }
    }

    /// MySQL 8 no longer reports integer display widths; `int(11)` and
    /// `int` describe the same column.
    fn type_args_significant(&self, base: &str) -> bool {
        !matches!(
            base,
            "tinyint" | "smallint" | "mediumint" | "int" | "bigint"
        )
    }

    /// View bodies round-trip through sqlparser's MySQL grammar, which
    /// normalizes keyword case and whitespace. INFORMATION_SCHEMA rewrites
    /// that survive parsing (qualified names, quoted idents) still differ;
    /// those fall out in the raw-text comparison.
    fn queries_equivalent(&self, a: &str, b: &str) -> bool {
        match (parsed(a), parsed(b)) {
            (Some(a), Some(b)) => a == b,
            _ => normalize_sql_text(a) == normalize_sql_text(b),
        }
    }
}

fn parsed(query: &str) -> Option<String> {
    let statements = Parser::parse_sql(&MySqlDialect {}, query).ok()?;
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
    fn integer_display_widths_are_ignored() {
        let policy = MysqlEquivalence;
        let with_width = TypeName {
            raw: "int(11)".to_string(),
            base: "int".to_string(),
            args: vec![11],
            unsigned: false,
            array: false,
        };
        assert!(policy.types_equivalent(&with_width, &TypeName::simple("int")));
        assert!(policy.types_equivalent(&TypeName::simple("integer"), &TypeName::simple("int")));
    }

    #[test]
    fn varchar_lengths_still_matter() {
        let policy = MysqlEquivalence;
        assert!(!policy.types_equivalent(
            &TypeName::with_args("varchar", vec![100]),
            &TypeName::with_args("varchar", vec![200])
        ));
    }

    #[test]
    fn view_bodies_compare_through_the_parser() {
        let policy = MysqlEquivalence;
        assert!(policy.queries_equivalent(
            "select `id`, `name` from `users`",
            "SELECT `id`,\n       `name`\nFROM `users`"
        ));
        assert!(!policy.queries_equivalent(
            "select id from users",
            "select id from users where active = 1"
        ));
    }
}
