//! PostgreSQL spelling equivalences. The server reports types by their
//! internal names (`int8`, `timestamptz`) and rewrites serial columns into
//! sequence-backed defaults, so comparing exported DDL against user DDL needs
//! an alias table on top of the engine-independent rules.

use sqldrift_core::normalize::{normalize_sql_text, EquivalencePolicy};
use sqldrift_core::Expr;

pub(crate) struct PostgresEquivalence;

pub(crate) static POSTGRES_EQUIVALENCE: PostgresEquivalence = PostgresEquivalence;

impl EquivalencePolicy for PostgresEquivalence {
    fn canonical_type_base<'a>(&self, base: &'a str) -> &'a str {
        match base {
            "int8" => "bigint",
            "int" | "int4" => "integer",
            "int2" => "smallint",
            "serial" => "integer",
            "bigserial" => "bigint",
            "smallserial" => "smallint",
            "bool" => "boolean",
            "float8" => "double precision",
            "float4" => "real",
            "varchar" => "character varying",
            "char" | "bpchar" => "character",
            "decimal" => "numeric",
            "timestamptz" => "timestamp with time zone",
            "timetz" => "time with time zone",
            "timestamp" => "timestamp without time zone",
            "time" => "time without time zone",
            other => other,
        }
    }

    fn exprs_equivalent(&self, a: Option<&Expr>, b: Option<&Expr>) -> bool {
        // A serial column in the desired DDL has no default; the exported
        // schema shows the nextval() call the server created for it.
        match (a, b) {
            (None, Some(other)) | (Some(other), None) if is_nextval(other) => true,
            _ => sqldrift_core::normalize::DefaultEquivalence.exprs_equivalent(a, b),
        }
    }

    /// View bodies round-trip through the server grammar when possible, so
    /// `pg_get_viewdef` output matches the user's spelling.
    fn queries_equivalent(&self, a: &str, b: &str) -> bool {
        match (deparsed(a), deparsed(b)) {
            (Some(a), Some(b)) => a == b,
            _ => normalize_sql_text(a) == normalize_sql_text(b),
        }
    }
}

fn deparsed(query: &str) -> Option<String> {
    pg_query::parse(query).ok()?.deparse().ok()
}

fn is_nextval(expr: &Expr) -> bool {
    match expr {
        Expr::FunctionCall { name, .. } => name.eq_ignore_ascii_case("nextval"),
        Expr::Cast { expr, .. } | Expr::Paren(expr) => is_nextval(expr),
        Expr::Raw(raw) => raw.trim_start().to_ascii_lowercase().starts_with("nextval("),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldrift_core::TypeName;

    #[test]
    fn internal_type_names_match_spelled_out_forms() {
        let policy = PostgresEquivalence;
        let pairs = [
            ("int8", "bigint"),
            ("int4", "integer"),
            ("bool", "boolean"),
            ("timestamptz", "timestamp with time zone"),
            ("varchar", "character varying"),
        ];
        for (internal, spelled) in pairs {
            assert!(
                policy.types_equivalent(&TypeName::simple(internal), &TypeName::simple(spelled)),
                "{internal} should equal {spelled}"
            );
        }
    }

    #[test]
    fn serial_matches_integer_with_sequence_default() {
        let policy = PostgresEquivalence;
        assert!(policy.types_equivalent(
            &TypeName::simple("serial"),
            &TypeName::simple("integer")
        ));
        let exported_default = Expr::Raw("nextval('users_id_seq'::regclass)".to_string());
        assert!(policy.exprs_equivalent(None, Some(&exported_default)));
        assert!(policy.exprs_equivalent(Some(&exported_default), None));
    }

    #[test]
    fn view_queries_compare_through_the_server_grammar() {
        let policy = PostgresEquivalence;
        assert!(policy.queries_equivalent(
            "SELECT id,\n       name\nFROM users WHERE (active)",
            "select id, name from users where active"
        ));
        assert!(!policy.queries_equivalent(
            "SELECT id FROM users",
            "SELECT id FROM users WHERE active"
        ));
    }

    #[test]
    fn unparseable_bodies_fall_back_to_text_comparison() {
        let policy = PostgresEquivalence;
        assert!(policy.queries_equivalent("not sql  at all", "NOT SQL AT ALL"));
    }
}
