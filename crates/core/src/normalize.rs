//! Semantic equivalence between two spellings of the same schema element.
//! The comparison engine never compares raw SQL text; everything goes through
//! canonical forms so `0.0` vs `0`, `SOME` vs `ANY`, or parenthesization do
//! not produce spurious migrations.

use crate::{Expr, Ident, Quantifier, TypeName, UnaryOp};

/// Dialect hook for type and expression equivalence. The defaults implement
/// the engine-independent rules; dialects layer alias tables and quirks on
/// top.
pub trait EquivalencePolicy: Send + Sync {
    /// Maps a type base name onto its canonical spelling (`int4` ->
    /// `integer`).
    fn canonical_type_base<'a>(&self, base: &'a str) -> &'a str {
        base
    }

    /// Whether length arguments distinguish two types. MySQL integer display
    /// widths, for one, do not.
    fn type_args_significant(&self, _base: &str) -> bool {
        true
    }

    fn types_equivalent(&self, a: &TypeName, b: &TypeName) -> bool {
        let base_a = self.canonical_type_base(&a.base);
        let base_b = self.canonical_type_base(&b.base);
        if base_a != base_b || a.unsigned != b.unsigned || a.array != b.array {
            return false;
        }
        if !self.type_args_significant(base_a) {
            return true;
        }
        a.args == b.args || (a.args.is_empty() != b.args.is_empty() && args_defaulted(base_a, a, b))
    }

    fn exprs_equivalent(&self, a: Option<&Expr>, b: Option<&Expr>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => canonical_expr(a) == canonical_expr(b),
            _ => false,
        }
    }

    /// View queries and other raw SQL bodies: whitespace-collapsed,
    /// case-insensitive, trailing semicolon ignored.
    fn queries_equivalent(&self, a: &str, b: &str) -> bool {
        normalize_sql_text(a) == normalize_sql_text(b)
    }
}

/// The engine-independent rules and nothing else.
pub struct DefaultEquivalence;

impl EquivalencePolicy for DefaultEquivalence {}

/// A type written without args against one written with the engine default
/// (`varchar` vs `varchar(1)` is not a pair; `timestamp` vs `timestamp(6)`
/// on MySQL is handled by the dialect policy). Only `numeric`/`decimal`
/// without args matches any precision here, matching how engines report
/// unconstrained numerics.
fn args_defaulted(base: &str, a: &TypeName, b: &TypeName) -> bool {
    matches!(base, "numeric" | "decimal") && (a.args.is_empty() || b.args.is_empty())
}

/// Rewrites an expression into its canonical form. Two expressions are
/// equivalent iff their canonical forms are structurally equal.
#[must_use]
pub fn canonical_expr(expr: &Expr) -> Expr {
    match expr {
        Expr::Paren(inner) => canonical_expr(inner),
        Expr::Number(number) => canonical_number(number),
        Expr::Integer(_) | Expr::Null | Expr::Bool(_) | Expr::String(_) => expr.clone(),
        Expr::Ident(ident) => Expr::Ident(Ident::unquoted(ident.value.clone())),
        Expr::Qualified { qualifier, name } => Expr::Qualified {
            qualifier: Ident::unquoted(qualifier.value.clone()),
            name: Ident::unquoted(name.value.clone()),
        },
        Expr::FunctionCall { name, args } => {
            let upper = name.to_ascii_uppercase();
            if args.is_empty() && is_bare_function(&upper) {
                // CURRENT_TIMESTAMP() == CURRENT_TIMESTAMP
                return Expr::BareFunction(upper);
            }
            Expr::FunctionCall {
                name: name.to_ascii_lowercase(),
                args: args.iter().map(canonical_expr).collect(),
            }
        }
        Expr::BareFunction(name) => Expr::BareFunction(name.to_ascii_uppercase()),
        Expr::Unary { op, expr } => match (op, canonical_expr(expr)) {
            (UnaryOp::Plus, inner) => inner,
            (UnaryOp::Minus, Expr::Integer(value)) => Expr::Integer(-value),
            (UnaryOp::Minus, inner) => Expr::Unary {
                op: UnaryOp::Minus,
                expr: Box::new(inner),
            },
        },
        Expr::Binary { left, op, right } => Expr::Binary {
            left: Box::new(canonical_expr(left)),
            op: *op,
            right: Box::new(canonical_expr(right)),
        },
        Expr::Comparison {
            left,
            op,
            quantifier,
            right,
        } => Expr::Comparison {
            left: Box::new(canonical_expr(left)),
            op: *op,
            // SOME is the standard's spelling of ANY.
            quantifier: quantifier.map(|q| match q {
                Quantifier::Some => Quantifier::Any,
                other => other,
            }),
            right: Box::new(canonical_expr(right)),
        },
        Expr::And(left, right) => Expr::And(
            Box::new(canonical_expr(left)),
            Box::new(canonical_expr(right)),
        ),
        Expr::Or(left, right) => Expr::Or(
            Box::new(canonical_expr(left)),
            Box::new(canonical_expr(right)),
        ),
        Expr::Not(inner) => Expr::Not(Box::new(canonical_expr(inner))),
        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: Box::new(canonical_expr(expr)),
            negated: *negated,
        },
        Expr::In {
            expr,
            list,
            negated,
        } => Expr::In {
            expr: Box::new(canonical_expr(expr)),
            list: list.iter().map(canonical_expr).collect(),
            negated: *negated,
        },
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => Expr::Between {
            expr: Box::new(canonical_expr(expr)),
            low: Box::new(canonical_expr(low)),
            high: Box::new(canonical_expr(high)),
            negated: *negated,
        },
        Expr::Cast { expr, type_name } => Expr::Cast {
            expr: Box::new(canonical_expr(expr)),
            type_name: canonical_type(type_name),
        },
        Expr::Raw(raw) => Expr::Raw(normalize_sql_text(raw)),
    }
}

fn canonical_number(number: &str) -> Expr {
    if let Ok(value) = number.parse::<f64>() {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            return Expr::Integer(value as i64);
        }
    }
    Expr::Number(number.to_string())
}

fn canonical_type(type_name: &TypeName) -> TypeName {
    let mut canonical = type_name.clone();
    canonical.raw = if canonical.args.is_empty() {
        canonical.base.clone()
    } else {
        format!(
            "{}({})",
            canonical.base,
            canonical
                .args
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        )
    };
    canonical
}

fn is_bare_function(upper: &str) -> bool {
    matches!(
        upper,
        "CURRENT_TIMESTAMP"
            | "CURRENT_DATE"
            | "CURRENT_TIME"
            | "CURRENT_USER"
            | "SESSION_USER"
            | "LOCALTIME"
            | "LOCALTIMESTAMP"
    )
}

/// Collapses whitespace runs, strips a trailing semicolon and lowercases.
/// Good enough for bodies the engine treats as opaque (view queries, trigger
/// bodies, partition clauses).
#[must_use]
pub fn normalize_sql_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(';').trim_end();
    trimmed.to_ascii_lowercase()
}

/// Whether two constraint or index names match, allowing for server-side
/// truncation of generated names (PostgreSQL cuts at 63 bytes).
#[must_use]
pub fn names_match_with_truncation(a: &str, b: &str, max_len: Option<usize>) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    let Some(max_len) = max_len else {
        return false;
    };
    let (longer, shorter) = if a.len() > b.len() { (a, b) } else { (b, a) };
    shorter.len() == max_len && longer[..max_len.min(longer.len())].eq_ignore_ascii_case(shorter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_sql, GrammarProfile};
    use crate::ast::Statement;

    fn default_of(sql: &str) -> Expr {
        let profile = GrammarProfile::postgres();
        let statements = parse_sql(sql, &profile).expect("should parse");
        let Statement::CreateTable(table) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        table.columns[0].default.clone().expect("default")
    }

    #[test]
    fn numeric_zero_forms_are_equivalent() {
        let a = default_of("CREATE TABLE t (x numeric DEFAULT 0.0);");
        let b = default_of("CREATE TABLE t (x numeric DEFAULT 0);");
        assert_eq!(canonical_expr(&a), canonical_expr(&b));
    }

    #[test]
    fn current_timestamp_call_and_keyword_are_equivalent() {
        let a = default_of("CREATE TABLE t (x timestamp DEFAULT CURRENT_TIMESTAMP());");
        let b = default_of("CREATE TABLE t (x timestamp DEFAULT current_timestamp);");
        assert_eq!(canonical_expr(&a), canonical_expr(&b));
    }

    #[test]
    fn parens_and_quoting_do_not_matter() {
        let a = default_of("CREATE TABLE t (x int DEFAULT ((1 + 2)));");
        let b = default_of("CREATE TABLE t (x int DEFAULT 1 + 2);");
        assert_eq!(canonical_expr(&a), canonical_expr(&b));
    }

    #[test]
    fn some_is_any() {
        let policy = DefaultEquivalence;
        let profile = GrammarProfile::postgres();
        let parse_check = |sql: &str| {
            let statements = parse_sql(sql, &profile).expect("should parse");
            let Statement::CreateTable(table) = &statements[0] else {
                panic!("expected CREATE TABLE");
            };
            let crate::ast::TableConstraint::Check(check) = &table.constraints[0] else {
                panic!("expected check");
            };
            check.expr.clone()
        };
        let a = parse_check("CREATE TABLE t (x int, CHECK (x = SOME (allowed())));");
        let b = parse_check("CREATE TABLE t (x int, CHECK (x = ANY (allowed())));");
        assert!(policy.exprs_equivalent(Some(&a), Some(&b)));
    }

    #[test]
    fn truncated_names_pair_up() {
        let long = "a".repeat(70);
        let truncated = &long[..63];
        assert!(names_match_with_truncation(&long, truncated, Some(63)));
        assert!(!names_match_with_truncation(&long, truncated, None));
        assert!(!names_match_with_truncation("abc", "abd", Some(63)));
    }

    #[test]
    fn query_text_normalization() {
        let policy = DefaultEquivalence;
        assert!(policy.queries_equivalent(
            "SELECT  id,\n  name FROM users;",
            "select id, name from users"
        ));
    }
}
