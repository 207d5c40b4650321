//! Precedence-climbing expression parser for the expression positions DDL
//! actually has: defaults, generated columns, checks and index predicates.
//! Anything outside the grammar falls back to a balanced raw-token capture so
//! statements are never dropped.

use crate::{BinaryOp, CompareOp, Expr, Ident, Quantifier, Result, UnaryOp};

use super::{Parser, Token, TokenKind};

const BARE_FUNCTIONS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_USER",
    "SESSION_USER",
    "LOCALTIME",
    "LOCALTIMESTAMP",
];

impl Parser<'_> {
    /// Parses an expression, falling back to [`Expr::Raw`] when the
    /// structured grammar cannot consume it up to a clause boundary.
    pub(super) fn parse_expr_or_raw(&mut self, stop_keywords: &[&str]) -> Result<Expr> {
        let checkpoint = self.pos;
        if let Ok(expr) = self.parse_expr() {
            if self.at_expr_boundary(stop_keywords) {
                return Ok(expr);
            }
        }
        self.pos = checkpoint;
        self.raw_balanced(stop_keywords)
    }

    /// `( expr )` with raw fallback inside the parentheses.
    pub(super) fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.expect_symbol("(")?;
        let expr = self.parse_expr_or_raw(&[])?;
        self.expect_symbol(")")?;
        Ok(expr)
    }

    pub(super) fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn at_expr_boundary(&self, stop_keywords: &[&str]) -> bool {
        let Some(token) = self.peek() else {
            return true;
        };
        match &token.kind {
            TokenKind::Symbol(symbol) => matches!(*symbol, "," | ")" | ";" | "]"),
            TokenKind::Word(word) => {
                stop_keywords.iter().any(|kw| word.eq_ignore_ascii_case(kw))
                    || (self.profile.go_separators && word.eq_ignore_ascii_case("GO"))
            }
            _ => false,
        }
    }

    fn raw_balanced(&mut self, stop_keywords: &[&str]) -> Result<Expr> {
        let Some(first) = self.peek() else {
            return Err(self.error_here("expected expression"));
        };
        let start = first.start;
        let mut end = start;
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Symbol("(") => depth += 1,
                TokenKind::Symbol(")") if depth == 0 => break,
                TokenKind::Symbol(")") => depth -= 1,
                TokenKind::Symbol("," | ";") if depth == 0 => break,
                TokenKind::Word(word)
                    if depth == 0
                        && (stop_keywords.iter().any(|kw| word.eq_ignore_ascii_case(kw))
                            || (self.profile.go_separators
                                && word.eq_ignore_ascii_case("GO"))) =>
                {
                    break;
                }
                _ => {}
            }
            end = token.end;
            self.pos += 1;
        }

        if end == start {
            return Err(self.error_here("expected expression"));
        }
        Ok(Expr::Raw(self.source[start..end].trim().to_string()))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_keyword("NOT") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = self.check_keyword("NOT")
            && self
                .peek_at(1)
                .is_some_and(|t| t.is_keyword("IN") || t.is_keyword("BETWEEN") || t.is_keyword("LIKE"));
        if negated {
            self.pos += 1;
        }

        if self.eat_keyword("IN") {
            self.expect_symbol("(")?;
            let mut list = Vec::new();
            if !self.check_symbol(")") {
                loop {
                    list.push(self.parse_expr()?);
                    if !self.eat_symbol(",") {
                        break;
                    }
                }
            }
            self.expect_symbol(")")?;
            return Ok(Expr::In {
                expr: Box::new(left),
                list,
                negated,
            });
        }
        if self.eat_keyword("BETWEEN") {
            let low = self.parse_additive()?;
            self.expect_keyword("AND")?;
            let high = self.parse_additive()?;
            return Ok(Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if self.eat_keyword("LIKE") {
            let right = self.parse_additive()?;
            return Ok(Expr::Comparison {
                left: Box::new(if negated {
                    Expr::Not(Box::new(left))
                } else {
                    left
                }),
                op: CompareOp::Like,
                quantifier: None,
                right: Box::new(right),
            });
        }

        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Symbol("=")) => Some(CompareOp::Equal),
            Some(TokenKind::Symbol("<>" | "!=")) => Some(CompareOp::NotEqual),
            Some(TokenKind::Symbol(">")) => Some(CompareOp::GreaterThan),
            Some(TokenKind::Symbol(">=")) => Some(CompareOp::GreaterThanOrEqual),
            Some(TokenKind::Symbol("<")) => Some(CompareOp::LessThan),
            Some(TokenKind::Symbol("<=")) => Some(CompareOp::LessThanOrEqual),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        self.pos += 1;

        let quantifier = if self.eat_keyword("ANY") {
            Some(Quantifier::Any)
        } else if self.eat_keyword("SOME") {
            Some(Quantifier::Some)
        } else if self.eat_keyword("ALL") {
            Some(Quantifier::All)
        } else {
            None
        };
        let right = self.parse_additive()?;
        Ok(Expr::Comparison {
            left: Box::new(left),
            op,
            quantifier,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Symbol("+")) => BinaryOp::Add,
                Some(TokenKind::Symbol("-")) => BinaryOp::Subtract,
                Some(TokenKind::Symbol("||")) => BinaryOp::Concat,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Symbol("*")) => BinaryOp::Multiply,
                Some(TokenKind::Symbol("/")) => BinaryOp::Divide,
                Some(TokenKind::Symbol("%")) => BinaryOp::Modulo,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat_symbol("-") {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Minus,
                expr: Box::new(inner),
            });
        }
        if self.eat_symbol("+") {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Plus,
                expr: Box::new(inner),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat_symbol("::") {
            let type_name = self.parse_type_name()?;
            expr = Expr::Cast {
                expr: Box::new(expr),
                type_name,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("expected expression"));
        };

        match token.kind {
            TokenKind::Number(ref number) => {
                self.pos += 1;
                if let Ok(value) = number.parse::<i64>() {
                    Ok(Expr::Integer(value))
                } else {
                    Ok(Expr::Number(number.clone()))
                }
            }
            TokenKind::StringLit(ref value) => {
                self.pos += 1;
                Ok(Expr::String(value.clone()))
            }
            TokenKind::Symbol("(") => {
                self.pos += 1;
                let checkpoint = self.pos;
                if let Ok(inner) = self.parse_expr() {
                    if self.eat_symbol(")") {
                        return Ok(Expr::Paren(Box::new(inner)));
                    }
                }
                // Subqueries and other non-expression content: keep raw.
                self.pos = checkpoint;
                let inner = self.raw_balanced(&[])?;
                self.expect_symbol(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::Word(ref word) => {
                if word.eq_ignore_ascii_case("NULL") {
                    self.pos += 1;
                    return Ok(Expr::Null);
                }
                if word.eq_ignore_ascii_case("TRUE") {
                    self.pos += 1;
                    return Ok(Expr::Bool(true));
                }
                if word.eq_ignore_ascii_case("FALSE") {
                    self.pos += 1;
                    return Ok(Expr::Bool(false));
                }
                if word.eq_ignore_ascii_case("CAST") && self.peek_at(1).is_some_and(|t| t.is_symbol("(")) {
                    self.pos += 2;
                    let inner = self.parse_expr()?;
                    self.expect_keyword("AS")?;
                    let type_name = self.parse_type_name()?;
                    self.expect_symbol(")")?;
                    return Ok(Expr::Cast {
                        expr: Box::new(inner),
                        type_name,
                    });
                }
                // Typed literals: b'0', x'ff', DATE '2020-01-01',
                // _utf8mb4'abc'. Kept raw.
                if let Some(Token {
                    kind: TokenKind::StringLit(_),
                    end,
                    ..
                }) = self.peek_at(1)
                {
                    let raw = self.source[token.start..*end].to_string();
                    self.pos += 2;
                    return Ok(Expr::Raw(raw));
                }
                self.pos += 1;
                self.parse_name_continuation(Ident::unquoted(word.clone()), word)
            }
            TokenKind::QuotedIdent(ref word) => {
                self.pos += 1;
                self.parse_name_continuation(Ident::quoted(word.clone()), word)
            }
            _ => Err(self.error_here("expected expression")),
        }
    }

    /// After an identifier: qualification (`NEW.id`), a call (`now()`), a
    /// bare keyword function, or just the identifier itself.
    fn parse_name_continuation(&mut self, first: Ident, raw_word: &str) -> Result<Expr> {
        if self.eat_symbol(".") {
            let name = self.parse_ident()?;
            if self.check_symbol("(") {
                let call_name = format!("{}.{}", first.value, name.value);
                return self.parse_call(call_name);
            }
            return Ok(Expr::Qualified {
                qualifier: first,
                name,
            });
        }
        if self.check_symbol("(") {
            return self.parse_call(first.value);
        }
        if !first.quoted
            && BARE_FUNCTIONS
                .iter()
                .any(|name| raw_word.eq_ignore_ascii_case(name))
        {
            return Ok(Expr::BareFunction(raw_word.to_ascii_uppercase()));
        }
        Ok(Expr::Ident(first))
    }

    fn parse_call(&mut self, name: String) -> Result<Expr> {
        self.expect_symbol("(")?;
        let mut args = Vec::new();
        if !self.check_symbol(")") {
            loop {
                if self.eat_symbol("*") {
                    args.push(Expr::Raw("*".to_string()));
                } else {
                    args.push(self.parse_expr()?);
                }
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }
        self.expect_symbol(")")?;
        Ok(Expr::FunctionCall { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_sql, GrammarProfile};
    use crate::ast::{Statement, TableConstraint};

    fn parse_check(sql: &str) -> Expr {
        let profile = GrammarProfile::postgres();
        let statements = parse_sql(sql, &profile).expect("should parse");
        let Statement::CreateTable(table) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        let TableConstraint::Check(check) = &table.constraints[0] else {
            panic!("expected check constraint");
        };
        check.expr.clone()
    }

    #[test]
    fn comparison_with_quantifier() {
        let expr = parse_check("CREATE TABLE t (a int, CHECK (a = ANY (whitelist())));");
        let Expr::Comparison { quantifier, .. } = expr else {
            panic!("expected comparison, got {expr:?}");
        };
        assert_eq!(quantifier, Some(Quantifier::Any));
    }

    #[test]
    fn precedence_binds_and_over_or() {
        let expr = parse_check("CREATE TABLE t (a int, b int, CHECK (a > 0 OR a < 10 AND b = 1));");
        assert!(matches!(expr, Expr::Or(_, _)));
    }

    #[test]
    fn cast_suffix_chains() {
        let profile = GrammarProfile::postgres();
        let statements =
            parse_sql("CREATE TABLE t (a text DEFAULT 'x'::character varying);", &profile)
                .expect("should parse");
        let Statement::CreateTable(table) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        let Some(Expr::Cast { type_name, .. }) = &table.columns[0].default else {
            panic!("expected cast default");
        };
        assert_eq!(type_name.base, "character varying");
    }

    #[test]
    fn unknown_construct_falls_back_to_raw() {
        let profile = GrammarProfile::postgres();
        let statements = parse_sql(
            "CREATE TABLE t (a jsonb DEFAULT jsonb_build_object('k', ARRAY[1, 2]));",
            &profile,
        )
        .expect("should parse");
        let Statement::CreateTable(table) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        assert!(table.columns[0].default.is_some());
    }
}
