use crate::{Ident, TypeName};

/// Expression AST used by column defaults, generated columns, check
/// constraints and partial-index predicates. Kept deliberately small: DDL
/// expressions are shallow, and anything the parser cannot shape falls back
/// to [`Expr::Raw`] so no statement is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Integer(i64),
    /// Non-integer numeric literal, kept as written (`0.0`, `1e6`).
    Number(String),
    String(String),
    Ident(Ident),
    Qualified {
        qualifier: Ident,
        name: Ident,
    },
    /// `now()`, `concat(a, b)`.
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    /// Parenless keyword functions: `CURRENT_TIMESTAMP`, `CURRENT_DATE`.
    BareFunction(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Comparison {
        left: Box<Expr>,
        op: CompareOp,
        quantifier: Option<Quantifier>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Cast {
        expr: Box<Expr>,
        type_name: TypeName,
    },
    Paren(Box<Expr>),
    /// Balanced-token fallback for constructs outside the grammar.
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    Some,
    All,
}

impl Expr {
    pub fn ident(value: impl Into<String>) -> Self {
        Self::Ident(Ident::unquoted(value))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
        }
    }
}
