//! SQL text construction for SQL Server: bracket-quoted identifiers,
//! `IDENTITY(1,1)` for auto-increment columns.

use sqldrift_core::ast::{
    CheckConstraint, Column, ForeignKey, IndexElem, PrimaryKey, SortDirection, UniqueConstraint,
};
use sqldrift_core::{Expr, Ident, QualifiedName};

pub(crate) fn quote_ident(ident: &Ident) -> String {
    format!("[{}]", ident.value.replace(']', "]]"))
}

pub(crate) fn quote_name(name: &QualifiedName) -> String {
    match &name.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&name.name)),
        None => quote_ident(&name.name),
    }
}

pub(crate) fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn column_sql(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.type_name.raw);
    if let Some(collation) = &column.collation {
        sql.push_str(" COLLATE ");
        sql.push_str(collation);
    }
    if let Some(generated) = &column.generated {
        // Computed column: the type is implied by the expression.
        sql = format!(
            "{} AS ({})",
            quote_ident(&column.name),
            expr_sql(&generated.expr)
        );
        if generated.stored {
            sql.push_str(" PERSISTED");
        }
        return sql;
    }
    if column.auto_increment {
        sql.push_str(" IDENTITY(1,1)");
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&expr_sql(default));
    }
    sql
}

pub(crate) fn index_elems_sql(elems: &[IndexElem]) -> String {
    elems
        .iter()
        .map(index_elem_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

fn index_elem_sql(elem: &IndexElem) -> String {
    let mut sql = match &elem.expr {
        Expr::Ident(ident) => quote_ident(ident),
        other => format!("({})", expr_sql(other)),
    };
    if elem.direction == Some(SortDirection::Desc) {
        sql.push_str(" DESC");
    }
    sql
}

pub(crate) fn primary_key_sql(pk: &PrimaryKey) -> String {
    let mut sql = String::new();
    if let Some(name) = &pk.name {
        sql.push_str("CONSTRAINT ");
        sql.push_str(&quote_ident(name));
        sql.push(' ');
    }
    sql.push_str("PRIMARY KEY (");
    sql.push_str(&index_elems_sql(&pk.columns));
    sql.push(')');
    sql
}

pub(crate) fn unique_sql(unique: &UniqueConstraint) -> String {
    let mut sql = String::new();
    if let Some(name) = &unique.name {
        sql.push_str("CONSTRAINT ");
        sql.push_str(&quote_ident(name));
        sql.push(' ');
    }
    sql.push_str("UNIQUE (");
    sql.push_str(&index_elems_sql(&unique.columns));
    sql.push(')');
    sql
}

pub(crate) fn check_sql(check: &CheckConstraint) -> String {
    let mut sql = String::new();
    if let Some(name) = &check.name {
        sql.push_str("CONSTRAINT ");
        sql.push_str(&quote_ident(name));
        sql.push(' ');
    }
    sql.push_str("CHECK (");
    sql.push_str(&expr_sql(&check.expr));
    sql.push(')');
    sql
}

pub(crate) fn foreign_key_sql(fk: &ForeignKey) -> String {
    let mut sql = String::new();
    if let Some(name) = &fk.name {
        sql.push_str("CONSTRAINT ");
        sql.push_str(&quote_ident(name));
        sql.push(' ');
    }
    sql.push_str("FOREIGN KEY (");
    sql.push_str(&ident_list(&fk.columns));
    sql.push_str(") REFERENCES ");
    sql.push_str(&quote_name(&fk.reference.table));
    sql.push_str(" (");
    sql.push_str(&ident_list(&fk.reference.columns));
    sql.push(')');
    if let Some(action) = fk.reference.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = fk.reference.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
    sql
}

pub(crate) fn ident_list(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn expr_sql(expr: &Expr) -> String {
    use sqldrift_core::{BinaryOp, CompareOp, Quantifier, UnaryOp};

    match expr {
        Expr::Null => "NULL".to_string(),
        // SQL Server has no boolean literals; bit columns default to 1/0.
        Expr::Bool(true) => "1".to_string(),
        Expr::Bool(false) => "0".to_string(),
        Expr::Integer(value) => value.to_string(),
        Expr::Number(number) => number.clone(),
        Expr::String(value) => quote_string(value),
        Expr::Ident(ident) => quote_ident(ident),
        Expr::Qualified { qualifier, name } => {
            format!("{}.{}", quote_ident(qualifier), quote_ident(name))
        }
        Expr::FunctionCall { name, args } => {
            let args = args.iter().map(expr_sql).collect::<Vec<_>>().join(", ");
            format!("{name}({args})")
        }
        Expr::BareFunction(name) => name.clone(),
        Expr::Unary { op, expr } => {
            let op = match op {
                UnaryOp::Plus => "+",
                UnaryOp::Minus => "-",
            };
            format!("{op}{}", expr_sql(expr))
        }
        Expr::Binary { left, op, right } => {
            let op = match op {
                BinaryOp::Add => "+",
                BinaryOp::Subtract => "-",
                BinaryOp::Multiply => "*",
                BinaryOp::Divide => "/",
                BinaryOp::Modulo => "%",
                BinaryOp::Concat => "+",
            };
            format!("{} {op} {}", expr_sql(left), expr_sql(right))
        }
        Expr::Comparison {
            left,
            op,
            quantifier,
            right,
        } => {
            let op = match op {
                CompareOp::Equal => "=",
                CompareOp::NotEqual => "<>",
                CompareOp::GreaterThan => ">",
                CompareOp::GreaterThanOrEqual => ">=",
                CompareOp::LessThan => "<",
                CompareOp::LessThanOrEqual => "<=",
                CompareOp::Like => "LIKE",
            };
            let mut sql = format!("{} {op}", expr_sql(left));
            if let Some(quantifier) = quantifier {
                sql.push(' ');
                sql.push_str(match quantifier {
                    Quantifier::Any => "ANY",
                    Quantifier::Some => "SOME",
                    Quantifier::All => "ALL",
                });
            }
            sql.push(' ');
            sql.push_str(&expr_sql(right));
            sql
        }
        Expr::And(left, right) => format!("{} AND {}", expr_sql(left), expr_sql(right)),
        Expr::Or(left, right) => format!("{} OR {}", expr_sql(left), expr_sql(right)),
        Expr::Not(inner) => format!("NOT {}", expr_sql(inner)),
        Expr::IsNull { expr, negated } => {
            let test = if *negated { "IS NOT NULL" } else { "IS NULL" };
            format!("{} {test}", expr_sql(expr))
        }
        Expr::In {
            expr,
            list,
            negated,
        } => {
            let keyword = if *negated { "NOT IN" } else { "IN" };
            let list = list.iter().map(expr_sql).collect::<Vec<_>>().join(", ");
            format!("{} {keyword} ({list})", expr_sql(expr))
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
            format!(
                "{} {keyword} {} AND {}",
                expr_sql(expr),
                expr_sql(low),
                expr_sql(high)
            )
        }
        Expr::Cast { expr, type_name } => {
            format!("CAST({} AS {})", expr_sql(expr), type_name.raw)
        }
        Expr::Paren(inner) => format!("({})", expr_sql(inner)),
        Expr::Raw(raw) => raw.clone(),
    }
}
