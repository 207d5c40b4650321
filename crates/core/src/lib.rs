//! Engine for declarative schema migrations: parse the current and desired
//! DDL, build schema models, diff them and emit ordered migration DDL.
//!
//! The crate is dialect-agnostic; engine families plug in through
//! [`Dialect`], with one implementation crate per family.

pub mod adapter;
pub mod ast;
pub mod builder;
pub mod config;
pub mod diff;
pub mod dialect;
mod error;
mod expr;
mod ident;
pub mod model;
pub mod normalize;
pub mod order;
pub mod orchestrator;
pub mod parser;
pub mod render;
mod statement;
mod types;

pub use error::{
    DependencyError, Error, ExecutionError, ParseError, Result, UnsupportedError,
};
pub use expr::{BinaryOp, CompareOp, Expr, Quantifier, UnaryOp};
pub use ident::{Ident, QualifiedName};
pub use statement::MigrationStatement;
pub use types::{TypeName, Value};

pub use adapter::{DatabaseAdapter, FileAdapter};
pub use config::{ConnectionConfig, MigrationConfig, ObjectFilter};
pub use dialect::Dialect;
pub use orchestrator::{Mode, Orchestrator, RunOutcome};
pub use parser::{DialectFamily, GrammarProfile};
pub use render::Plan;
