//! Hand-written DDL parser shared by all dialects.
//!
//! One lexer and one recursive-descent grammar produce the common
//! [`Statement`](crate::ast::Statement) AST; per-dialect syntax differences
//! are toggles on [`GrammarProfile`], not separate grammars.

mod expr;
mod lexer;

pub use lexer::{Token, TokenKind};

use crate::ast::{
    AlterAction, AlterTable, CheckConstraint, Column, ColumnPosition, CreateIndex, CreatePolicy,
    CreateSequence, CreateTable, CreateTrigger, CreateType, CreateView, DropStatement, ForeignKey,
    ForeignKeyReference, GeneratedColumn, IndexElem, ObjectKind, PrimaryKey, PrivilegeStatement,
    ReferentialAction, SortDirection, Statement, TableConstraint, TableOption, UniqueConstraint,
    ViewSecurity,
};
use crate::{Expr, Ident, ParseError, QualifiedName, Result, TypeName, Value};

use lexer::Lexer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectFamily {
    Mysql,
    Postgres,
    Sqlite,
    Mssql,
}

impl DialectFamily {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
        }
    }
}

/// Syntax toggles for one dialect family. The lexer and parser consult this
/// instead of branching on the dialect by name.
#[derive(Debug, Clone)]
pub struct GrammarProfile {
    pub family: DialectFamily,
    pub backtick_idents: bool,
    pub bracket_idents: bool,
    pub hash_comments: bool,
    pub dollar_strings: bool,
    /// MySQL `/*!40101 ... */` comments whose content is live SQL.
    pub version_comments: bool,
    pub double_quote_is_string: bool,
    pub backslash_escapes: bool,
    pub unsigned_types: bool,
    pub charset_clauses: bool,
    pub auto_increment: bool,
    pub prefix_indexes: bool,
    pub on_update_clause: bool,
    /// Schemas, extensions, sequences, enum types, policies, materialized
    /// views.
    pub schema_objects: bool,
    pub concurrent_indexes: bool,
    pub identity_columns: bool,
    pub go_separators: bool,
    pub default_schema: Option<&'static str>,
    /// Server-side identifier truncation limit, if the engine has one.
    pub max_identifier_length: Option<usize>,
}

impl GrammarProfile {
    #[must_use]
    pub fn mysql() -> Self {
        Self {
            family: DialectFamily::Mysql,
            backtick_idents: true,
            bracket_idents: false,
            hash_comments: true,
            dollar_strings: false,
            version_comments: true,
            double_quote_is_string: true,
            backslash_escapes: true,
            unsigned_types: true,
            charset_clauses: true,
            auto_increment: true,
            prefix_indexes: true,
            on_update_clause: true,
            schema_objects: false,
            concurrent_indexes: false,
            identity_columns: false,
            go_separators: false,
            default_schema: None,
            max_identifier_length: Some(64),
        }
    }

    #[must_use]
    pub fn postgres() -> Self {
        Self {
            family: DialectFamily::Postgres,
            backtick_idents: false,
            bracket_idents: false,
            hash_comments: false,
            dollar_strings: true,
            version_comments: false,
            double_quote_is_string: false,
            backslash_escapes: false,
            unsigned_types: false,
            charset_clauses: false,
            auto_increment: false,
            prefix_indexes: false,
            on_update_clause: false,
            schema_objects: true,
            concurrent_indexes: true,
            identity_columns: false,
            go_separators: false,
            default_schema: Some("public"),
            max_identifier_length: Some(63),
        }
    }

    #[must_use]
    pub fn sqlite() -> Self {
        Self {
            family: DialectFamily::Sqlite,
            backtick_idents: true,
            bracket_idents: true,
            hash_comments: false,
            dollar_strings: false,
            version_comments: false,
            double_quote_is_string: false,
            backslash_escapes: false,
            unsigned_types: false,
            charset_clauses: false,
            auto_increment: true,
            prefix_indexes: false,
            on_update_clause: false,
            schema_objects: false,
            concurrent_indexes: false,
            identity_columns: false,
            go_separators: false,
            default_schema: None,
            max_identifier_length: None,
        }
    }

    #[must_use]
    pub fn mssql() -> Self {
        Self {
            family: DialectFamily::Mssql,
            backtick_idents: false,
            bracket_idents: true,
            hash_comments: false,
            dollar_strings: false,
            version_comments: false,
            double_quote_is_string: false,
            backslash_escapes: false,
            unsigned_types: false,
            charset_clauses: false,
            auto_increment: false,
            prefix_indexes: false,
            on_update_clause: false,
            schema_objects: true,
            concurrent_indexes: false,
            identity_columns: true,
            go_separators: true,
            default_schema: Some("dbo"),
            max_identifier_length: Some(128),
        }
    }
}

/// Parses a whole DDL script into statements.
pub fn parse_sql(source: &str, profile: &GrammarProfile) -> Result<Vec<Statement>> {
    let tokens = Lexer::new(source, profile).tokenize()?;
    Parser {
        source,
        profile,
        tokens,
        pos: 0,
        stmt_start: 0,
    }
    .parse_script()
}

pub(crate) struct Parser<'a> {
    source: &'a str,
    profile: &'a GrammarProfile,
    tokens: Vec<Token>,
    pos: usize,
    stmt_start: usize,
}

/// An index declared inside CREATE TABLE (MySQL `KEY`/`INDEX` elements);
/// hoisted to standalone [`CreateIndex`] statements after the table parses.
struct InlineKey {
    name: Option<Ident>,
    columns: Vec<IndexElem>,
    unique: bool,
    method: Option<String>,
}

impl<'a> Parser<'a> {
    fn parse_script(mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            while self.eat_symbol(";") || (self.profile.go_separators && self.eat_keyword("GO")) {}
            let Some(token) = self.peek() else {
                break;
            };
            self.stmt_start = token.start;
            self.parse_statement(&mut statements)?;
            if let Some(token) = self.peek() {
                if !token.is_symbol(";") && !(self.profile.go_separators && token.is_keyword("GO"))
                {
                    return Err(self.error_here("expected end of statement"));
                }
            }
        }
        Ok(statements)
    }

    fn parse_statement(&mut self, out: &mut Vec<Statement>) -> Result<()> {
        // Session noise that dumps carry but that does not describe schema.
        for skip in ["SET", "USE", "LOCK", "UNLOCK"] {
            if self.check_keyword(skip) {
                self.skip_to_statement_end();
                return Ok(());
            }
        }

        if self.eat_keyword("CREATE") {
            self.parse_create(out)
        } else if self.eat_keyword("ALTER") {
            self.expect_keyword("TABLE")?;
            self.parse_alter_table(out)
        } else if self.eat_keyword("DROP") {
            let statement = self.parse_drop()?;
            out.push(statement);
            Ok(())
        } else if self.eat_keyword("GRANT") {
            let statement = self.parse_privilege(true)?;
            out.push(statement);
            Ok(())
        } else if self.eat_keyword("REVOKE") {
            let statement = self.parse_privilege(false)?;
            out.push(statement);
            Ok(())
        } else {
            Err(self.error_here("expected CREATE, ALTER, DROP, GRANT or REVOKE"))
        }
    }

    fn parse_create(&mut self, out: &mut Vec<Statement>) -> Result<()> {
        let or_replace = if self.eat_keyword("OR") {
            self.expect_keyword("REPLACE")?;
            true
        } else {
            false
        };

        // MySQL view prefix clauses.
        let mut security = None;
        loop {
            if self.eat_keyword("ALGORITHM") {
                self.eat_symbol("=");
                self.next_token();
            } else if self.eat_keyword("DEFINER") {
                self.eat_symbol("=");
                self.next_token();
                if self.eat_symbol("@") {
                    self.next_token();
                }
            } else if self.check_keyword("SQL") && self.peek_at(1).is_some_and(|t| t.is_keyword("SECURITY")) {
                self.next_token();
                self.next_token();
                security = if self.eat_keyword("INVOKER") {
                    Some(ViewSecurity::Invoker)
                } else {
                    self.expect_keyword("DEFINER")?;
                    Some(ViewSecurity::Definer)
                };
            } else {
                break;
            }
        }

        let unique = self.eat_keyword("UNIQUE");
        let materialized = self.eat_keyword("MATERIALIZED");
        while self.eat_keyword("TEMPORARY") || self.eat_keyword("TEMP") {}

        let mut index_method = None;
        for hint in ["CLUSTERED", "NONCLUSTERED", "FULLTEXT", "SPATIAL"] {
            if self.eat_keyword(hint) {
                index_method = Some(hint.to_ascii_lowercase());
            }
        }

        if self.eat_keyword("TABLE") {
            self.parse_create_table(out)
        } else if self.eat_keyword("INDEX") || (unique && self.eat_keyword("KEY")) {
            let statement = self.parse_create_index(unique, index_method)?;
            out.push(statement);
            Ok(())
        } else if self.eat_keyword("VIEW") {
            let statement = self.parse_create_view(or_replace, materialized, security)?;
            out.push(statement);
            Ok(())
        } else if self.eat_keyword("TRIGGER") {
            let statement = self.parse_create_trigger()?;
            out.push(statement);
            Ok(())
        } else if self.check_keyword("SEQUENCE")
            || self.check_keyword("TYPE")
            || self.check_keyword("EXTENSION")
            || self.check_keyword("SCHEMA")
            || self.check_keyword("POLICY")
        {
            if !self.profile.schema_objects {
                let feature = format!(
                    "CREATE {}",
                    self.peek().map_or(String::new(), token_text).to_ascii_uppercase()
                );
                return Err(crate::UnsupportedError::new(self.profile.family.name(), feature).into());
            }
            let statement = if self.eat_keyword("SEQUENCE") {
                self.parse_create_sequence()?
            } else if self.eat_keyword("TYPE") {
                self.parse_create_type()?
            } else if self.eat_keyword("EXTENSION") {
                self.parse_create_extension()?
            } else if self.eat_keyword("SCHEMA") {
                self.parse_create_schema()?
            } else {
                self.expect_keyword("POLICY")?;
                self.parse_create_policy()?
            };
            out.push(statement);
            Ok(())
        } else {
            Err(self.error_here("unsupported CREATE statement"))
        }
    }

    fn parse_create_table(&mut self, out: &mut Vec<Statement>) -> Result<()> {
        let if_not_exists = self.eat_if_not_exists()?;
        let name = self.parse_qualified_name()?;
        self.expect_symbol("(")?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        let mut keys = Vec::new();
        loop {
            self.parse_table_element(&mut columns, &mut constraints, &mut keys)?;
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;

        let mut options = Vec::new();
        let mut partition = None;
        loop {
            let Some(token) = self.peek() else { break };
            if token.is_symbol(";") || (self.profile.go_separators && token.is_keyword("GO")) {
                break;
            }
            if token.is_keyword("PARTITION") {
                partition = Some(self.raw_tail());
                break;
            }
            if token.is_keyword("WITHOUT") {
                // SQLite WITHOUT ROWID, PostgreSQL WITHOUT OIDS.
                self.next_token();
                let value = self.next_word().unwrap_or_default();
                options.push(TableOption {
                    name: format!("WITHOUT {}", value.to_ascii_uppercase()),
                    value: Value::Bool(true),
                });
                continue;
            }
            let option = self.parse_table_option()?;
            options.push(option);
        }

        out.push(Statement::CreateTable(CreateTable {
            name: name.clone(),
            if_not_exists,
            columns,
            constraints,
            options,
            partition,
        }));
        for key in keys {
            out.push(Statement::CreateIndex(CreateIndex {
                name: key.name,
                table: name.clone(),
                columns: key.columns,
                unique: key.unique,
                concurrently: false,
                if_not_exists: false,
                method: key.method,
                where_clause: None,
            }));
        }
        Ok(())
    }

    fn parse_table_element(
        &mut self,
        columns: &mut Vec<Column>,
        constraints: &mut Vec<TableConstraint>,
        keys: &mut Vec<InlineKey>,
    ) -> Result<()> {
        let mut constraint_name = None;
        if self.eat_keyword("CONSTRAINT") {
            constraint_name = Some(self.parse_ident()?);
        }

        if self.check_keyword("PRIMARY") {
            self.next_token();
            self.expect_keyword("KEY")?;
            self.skip_index_using();
            let columns = self.parse_index_elems()?;
            constraints.push(TableConstraint::PrimaryKey(PrimaryKey {
                name: constraint_name,
                columns,
            }));
            return Ok(());
        }
        if self.check_keyword("UNIQUE") {
            self.next_token();
            let _ = self.eat_keyword("KEY") || self.eat_keyword("INDEX");
            let name = if self.check_symbol("(") {
                constraint_name
            } else {
                Some(self.parse_ident()?)
            };
            self.skip_index_using();
            let columns = self.parse_index_elems()?;
            constraints.push(TableConstraint::Unique(UniqueConstraint { name, columns }));
            return Ok(());
        }
        if self.check_keyword("FOREIGN") {
            self.next_token();
            self.expect_keyword("KEY")?;
            let name = if self.check_symbol("(") {
                constraint_name
            } else {
                Some(self.parse_ident()?)
            };
            let fk_columns = self.parse_ident_list()?;
            self.expect_keyword("REFERENCES")?;
            let reference = self.parse_fk_reference()?;
            constraints.push(TableConstraint::ForeignKey(ForeignKey {
                name,
                columns: fk_columns,
                reference,
            }));
            return Ok(());
        }
        if self.check_keyword("CHECK") {
            self.next_token();
            let expr = self.parse_paren_expr()?;
            let no_inherit = if self.eat_keyword("NO") {
                self.expect_keyword("INHERIT")?;
                true
            } else {
                false
            };
            constraints.push(TableConstraint::Check(CheckConstraint {
                name: constraint_name,
                expr,
                no_inherit,
            }));
            return Ok(());
        }
        if constraint_name.is_none()
            && (self.check_keyword("KEY")
                || self.check_keyword("INDEX")
                || self.check_keyword("FULLTEXT")
                || self.check_keyword("SPATIAL"))
        {
            let method = if self.eat_keyword("FULLTEXT") || self.eat_keyword("SPATIAL") {
                let method = self
                    .tokens
                    .get(self.pos - 1)
                    .map(|t| token_text(t).to_ascii_lowercase());
                let _ = self.eat_keyword("KEY") || self.eat_keyword("INDEX");
                method
            } else {
                self.next_token();
                None
            };
            let name = if self.check_symbol("(") {
                None
            } else {
                Some(self.parse_ident()?)
            };
            self.skip_index_using();
            let columns = self.parse_index_elems()?;
            let method = self.index_method_suffix().or(method);
            keys.push(InlineKey {
                name,
                columns,
                unique: false,
                method,
            });
            return Ok(());
        }

        let column = self.parse_column_def(constraint_name, constraints)?;
        columns.push(column);
        Ok(())
    }

    fn parse_column_def(
        &mut self,
        mut pending_name: Option<Ident>,
        constraints: &mut Vec<TableConstraint>,
    ) -> Result<Column> {
        let name = self.parse_ident()?;
        let type_name = self.parse_type_name()?;
        let mut column = Column::new("", type_name);
        column.name = name;

        loop {
            if self.eat_keyword("CONSTRAINT") {
                pending_name = Some(self.parse_ident()?);
                continue;
            }
            if self.eat_keyword("NOT") {
                self.expect_keyword("NULL")?;
                column.not_null = true;
                continue;
            }
            if self.eat_keyword("NULL") {
                column.not_null = false;
                continue;
            }
            if self.eat_keyword("DEFAULT") {
                column.default = Some(self.parse_expr_or_raw(COLUMN_OPTION_KEYWORDS)?);
                continue;
            }
            if self.profile.auto_increment
                && (self.eat_keyword("AUTO_INCREMENT") || self.eat_keyword("AUTOINCREMENT"))
            {
                column.auto_increment = true;
                continue;
            }
            if self.profile.identity_columns && self.eat_keyword("IDENTITY") {
                if self.eat_symbol("(") {
                    while !self.eat_symbol(")") {
                        if self.next_token().is_none() {
                            return Err(self.error_here("unterminated IDENTITY clause"));
                        }
                    }
                }
                column.auto_increment = true;
                continue;
            }
            if self.eat_keyword("GENERATED") {
                if self.eat_keyword("ALWAYS") {
                    self.expect_keyword("AS")?;
                    if self.eat_keyword("IDENTITY") {
                        column.auto_increment = true;
                        continue;
                    }
                    column.generated = Some(self.parse_generated_body()?);
                } else {
                    // GENERATED BY DEFAULT AS IDENTITY
                    self.expect_keyword("BY")?;
                    self.expect_keyword("DEFAULT")?;
                    self.expect_keyword("AS")?;
                    self.expect_keyword("IDENTITY")?;
                    column.auto_increment = true;
                }
                continue;
            }
            if self.check_keyword("AS") && self.peek_at(1).is_some_and(|t| t.is_symbol("(")) {
                self.next_token();
                column.generated = Some(self.parse_generated_body()?);
                continue;
            }
            if self.eat_keyword("PRIMARY") {
                self.expect_keyword("KEY")?;
                let _ = self.eat_keyword("ASC") || self.eat_keyword("DESC");
                column.inline_primary_key = true;
                continue;
            }
            if self.eat_keyword("UNIQUE") {
                self.eat_keyword("KEY");
                column.inline_unique = true;
                continue;
            }
            if self.eat_keyword("REFERENCES") {
                column.inline_references = Some(self.parse_fk_reference()?);
                continue;
            }
            if self.eat_keyword("CHECK") {
                let expr = self.parse_paren_expr()?;
                constraints.push(TableConstraint::Check(CheckConstraint {
                    name: pending_name.take(),
                    expr,
                    no_inherit: false,
                }));
                continue;
            }
            if self.eat_keyword("COMMENT") {
                column.comment = self.next_string();
                continue;
            }
            if self.profile.charset_clauses && self.eat_keyword("CHARACTER") {
                self.expect_keyword("SET")?;
                column.charset = self.next_word();
                continue;
            }
            if self.profile.charset_clauses && self.eat_keyword("CHARSET") {
                column.charset = self.next_word();
                continue;
            }
            if self.eat_keyword("COLLATE") {
                column.collation = self.next_word().or_else(|| self.next_string());
                continue;
            }
            if self.profile.on_update_clause
                && self.check_keyword("ON")
                && self.peek_at(1).is_some_and(|t| t.is_keyword("UPDATE"))
            {
                self.next_token();
                self.next_token();
                column.on_update = Some(self.parse_expr_or_raw(COLUMN_OPTION_KEYWORDS)?);
                continue;
            }
            break;
        }

        Ok(column)
    }

    fn parse_generated_body(&mut self) -> Result<GeneratedColumn> {
        let expr = self.parse_paren_expr()?;
        let stored = if self.eat_keyword("STORED") {
            true
        } else {
            self.eat_keyword("VIRTUAL");
            false
        };
        Ok(GeneratedColumn { expr, stored })
    }

    fn parse_fk_reference(&mut self) -> Result<ForeignKeyReference> {
        let table = self.parse_qualified_name()?;
        let columns = if self.check_symbol("(") {
            self.parse_ident_list()?
        } else {
            Vec::new()
        };
        let mut on_delete = None;
        let mut on_update = None;
        loop {
            if self.eat_keyword("ON") {
                if self.eat_keyword("DELETE") {
                    on_delete = Some(self.parse_referential_action()?);
                } else {
                    self.expect_keyword("UPDATE")?;
                    on_update = Some(self.parse_referential_action()?);
                }
                continue;
            }
            if self.eat_keyword("MATCH") {
                self.next_token();
                continue;
            }
            if self.check_keyword("NOT")
                && self.peek_at(1).is_some_and(|t| t.is_keyword("DEFERRABLE"))
            {
                self.next_token();
                self.next_token();
                continue;
            }
            if self.eat_keyword("DEFERRABLE") {
                continue;
            }
            if self.eat_keyword("INITIALLY") {
                self.next_token();
                continue;
            }
            break;
        }
        Ok(ForeignKeyReference {
            table,
            columns,
            on_delete,
            on_update,
        })
    }

    fn parse_referential_action(&mut self) -> Result<ReferentialAction> {
        if self.eat_keyword("CASCADE") {
            Ok(ReferentialAction::Cascade)
        } else if self.eat_keyword("RESTRICT") {
            Ok(ReferentialAction::Restrict)
        } else if self.eat_keyword("SET") {
            if self.eat_keyword("NULL") {
                Ok(ReferentialAction::SetNull)
            } else {
                self.expect_keyword("DEFAULT")?;
                Ok(ReferentialAction::SetDefault)
            }
        } else if self.eat_keyword("NO") {
            self.expect_keyword("ACTION")?;
            Ok(ReferentialAction::NoAction)
        } else {
            Err(self.error_here("expected referential action"))
        }
    }

    fn parse_index_elems(&mut self) -> Result<Vec<IndexElem>> {
        self.expect_symbol("(")?;
        let mut elems = Vec::new();
        loop {
            elems.push(self.parse_index_elem()?);
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;
        Ok(elems)
    }

    fn parse_index_elem(&mut self) -> Result<IndexElem> {
        let checkpoint = self.pos;
        let mut elem = match self.parse_ident() {
            Ok(ident)
                if self
                    .peek()
                    .is_none_or(|t| INDEX_ELEM_BOUNDARY.iter().any(|s| t.is_symbol(s)))
                    || self.peek().is_some_and(|t| {
                        t.is_keyword("ASC") || t.is_keyword("DESC")
                    })
                    || (self.profile.prefix_indexes && self.at_prefix_length()) =>
            {
                IndexElem {
                    expr: Expr::Ident(ident),
                    prefix: None,
                    direction: None,
                }
            }
            _ => {
                self.pos = checkpoint;
                IndexElem {
                    expr: self.parse_expr_or_raw(&["ASC", "DESC"])?,
                    prefix: None,
                    direction: None,
                }
            }
        };
        if self.profile.prefix_indexes && self.at_prefix_length() {
            self.next_token();
            if let Some(Token {
                kind: TokenKind::Number(number),
                ..
            }) = self.next_token()
            {
                elem.prefix = number.parse().ok();
            }
            self.expect_symbol(")")?;
        }
        if self.eat_keyword("ASC") {
            elem.direction = Some(SortDirection::Asc);
        } else if self.eat_keyword("DESC") {
            elem.direction = Some(SortDirection::Desc);
        }
        Ok(elem)
    }

    fn at_prefix_length(&self) -> bool {
        self.check_symbol("(")
            && matches!(
                self.peek_at(1).map(|t| &t.kind),
                Some(TokenKind::Number(_))
            )
            && self.peek_at(2).is_some_and(|t| t.is_symbol(")"))
    }

    fn skip_index_using(&mut self) {
        if self.eat_keyword("USING") {
            self.next_token();
        }
    }

    fn index_method_suffix(&mut self) -> Option<String> {
        if self.eat_keyword("USING") {
            self.next_word().map(|w| w.to_ascii_lowercase())
        } else {
            None
        }
    }

    fn parse_table_option(&mut self) -> Result<TableOption> {
        self.eat_keyword("DEFAULT");
        self.eat_symbol(",");
        let Some(mut name) = self.next_word() else {
            return Err(self.error_here("expected table option"));
        };
        name = name.to_ascii_uppercase();
        if name == "CHARACTER" && self.eat_keyword("SET") {
            name = "CHARSET".to_string();
        }
        self.eat_symbol("=");
        let value = match self.next_token() {
            Some(Token {
                kind: TokenKind::Number(number),
                ..
            }) => number
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or(Value::Float(number.parse().unwrap_or(0.0))),
            Some(Token {
                kind: TokenKind::StringLit(value),
                ..
            }) => Value::String(value),
            Some(Token {
                kind: TokenKind::Word(word) | TokenKind::QuotedIdent(word),
                ..
            }) => Value::String(word),
            _ => return Err(self.error_here("expected table option value")),
        };
        Ok(TableOption { name, value })
    }

    fn parse_alter_table(&mut self, out: &mut Vec<Statement>) -> Result<()> {
        self.eat_keyword("ONLY");
        self.eat_if_exists();
        let table = self.parse_qualified_name()?;
        let mut actions = Vec::new();

        loop {
            self.parse_alter_action(&table, &mut actions, out)?;
            if !self.eat_symbol(",") {
                break;
            }
        }

        if !actions.is_empty() {
            out.push(Statement::AlterTable(AlterTable { table, actions }));
        }
        Ok(())
    }

    fn parse_alter_action(
        &mut self,
        table: &QualifiedName,
        actions: &mut Vec<AlterAction>,
        out: &mut Vec<Statement>,
    ) -> Result<()> {
        if self.eat_keyword("ADD") {
            let mut constraint_name = None;
            if self.eat_keyword("CONSTRAINT") {
                constraint_name = Some(self.parse_ident()?);
            }
            if self.eat_keyword("PRIMARY") {
                self.expect_keyword("KEY")?;
                let columns = self.parse_index_elems()?;
                actions.push(AlterAction::AddConstraint(TableConstraint::PrimaryKey(
                    PrimaryKey {
                        name: constraint_name,
                        columns,
                    },
                )));
                return Ok(());
            }
            if self.eat_keyword("UNIQUE") {
                let _ = self.eat_keyword("KEY") || self.eat_keyword("INDEX");
                let name = if self.check_symbol("(") {
                    constraint_name
                } else {
                    Some(self.parse_ident()?)
                };
                let columns = self.parse_index_elems()?;
                actions.push(AlterAction::AddConstraint(TableConstraint::Unique(
                    UniqueConstraint { name, columns },
                )));
                return Ok(());
            }
            if self.eat_keyword("FOREIGN") {
                self.expect_keyword("KEY")?;
                let columns = self.parse_ident_list()?;
                self.expect_keyword("REFERENCES")?;
                let reference = self.parse_fk_reference()?;
                actions.push(AlterAction::AddConstraint(TableConstraint::ForeignKey(
                    ForeignKey {
                        name: constraint_name,
                        columns,
                        reference,
                    },
                )));
                return Ok(());
            }
            if self.eat_keyword("CHECK") {
                let expr = self.parse_paren_expr()?;
                let no_inherit = if self.eat_keyword("NO") {
                    self.expect_keyword("INHERIT")?;
                    true
                } else {
                    false
                };
                actions.push(AlterAction::AddConstraint(TableConstraint::Check(
                    CheckConstraint {
                        name: constraint_name,
                        expr,
                        no_inherit,
                    },
                )));
                return Ok(());
            }
            if self.eat_keyword("INDEX") || self.eat_keyword("KEY") {
                let name = if self.check_symbol("(") {
                    None
                } else {
                    Some(self.parse_ident()?)
                };
                let columns = self.parse_index_elems()?;
                out.push(Statement::CreateIndex(CreateIndex {
                    name,
                    table: table.clone(),
                    columns,
                    unique: false,
                    concurrently: false,
                    if_not_exists: false,
                    method: None,
                    where_clause: None,
                }));
                return Ok(());
            }
            self.eat_keyword("COLUMN");
            let _ = self.eat_if_not_exists()?;
            let mut checks = Vec::new();
            let column = self.parse_column_def(None, &mut checks)?;
            for check in checks {
                actions.push(AlterAction::AddConstraint(check));
            }
            let position = self.parse_column_position()?;
            actions.push(AlterAction::AddColumn { column, position });
            return Ok(());
        }

        if self.eat_keyword("DROP") {
            if self.eat_keyword("PRIMARY") {
                self.expect_keyword("KEY")?;
                actions.push(AlterAction::DropPrimaryKey);
                return Ok(());
            }
            if self.eat_keyword("CONSTRAINT") {
                self.eat_if_exists();
                let name = self.parse_ident()?;
                self.eat_keyword("CASCADE");
                actions.push(AlterAction::DropConstraint { name });
                return Ok(());
            }
            if self.eat_keyword("FOREIGN") {
                self.expect_keyword("KEY")?;
                let name = self.parse_ident()?;
                actions.push(AlterAction::DropForeignKey { name });
                return Ok(());
            }
            if self.eat_keyword("INDEX") || self.eat_keyword("KEY") {
                let name = self.parse_ident()?;
                actions.push(AlterAction::DropIndex { name });
                return Ok(());
            }
            self.eat_keyword("COLUMN");
            self.eat_if_exists();
            let name = self.parse_ident()?;
            self.eat_keyword("CASCADE");
            actions.push(AlterAction::DropColumn { name });
            return Ok(());
        }

        if self.eat_keyword("MODIFY") {
            self.eat_keyword("COLUMN");
            let mut checks = Vec::new();
            let column = self.parse_column_def(None, &mut checks)?;
            let position = self.parse_column_position()?;
            actions.push(AlterAction::ModifyColumn {
                from: None,
                column,
                position,
            });
            return Ok(());
        }

        if self.eat_keyword("CHANGE") {
            self.eat_keyword("COLUMN");
            let from = self.parse_ident()?;
            let mut checks = Vec::new();
            let column = self.parse_column_def(None, &mut checks)?;
            let position = self.parse_column_position()?;
            actions.push(AlterAction::ModifyColumn {
                from: Some(from),
                column,
                position,
            });
            return Ok(());
        }

        if self.eat_keyword("ALTER") {
            self.eat_keyword("COLUMN");
            let name = self.parse_ident()?;
            if self.eat_keyword("SET") {
                if self.eat_keyword("DEFAULT") {
                    let default = self.parse_expr_or_raw(&[])?;
                    actions.push(AlterAction::AlterColumnSetDefault {
                        name,
                        default: Some(default),
                    });
                } else {
                    self.expect_keyword("NOT")?;
                    self.expect_keyword("NULL")?;
                    actions.push(AlterAction::AlterColumnSetNotNull {
                        name,
                        not_null: true,
                    });
                }
                return Ok(());
            }
            if self.eat_keyword("DROP") {
                if self.eat_keyword("DEFAULT") {
                    actions.push(AlterAction::AlterColumnSetDefault {
                        name,
                        default: None,
                    });
                } else {
                    self.expect_keyword("NOT")?;
                    self.expect_keyword("NULL")?;
                    actions.push(AlterAction::AlterColumnSetNotNull {
                        name,
                        not_null: false,
                    });
                }
                return Ok(());
            }
            self.expect_keyword("TYPE")?;
            let type_name = self.parse_type_name()?;
            if self.eat_keyword("USING") {
                let _ = self.parse_expr_or_raw(&[])?;
            }
            actions.push(AlterAction::AlterColumnType { name, type_name });
            return Ok(());
        }

        if self.eat_keyword("RENAME") {
            if self.eat_keyword("COLUMN") {
                let from = self.parse_ident()?;
                self.expect_keyword("TO")?;
                let to = self.parse_ident()?;
                actions.push(AlterAction::RenameColumn { from, to });
                return Ok(());
            }
            self.expect_keyword("TO")?;
            let name = self.parse_qualified_name()?;
            actions.push(AlterAction::RenameTo { name });
            return Ok(());
        }

        Err(self.error_here("unsupported ALTER TABLE action"))
    }

    fn parse_column_position(&mut self) -> Result<Option<ColumnPosition>> {
        if self.eat_keyword("FIRST") {
            return Ok(Some(ColumnPosition::First));
        }
        if self.eat_keyword("AFTER") {
            return Ok(Some(ColumnPosition::After(self.parse_ident()?)));
        }
        Ok(None)
    }

    fn parse_create_index(
        &mut self,
        unique: bool,
        method_hint: Option<String>,
    ) -> Result<Statement> {
        let concurrently = self.profile.concurrent_indexes && self.eat_keyword("CONCURRENTLY");
        let if_not_exists = self.eat_if_not_exists()?;
        let name = if self.check_keyword("ON") {
            None
        } else {
            Some(self.parse_ident()?)
        };
        self.expect_keyword("ON")?;
        let table = self.parse_qualified_name()?;
        let method = self.index_method_suffix().or(method_hint);
        let columns = self.parse_index_elems()?;

        let mut where_clause = None;
        loop {
            let Some(token) = self.peek() else { break };
            if token.is_symbol(";") || (self.profile.go_separators && token.is_keyword("GO")) {
                break;
            }
            if token.is_keyword("WHERE") {
                self.next_token();
                where_clause = Some(self.parse_expr_or_raw(&[])?);
                break;
            }
            // INCLUDE (...) / WITH (...) / TABLESPACE tails do not affect
            // comparison identity.
            self.next_token();
        }

        Ok(Statement::CreateIndex(CreateIndex {
            name,
            table,
            columns,
            unique,
            concurrently,
            if_not_exists,
            method,
            where_clause,
        }))
    }

    fn parse_create_view(
        &mut self,
        or_replace: bool,
        materialized: bool,
        security: Option<ViewSecurity>,
    ) -> Result<Statement> {
        if materialized && !self.profile.schema_objects {
            return Err(crate::UnsupportedError::new(
                self.profile.family.name(),
                "CREATE MATERIALIZED VIEW",
            )
            .into());
        }
        let _ = self.eat_if_not_exists()?;
        let name = self.parse_qualified_name()?;
        let columns = if self.check_symbol("(") {
            self.parse_ident_list()?
        } else {
            Vec::new()
        };
        self.expect_keyword("AS")?;
        let query = self.raw_tail();
        if query.is_empty() {
            return Err(self.error_here("expected view query"));
        }
        Ok(Statement::CreateView(CreateView {
            name,
            or_replace,
            materialized,
            columns,
            query,
            security,
        }))
    }

    fn parse_create_trigger(&mut self) -> Result<Statement> {
        let _ = self.eat_if_not_exists()?;
        let name = self.parse_ident()?;
        let timing = if self.eat_keyword("BEFORE") {
            "BEFORE".to_string()
        } else if self.eat_keyword("AFTER") {
            "AFTER".to_string()
        } else if self.eat_keyword("INSTEAD") {
            self.expect_keyword("OF")?;
            "INSTEAD OF".to_string()
        } else {
            return Err(self.error_here("expected BEFORE, AFTER or INSTEAD OF"));
        };

        let mut events = Vec::new();
        loop {
            let Some(event) = self.next_word() else {
                return Err(self.error_here("expected trigger event"));
            };
            let mut event = event.to_ascii_uppercase();
            if event == "UPDATE" && self.eat_keyword("OF") {
                let columns = self.parse_bare_ident_list()?;
                event = format!(
                    "UPDATE OF {}",
                    columns
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            events.push(event);
            if !(self.eat_keyword("OR") || self.eat_symbol(",")) {
                break;
            }
        }

        self.expect_keyword("ON")?;
        let table = self.parse_qualified_name()?;
        let mut for_each_row = false;
        if self.eat_keyword("FOR") {
            self.eat_keyword("EACH");
            if self.eat_keyword("ROW") {
                for_each_row = true;
            } else {
                self.expect_keyword("STATEMENT")?;
            }
        }

        let body = self.parse_trigger_body()?;
        Ok(Statement::CreateTrigger(CreateTrigger {
            name,
            table,
            timing,
            events,
            for_each_row,
            body,
        }))
    }

    /// Captures a trigger body verbatim. Compound bodies (`BEGIN ... END`)
    /// contain semicolons, so plain statement splitting does not apply; this
    /// tracks block openers and stops at the END that closes the outermost
    /// one.
    fn parse_trigger_body(&mut self) -> Result<String> {
        let Some(first) = self.peek() else {
            return Err(self.error_here("expected trigger body"));
        };
        let start = first.start;

        let compound = self.tokens[self.pos..]
            .iter()
            .take_while(|token| !token.is_symbol(";"))
            .any(|token| token.is_keyword("BEGIN"));
        if !compound {
            return Ok(self.raw_tail());
        }

        let mut depth = 0usize;
        let mut end = start;
        while let Some(token) = self.next_token() {
            end = token.end;
            if let TokenKind::Word(word) = &token.kind {
                let upper = word.to_ascii_uppercase();
                let opens = matches!(
                    upper.as_str(),
                    "BEGIN" | "CASE" | "IF" | "LOOP" | "WHILE" | "REPEAT"
                ) && !self.check_symbol("(");
                if opens {
                    depth += 1;
                } else if upper == "END" && depth > 0 {
                    // END IF / END LOOP / END WHILE close their opener.
                    for closer in ["IF", "LOOP", "WHILE", "REPEAT", "CASE"] {
                        if self.check_keyword(closer) {
                            if let Some(trailing) = self.next_token() {
                                end = trailing.end;
                            }
                            break;
                        }
                    }
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
            }
        }
        if depth != 0 {
            return Err(self.error_here("unterminated trigger body"));
        }
        Ok(self.source[start..end].trim().to_string())
    }

    fn parse_create_sequence(&mut self) -> Result<Statement> {
        let _ = self.eat_if_not_exists()?;
        let name = self.parse_qualified_name()?;
        let mut sequence = CreateSequence {
            name,
            increment: None,
            min_value: None,
            max_value: None,
            start: None,
            cache: None,
            cycle: false,
        };
        loop {
            if self.eat_keyword("INCREMENT") {
                self.eat_keyword("BY");
                sequence.increment = Some(self.parse_int()?);
            } else if self.eat_keyword("MINVALUE") {
                sequence.min_value = Some(self.parse_int()?);
            } else if self.eat_keyword("MAXVALUE") {
                sequence.max_value = Some(self.parse_int()?);
            } else if self.eat_keyword("START") {
                self.eat_keyword("WITH");
                sequence.start = Some(self.parse_int()?);
            } else if self.eat_keyword("CACHE") {
                sequence.cache = Some(self.parse_int()?);
            } else if self.eat_keyword("CYCLE") {
                sequence.cycle = true;
            } else if self.eat_keyword("NO") {
                // NO MINVALUE / NO MAXVALUE / NO CYCLE
                self.next_token();
            } else if self.eat_keyword("AS") {
                self.next_token();
            } else if self.eat_keyword("OWNED") {
                self.expect_keyword("BY")?;
                self.skip_to_statement_end();
                break;
            } else {
                break;
            }
        }
        Ok(Statement::CreateSequence(sequence))
    }

    fn parse_create_type(&mut self) -> Result<Statement> {
        let name = self.parse_qualified_name()?;
        self.expect_keyword("AS")?;
        if !self.eat_keyword("ENUM") {
            return Err(crate::UnsupportedError::new(
                self.profile.family.name(),
                "CREATE TYPE other than AS ENUM",
            )
            .into());
        }
        self.expect_symbol("(")?;
        let mut values = Vec::new();
        if !self.check_symbol(")") {
            loop {
                let Some(value) = self.next_string() else {
                    return Err(self.error_here("expected enum label"));
                };
                values.push(value);
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }
        self.expect_symbol(")")?;
        Ok(Statement::CreateType(CreateType { name, values }))
    }

    fn parse_create_extension(&mut self) -> Result<Statement> {
        let if_not_exists = self.eat_if_not_exists()?;
        let name = self.parse_ident()?;
        self.skip_to_statement_end();
        Ok(Statement::CreateExtension {
            name,
            if_not_exists,
        })
    }

    fn parse_create_schema(&mut self) -> Result<Statement> {
        let if_not_exists = self.eat_if_not_exists()?;
        let name = self.parse_ident()?;
        self.skip_to_statement_end();
        Ok(Statement::CreateSchema {
            name,
            if_not_exists,
        })
    }

    fn parse_create_policy(&mut self) -> Result<Statement> {
        let name = self.parse_ident()?;
        self.expect_keyword("ON")?;
        let table = self.parse_qualified_name()?;
        let definition = self.raw_tail();
        Ok(Statement::CreatePolicy(CreatePolicy {
            name,
            table,
            definition,
        }))
    }

    fn parse_privilege(&mut self, grant: bool) -> Result<Statement> {
        let boundary = if grant { "TO" } else { "FROM" };
        let mut privileges = Vec::new();
        let mut current = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Err(self.error_here("unterminated privilege list"));
            };
            if token.is_keyword("ON") {
                break;
            }
            if token.is_symbol(",") {
                self.next_token();
                privileges.push(current.join(" "));
                current.clear();
                continue;
            }
            if token.is_symbol("(") {
                // Column lists on privileges are not compared.
                let mut depth = 0usize;
                while let Some(token) = self.next_token() {
                    if token.is_symbol("(") {
                        depth += 1;
                    } else if token.is_symbol(")") {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                continue;
            }
            current.push(token_text(token).to_ascii_uppercase());
            self.next_token();
        }
        if !current.is_empty() {
            privileges.push(current.join(" "));
        }

        self.expect_keyword("ON")?;
        self.eat_keyword("TABLE");
        let object = self.parse_qualified_name()?;
        self.expect_keyword(boundary)?;

        let mut grantees = Vec::new();
        loop {
            grantees.push(self.parse_ident()?);
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.skip_to_statement_end();

        let statement = PrivilegeStatement {
            privileges,
            object,
            grantees,
        };
        Ok(if grant {
            Statement::Grant(statement)
        } else {
            Statement::Revoke(statement)
        })
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        let kind = if self.eat_keyword("TABLE") {
            ObjectKind::Table
        } else if self.eat_keyword("MATERIALIZED") {
            self.expect_keyword("VIEW")?;
            ObjectKind::MaterializedView
        } else if self.eat_keyword("VIEW") {
            ObjectKind::View
        } else if self.eat_keyword("INDEX") {
            ObjectKind::Index
        } else if self.eat_keyword("TRIGGER") {
            ObjectKind::Trigger
        } else if self.eat_keyword("SEQUENCE") {
            ObjectKind::Sequence
        } else if self.eat_keyword("TYPE") {
            ObjectKind::Type
        } else if self.eat_keyword("EXTENSION") {
            ObjectKind::Extension
        } else if self.eat_keyword("SCHEMA") {
            ObjectKind::Schema
        } else if self.eat_keyword("POLICY") {
            ObjectKind::Policy
        } else {
            return Err(self.error_here("unsupported DROP statement"));
        };
        let if_exists = self.eat_if_exists();
        let name = self.parse_qualified_name()?;
        self.skip_to_statement_end();
        Ok(Statement::Drop(DropStatement {
            kind,
            name,
            if_exists,
        }))
    }

    // ---- type names ----

    fn parse_type_name(&mut self) -> Result<TypeName> {
        let Some(first) = self.peek() else {
            return Err(self.error_here("expected type name"));
        };
        let raw_start = first.start;
        let Some(first_word) = self.next_word() else {
            return Err(self.error_here("expected type name"));
        };
        let mut base_words = vec![first_word.to_ascii_lowercase()];

        match base_words[0].as_str() {
            "double" => {
                if self.eat_keyword("PRECISION") {
                    base_words.push("precision".to_string());
                }
            }
            "character" | "char" | "bit" | "national" => {
                if self.eat_keyword("VARYING") {
                    base_words.push("varying".to_string());
                } else if base_words[0] == "national" {
                    if let Some(word) = self.next_word() {
                        base_words.push(word.to_ascii_lowercase());
                        if self.eat_keyword("VARYING") {
                            base_words.push("varying".to_string());
                        }
                    }
                }
            }
            _ => {}
        }

        let mut args = Vec::new();
        if self.eat_symbol("(") {
            let numeric = matches!(
                self.peek().map(|t| &t.kind),
                Some(TokenKind::Number(_))
            );
            if numeric {
                loop {
                    match self.next_token() {
                        Some(Token {
                            kind: TokenKind::Number(number),
                            ..
                        }) => {
                            if let Ok(value) = number.parse() {
                                args.push(value);
                            }
                        }
                        _ => return Err(self.error_here("expected type argument")),
                    }
                    if !self.eat_symbol(",") {
                        break;
                    }
                }
                self.expect_symbol(")")?;
            } else {
                // enum('a','b'), set(...), varchar(max): keep only the raw
                // spelling.
                let mut depth = 1usize;
                while depth > 0 {
                    match self.next_token() {
                        Some(token) if token.is_symbol("(") => depth += 1,
                        Some(token) if token.is_symbol(")") => depth -= 1,
                        Some(_) => {}
                        None => return Err(self.error_here("unterminated type arguments")),
                    }
                }
            }
        }

        let mut unsigned = false;
        if self.profile.unsigned_types {
            if self.eat_keyword("UNSIGNED") {
                unsigned = true;
            }
            self.eat_keyword("ZEROFILL");
        }

        if matches!(base_words[0].as_str(), "timestamp" | "time") {
            if self.eat_keyword("WITH") {
                self.expect_keyword("TIME")?;
                self.expect_keyword("ZONE")?;
                base_words.push("with time zone".to_string());
            } else if self.eat_keyword("WITHOUT") {
                self.expect_keyword("TIME")?;
                self.expect_keyword("ZONE")?;
            }
        }

        let mut array = false;
        if self.profile.family == DialectFamily::Postgres {
            while self.eat_symbol("[") {
                self.expect_symbol("]")?;
                array = true;
            }
        }

        let raw_end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map_or(raw_start, |t| t.end);
        Ok(TypeName {
            raw: self.source[raw_start..raw_end].to_string(),
            base: base_words.join(" "),
            args,
            unsigned,
            array,
        })
    }

    fn parse_int(&mut self) -> Result<i64> {
        let negative = self.eat_symbol("-");
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Number(number),
                ..
            }) => {
                let value: i64 = number
                    .parse()
                    .map_err(|_| self.error_here("integer out of range"))?;
                Ok(if negative { -value } else { value })
            }
            _ => Err(self.error_here("expected integer")),
        }
    }

    // ---- token plumbing ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn next_word(&mut self) -> Option<String> {
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Word(word)) => {
                self.pos += 1;
                Some(word)
            }
            _ => None,
        }
    }

    fn next_string(&mut self) -> Option<String> {
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::StringLit(value)) => {
                self.pos += 1;
                Some(value)
            }
            _ => None,
        }
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {keyword}")))
        }
    }

    fn check_symbol(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected `{symbol}`")))
        }
    }

    fn eat_if_not_exists(&mut self) -> Result<bool> {
        if self.eat_keyword("IF") {
            self.expect_keyword("NOT")?;
            self.expect_keyword("EXISTS")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_if_exists(&mut self) -> bool {
        if self.check_keyword("IF") && self.peek_at(1).is_some_and(|t| t.is_keyword("EXISTS")) {
            self.pos += 2;
            true
        } else {
            false
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) => Ok(Ident::unquoted(word)),
            Some(Token {
                kind: TokenKind::QuotedIdent(word),
                ..
            }) => Ok(Ident::quoted(word)),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error_here("expected identifier"))
            }
        }
    }

    fn parse_qualified_name(&mut self) -> Result<QualifiedName> {
        let first = self.parse_ident()?;
        if self.eat_symbol(".") {
            let name = self.parse_ident()?;
            Ok(QualifiedName {
                schema: Some(first),
                name,
            })
        } else {
            Ok(QualifiedName {
                schema: None,
                name: first,
            })
        }
    }

    fn parse_ident_list(&mut self) -> Result<Vec<Ident>> {
        self.expect_symbol("(")?;
        let idents = self.parse_bare_ident_list()?;
        self.expect_symbol(")")?;
        Ok(idents)
    }

    fn parse_bare_ident_list(&mut self) -> Result<Vec<Ident>> {
        let mut idents = Vec::new();
        loop {
            idents.push(self.parse_ident()?);
            if !self.eat_symbol(",") {
                break;
            }
        }
        Ok(idents)
    }

    /// Consumes tokens up to the statement terminator and returns their
    /// verbatim source text.
    fn raw_tail(&mut self) -> String {
        let Some(first) = self.peek() else {
            return String::new();
        };
        let start = first.start;
        let mut end = start;
        while let Some(token) = self.peek() {
            if token.is_symbol(";") || (self.profile.go_separators && token.is_keyword("GO")) {
                break;
            }
            end = token.end;
            self.pos += 1;
        }
        self.source[start..end].trim().to_string()
    }

    fn skip_to_statement_end(&mut self) {
        while let Some(token) = self.peek() {
            if token.is_symbol(";") || (self.profile.go_separators && token.is_keyword("GO")) {
                break;
            }
            self.pos += 1;
        }
    }

    fn statement_text(&self) -> &str {
        let end = self.source[self.stmt_start..]
            .find(';')
            .map_or(self.source.len(), |idx| self.stmt_start + idx + 1);
        self.source[self.stmt_start..end].trim()
    }

    fn error_here(&self, message: impl Into<String>) -> crate::Error {
        let (line, column) = self
            .peek()
            .or_else(|| self.tokens.last())
            .map_or((1, 1), |t| (t.line, t.column));
        ParseError::syntax(line, column, message, self.statement_text()).into()
    }
}

/// Keywords that terminate a raw-expression fallback inside a column
/// definition.
const COLUMN_OPTION_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "COMMENT",
    "COLLATE",
    "CHARACTER",
    "CHARSET",
    "ON",
    "GENERATED",
    "CONSTRAINT",
    "AFTER",
    "FIRST",
    "IDENTITY",
    "STORED",
    "VIRTUAL",
];

const INDEX_ELEM_BOUNDARY: &[&str] = &[",", ")"];

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Word(word) | TokenKind::QuotedIdent(word) => word.clone(),
        TokenKind::Number(number) => number.clone(),
        TokenKind::StringLit(value) => value.clone(),
        TokenKind::Symbol(symbol) => (*symbol).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(profile: &GrammarProfile, sql: &str) -> Statement {
        let mut statements = parse_sql(sql, profile).expect("should parse");
        assert_eq!(statements.len(), 1, "expected one statement");
        statements.remove(0)
    }

    #[test]
    fn qualified_names_keep_their_quoting() {
        let profile = GrammarProfile::postgres();
        let Statement::CreateTable(create) =
            parse_one(&profile, "CREATE TABLE \"App\".\"Users\" (id bigint);")
        else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.name.schema, Some(Ident::quoted("App")));
        assert_eq!(create.name.name, Ident::quoted("Users"));
    }

    #[test]
    fn create_table_with_constraints() {
        let profile = GrammarProfile::postgres();
        let statement = parse_one(
            &profile,
            "CREATE TABLE public.users (
                id bigint NOT NULL,
                email varchar(255) NOT NULL,
                age integer CHECK (age >= 0),
                CONSTRAINT users_pkey PRIMARY KEY (id),
                UNIQUE (email)
            );",
        );
        let Statement::CreateTable(table) = statement else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(table.name.to_string(), "public.users");
        assert_eq!(table.columns.len(), 3);
        assert!(table.columns[0].not_null);
        assert_eq!(table.columns[1].type_name.args, vec![255]);
        assert_eq!(table.constraints.len(), 3);
        assert!(matches!(
            &table.constraints[0],
            TableConstraint::Check(check) if check.name.is_none()
        ));
    }

    #[test]
    fn mysql_inline_keys_become_index_statements() {
        let profile = GrammarProfile::mysql();
        let statements = parse_sql(
            "CREATE TABLE `posts` (
                `id` bigint unsigned NOT NULL AUTO_INCREMENT,
                `title` varchar(100) DEFAULT NULL,
                PRIMARY KEY (`id`),
                KEY `idx_title` (`title`(20))
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
            &profile,
        )
        .expect("should parse");
        assert_eq!(statements.len(), 2);
        let Statement::CreateIndex(index) = &statements[1] else {
            panic!("expected hoisted index");
        };
        assert_eq!(index.name.as_ref().map(|n| n.value.as_str()), Some("idx_title"));
        assert_eq!(index.columns[0].prefix, Some(20));
        let Statement::CreateTable(table) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        assert!(table.columns[0].type_name.unsigned);
        assert!(table.columns[0].auto_increment);
        assert!(table
            .options
            .iter()
            .any(|option| option.name == "ENGINE" && option.value == Value::String("InnoDB".into())));
    }

    #[test]
    fn alter_table_add_foreign_key() {
        let profile = GrammarProfile::postgres();
        let statement = parse_one(
            &profile,
            "ALTER TABLE orders
                ADD CONSTRAINT orders_user_id_fkey FOREIGN KEY (user_id)
                REFERENCES users (id) ON DELETE CASCADE;",
        );
        let Statement::AlterTable(alter) = statement else {
            panic!("expected ALTER TABLE");
        };
        let [AlterAction::AddConstraint(TableConstraint::ForeignKey(fk))] = &alter.actions[..]
        else {
            panic!("expected ADD CONSTRAINT");
        };
        assert_eq!(fk.name.as_ref().map(|n| n.value.as_str()), Some("orders_user_id_fkey"));
        assert_eq!(fk.reference.on_delete, Some(ReferentialAction::Cascade));
    }

    #[test]
    fn create_view_keeps_query_verbatim() {
        let profile = GrammarProfile::postgres();
        let statement = parse_one(
            &profile,
            "CREATE OR REPLACE VIEW active_users AS SELECT id, email FROM users WHERE active;",
        );
        let Statement::CreateView(view) = statement else {
            panic!("expected CREATE VIEW");
        };
        assert!(view.or_replace);
        assert_eq!(view.query, "SELECT id, email FROM users WHERE active");
    }

    #[test]
    fn sqlite_trigger_body_spans_begin_end() {
        let profile = GrammarProfile::sqlite();
        let statement = parse_one(
            &profile,
            "CREATE TRIGGER touch_updated AFTER UPDATE ON users FOR EACH ROW
             BEGIN
               UPDATE users SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
             END;",
        );
        let Statement::CreateTrigger(trigger) = statement else {
            panic!("expected CREATE TRIGGER");
        };
        assert_eq!(trigger.events, vec!["UPDATE".to_string()]);
        assert!(trigger.body.starts_with("BEGIN"));
        assert!(trigger.body.ends_with("END"));
    }

    #[test]
    fn postgres_schema_objects_parse() {
        let profile = GrammarProfile::postgres();
        let statements = parse_sql(
            "CREATE SCHEMA IF NOT EXISTS app;
             CREATE EXTENSION IF NOT EXISTS pgcrypto;
             CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');
             CREATE SEQUENCE app.order_seq INCREMENT BY 2 START WITH 100;
             CREATE INDEX CONCURRENTLY idx_users_email ON users (lower(email)) WHERE deleted_at IS NULL;",
            &profile,
        )
        .expect("should parse");
        assert_eq!(statements.len(), 5);
        let Statement::CreateType(enum_type) = &statements[2] else {
            panic!("expected CREATE TYPE");
        };
        assert_eq!(enum_type.values, vec!["sad", "ok", "happy"]);
        let Statement::CreateSequence(sequence) = &statements[3] else {
            panic!("expected CREATE SEQUENCE");
        };
        assert_eq!(sequence.increment, Some(2));
        assert_eq!(sequence.start, Some(100));
        let Statement::CreateIndex(index) = &statements[4] else {
            panic!("expected CREATE INDEX");
        };
        assert!(index.concurrently);
        assert!(index.where_clause.is_some());
    }

    #[test]
    fn mysql_create_schema_is_unsupported() {
        let profile = GrammarProfile::mysql();
        let error = parse_sql("CREATE SEQUENCE s;", &profile).expect_err("should fail");
        assert!(matches!(error, crate::Error::Unsupported(_)));
    }

    #[test]
    fn syntax_error_carries_position() {
        let profile = GrammarProfile::postgres();
        let error = parse_sql("CREATE TABLE t (\n  id bigint,,\n);", &profile)
            .expect_err("should fail");
        let message = error.to_string();
        assert!(message.contains("line 2"), "got: {message}");
    }

    #[test]
    fn mssql_go_separators_and_brackets() {
        let profile = GrammarProfile::mssql();
        let statements = parse_sql(
            "CREATE TABLE [dbo].[jobs] (\n  [id] int IDENTITY(1,1) NOT NULL,\n  [state] nvarchar(32) NOT NULL\n)\nGO\nCREATE NONCLUSTERED INDEX ix_jobs_state ON dbo.jobs ([state])\nGO",
            &profile,
        )
        .expect("should parse");
        assert_eq!(statements.len(), 2);
        let Statement::CreateTable(table) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        assert!(table.columns[0].auto_increment);
        let Statement::CreateIndex(index) = &statements[1] else {
            panic!("expected CREATE INDEX");
        };
        assert_eq!(index.method.as_deref(), Some("nonclustered"));
    }
}
