use crate::{ParseError, Result};

use super::GrammarProfile;

/// A lexed token with its 1-based source position and byte span, so the
/// parser can report positions and recover raw text slices.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Unquoted word: identifier or keyword, original case preserved.
    Word(String),
    /// Quoted identifier, quotes stripped and escapes resolved.
    QuotedIdent(String),
    Number(String),
    StringLit(String),
    Symbol(&'static str),
}

impl Token {
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    #[must_use]
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(&self.kind, TokenKind::Symbol(value) if *value == symbol)
    }
}

const SYMBOLS: &[&str] = &[
    "::", "||", "<=", ">=", "<>", "!=", "(", ")", ",", ";", ".", "=", "<", ">", "+", "-", "*", "/",
    "%", "[", "]", "@",
];

pub(crate) struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    profile: &'a GrammarProfile,
    /// Non-zero while inside a MySQL `/*!NNNNN ... */` comment whose content
    /// is live SQL.
    version_comment_depth: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(source: &'a str, profile: &'a GrammarProfile) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            profile,
            version_comment_depth: 0,
        }
    }

    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            self.skip_whitespace();
            if self.skip_comment()? {
                continue;
            }
            break;
        }

        let Some(byte) = self.peek() else {
            return Ok(None);
        };
        let (line, column, start) = (self.line, self.column, self.pos);

        if self.version_comment_depth > 0 && byte == b'*' && self.peek_at(1) == Some(b'/') {
            self.advance_n(2);
            self.version_comment_depth -= 1;
            return self.next_token();
        }

        let kind = match byte {
            b'\'' => self.lex_string(line, column)?,
            b'"' if self.profile.double_quote_is_string => self.lex_string(line, column)?,
            b'"' => self.lex_quoted_ident(b'"', line, column)?,
            b'`' if self.profile.backtick_idents => self.lex_quoted_ident(b'`', line, column)?,
            b'[' if self.profile.bracket_idents => self.lex_bracket_ident(line, column)?,
            b'$' if self.profile.dollar_strings && self.at_dollar_quote() => {
                self.lex_dollar_string(line, column)?
            }
            _ if byte.is_ascii_digit() => self.lex_number(),
            _ if is_word_start(byte) => self.lex_word(),
            _ => self.lex_symbol(line, column)?,
        };

        Ok(Some(Token {
            kind,
            line,
            column,
            start,
            end: self.pos,
        }))
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) -> Result<bool> {
        let Some(byte) = self.peek() else {
            return Ok(false);
        };

        if byte == b'-' && self.peek_at(1) == Some(b'-') {
            self.skip_line();
            return Ok(true);
        }
        if byte == b'#' && self.profile.hash_comments {
            self.skip_line();
            return Ok(true);
        }
        if byte == b'/' && self.peek_at(1) == Some(b'*') {
            if self.profile.version_comments && self.peek_at(2) == Some(b'!') {
                // /*!40101 ... */ keeps its content as live SQL.
                self.advance_n(3);
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.advance();
                }
                self.version_comment_depth += 1;
                return Ok(true);
            }
            let (line, column) = (self.line, self.column);
            self.advance_n(2);
            loop {
                match self.peek() {
                    Some(b'*') if self.peek_at(1) == Some(b'/') => {
                        self.advance_n(2);
                        break;
                    }
                    Some(_) => self.advance(),
                    None => {
                        return Err(ParseError::syntax(
                            line,
                            column,
                            "unterminated block comment",
                            self.context_slice(self.pos),
                        )
                        .into());
                    }
                }
            }
            return Ok(true);
        }

        Ok(false)
    }

    fn skip_line(&mut self) {
        while let Some(byte) = self.peek() {
            self.advance();
            if byte == b'\n' {
                break;
            }
        }
    }

    fn lex_string(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let quote = self.peek().unwrap_or(b'\'');
        self.advance();
        let mut value = String::new();

        loop {
            match self.peek() {
                Some(b'\\') if self.profile.backslash_escapes => {
                    self.advance();
                    if let Some(escaped) = self.peek() {
                        value.push(escaped as char);
                        self.advance();
                    }
                }
                Some(byte) if byte == quote => {
                    if self.peek_at(1) == Some(quote) {
                        value.push(quote as char);
                        self.advance_n(2);
                    } else {
                        self.advance();
                        return Ok(TokenKind::StringLit(value));
                    }
                }
                Some(byte) => {
                    let ch_start = self.pos;
                    self.advance_char();
                    value.push_str(&self.source[ch_start..self.pos]);
                    let _ = byte;
                }
                None => {
                    return Err(ParseError::syntax(
                        line,
                        column,
                        "unterminated string literal",
                        self.context_slice(self.pos),
                    )
                    .into());
                }
            }
        }
    }

    fn lex_quoted_ident(&mut self, quote: u8, line: usize, column: usize) -> Result<TokenKind> {
        self.advance();
        let mut value = String::new();

        loop {
            match self.peek() {
                Some(byte) if byte == quote => {
                    if self.peek_at(1) == Some(quote) {
                        value.push(quote as char);
                        self.advance_n(2);
                    } else {
                        self.advance();
                        return Ok(TokenKind::QuotedIdent(value));
                    }
                }
                Some(_) => {
                    let ch_start = self.pos;
                    self.advance_char();
                    value.push_str(&self.source[ch_start..self.pos]);
                }
                None => {
                    return Err(ParseError::syntax(
                        line,
                        column,
                        "unterminated quoted identifier",
                        self.context_slice(self.pos),
                    )
                    .into());
                }
            }
        }
    }

    fn lex_bracket_ident(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        self.advance();
        let mut value = String::new();

        loop {
            match self.peek() {
                Some(b']') => {
                    if self.peek_at(1) == Some(b']') {
                        value.push(']');
                        self.advance_n(2);
                    } else {
                        self.advance();
                        return Ok(TokenKind::QuotedIdent(value));
                    }
                }
                Some(_) => {
                    let ch_start = self.pos;
                    self.advance_char();
                    value.push_str(&self.source[ch_start..self.pos]);
                }
                None => {
                    return Err(ParseError::syntax(
                        line,
                        column,
                        "unterminated bracketed identifier",
                        self.context_slice(self.pos),
                    )
                    .into());
                }
            }
        }
    }

    fn at_dollar_quote(&self) -> bool {
        let rest = &self.source[self.pos..];
        let Some(rest) = rest.strip_prefix('$') else {
            return false;
        };
        let tag_len = rest
            .bytes()
            .take_while(|b| is_dollar_tag_byte(*b))
            .count();
        rest.as_bytes().get(tag_len) == Some(&b'$')
    }

    fn lex_dollar_string(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let tag_start = self.pos;
        self.advance();
        while self.peek().is_some_and(is_dollar_tag_byte) {
            self.advance();
        }
        self.advance();
        let tag = &self.source[tag_start..self.pos];

        let body_start = self.pos;
        loop {
            if self.pos >= self.bytes.len() {
                return Err(ParseError::syntax(
                    line,
                    column,
                    "unterminated dollar-quoted string",
                    self.context_slice(body_start),
                )
                .into());
            }
            if self.source[self.pos..].starts_with(tag) {
                let value = self.source[body_start..self.pos].to_string();
                self.advance_n(tag.len());
                return Ok(TokenKind::StringLit(value));
            }
            self.advance_char();
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E'))
            && (self.peek_at(1).is_some_and(|b| b.is_ascii_digit())
                || (matches!(self.peek_at(1), Some(b'+' | b'-'))
                    && self.peek_at(2).is_some_and(|b| b.is_ascii_digit())))
        {
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.advance();
            }
        }
        TokenKind::Number(self.source[start..self.pos].to_string())
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_word_continue) {
            self.advance();
        }
        TokenKind::Word(self.source[start..self.pos].to_string())
    }

    fn lex_symbol(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let rest = &self.source[self.pos..];
        for symbol in SYMBOLS {
            if rest.starts_with(symbol) {
                self.advance_n(symbol.len());
                return Ok(TokenKind::Symbol(symbol));
            }
        }
        Err(ParseError::syntax(
            line,
            column,
            format!(
                "unexpected character `{}`",
                rest.chars().next().unwrap_or('\0')
            ),
            self.context_slice(self.pos),
        )
        .into())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(byte) = self.peek() {
            self.pos += 1;
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    /// Advances past one UTF-8 character (multi-byte safe).
    fn advance_char(&mut self) {
        let Some(ch) = self.source[self.pos..].chars().next() else {
            return;
        };
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
    }

    fn advance_n(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn context_slice(&self, around: usize) -> &str {
        let start = self.source[..around.min(self.source.len())]
            .rfind('\n')
            .map_or(0, |idx| idx + 1);
        let end = self.source[start..]
            .find('\n')
            .map_or(self.source.len(), |idx| start + idx);
        &self.source[start..end]
    }
}

fn is_word_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_word_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

// Dollar-quote tags cannot contain `$`; the word alphabet would swallow the
// closing delimiter.
fn is_dollar_tag_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GrammarProfile;

    fn lex(profile: &GrammarProfile, sql: &str) -> Vec<TokenKind> {
        Lexer::new(sql, profile)
            .tokenize()
            .expect("lexing should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn words_symbols_and_positions() {
        let profile = GrammarProfile::postgres();
        let tokens = Lexer::new("CREATE TABLE t (\n  id bigint\n);", &profile)
            .tokenize()
            .expect("lexing should succeed");
        assert!(tokens[0].is_keyword("create"));
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        let id = tokens
            .iter()
            .find(|token| token.is_keyword("id"))
            .expect("id token");
        assert_eq!(id.line, 2);
        assert_eq!(id.column, 3);
    }

    #[test]
    fn mysql_backticks_and_hash_comments() {
        let profile = GrammarProfile::mysql();
        let tokens = lex(&profile, "# comment\n`my table` 'it''s'");
        assert_eq!(
            tokens,
            vec![
                TokenKind::QuotedIdent("my table".to_string()),
                TokenKind::StringLit("it's".to_string()),
            ]
        );
    }

    #[test]
    fn mysql_version_comment_content_is_live() {
        let profile = GrammarProfile::mysql();
        let tokens = lex(&profile, "/*!40101 SET NAMES utf8 */;");
        assert_eq!(tokens.len(), 4);
        assert!(matches!(&tokens[0], TokenKind::Word(w) if w == "SET"));
        assert_eq!(tokens[3], TokenKind::Symbol(";"));
    }

    #[test]
    fn dollar_quoted_string_is_one_literal() {
        let profile = GrammarProfile::postgres();
        let tokens = lex(&profile, "$fn$ BEGIN RETURN 1; END $fn$");
        assert_eq!(
            tokens,
            vec![TokenKind::StringLit(" BEGIN RETURN 1; END ".to_string())]
        );
        assert_eq!(
            lex(&profile, "$$now()$$"),
            vec![TokenKind::StringLit("now()".to_string())]
        );
    }

    #[test]
    fn mssql_bracket_identifiers() {
        let profile = GrammarProfile::mssql();
        let tokens = lex(&profile, "[order details]");
        assert_eq!(
            tokens,
            vec![TokenKind::QuotedIdent("order details".to_string())]
        );
    }

    #[test]
    fn unterminated_string_reports_position() {
        let profile = GrammarProfile::postgres();
        let error = Lexer::new("SELECT 'oops", &profile)
            .tokenize()
            .expect_err("should fail");
        assert!(error.to_string().contains("unterminated string"));
    }
}
