//! Token-based parsing of `CREATE PROCEDURE` / `CREATE FUNCTION` header lines
//!
//! Definition boundaries are the only place the converter needs real
//! tokenization: bracketed identifiers (`[dbo].[PostLogEntry]`) must yield
//! the bare object name. Everything else in the file is handled line by line.
//!
//! Supported shapes:
//!
//! ```sql
//! CREATE PROCEDURE [dbo].[PostLogEntry]
//! CREATE PROCEDURE dbo.PostLogEntry
//! CREATE PROC PostLogEntry
//! CREATE FUNCTION [dbo].[udfCombinePaths]
//! ```

use sqlparser::dialect::MsSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer};

/// Parsed definition boundary line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLine {
    /// Unqualified object name (schema stripped)
    pub object_name: String,
    pub is_function: bool,
}

struct TokenCursor {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
}

impl TokenCursor {
    fn new(sql: &str) -> Option<Self> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .ok()?;
        Some(Self { tokens, pos: 0 })
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(Token::Whitespace(_))) {
            self.advance();
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.current(), Some(Token::Word(w)) if w.keyword == keyword)
    }

    fn check_word_ci(&self, word: &str) -> bool {
        matches!(self.current(), Some(Token::Word(w)) if w.value.eq_ignore_ascii_case(word))
    }

    /// Consume an identifier token (bracket quoting already stripped by the
    /// tokenizer) and return its value.
    fn parse_identifier(&mut self) -> Option<String> {
        match self.current() {
            Some(Token::Word(w)) => {
                let value = w.value.clone();
                self.advance();
                Some(value)
            }
            _ => None,
        }
    }
}

/// Parse a definition boundary line, returning the unqualified object name.
///
/// Returns `None` when the line does not tokenize into one of the supported
/// shapes; the caller falls back to taking the remainder of the line after
/// the creation keywords.
pub fn parse_create_line(line: &str) -> Option<CreateLine> {
    let mut cursor = TokenCursor::new(line)?;
    cursor.skip_whitespace();

    if !cursor.check_keyword(Keyword::CREATE) {
        return None;
    }
    cursor.advance();
    cursor.skip_whitespace();

    let is_function = if cursor.check_keyword(Keyword::PROCEDURE) || cursor.check_word_ci("PROC") {
        false
    } else if cursor.check_keyword(Keyword::FUNCTION) {
        true
    } else {
        return None;
    };
    cursor.advance();
    cursor.skip_whitespace();

    // Schema-qualified name: take the object part of schema.object
    let first = cursor.parse_identifier()?;
    cursor.skip_whitespace();

    let object_name = if matches!(cursor.current(), Some(Token::Period)) {
        cursor.advance();
        cursor.skip_whitespace();
        cursor.parse_identifier().unwrap_or(first)
    } else {
        first
    };

    Some(CreateLine {
        object_name,
        is_function,
    })
}
