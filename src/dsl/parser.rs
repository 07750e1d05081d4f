//! Recursive-descent parser for wavescript.
//!
//! One token of lookahead. Errors never abort the parse: a broken block
//! entry is skipped with [`Parser::synchronize`], a broken statement becomes
//! [`Stmt::NoOp`], and a stray top-level token is reported and stepped over.

use super::ast::*;
use super::error::Diagnostic;
use super::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenKind::Eof, "", line));
        }
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        loop {
            while self.match_kind(TokenKind::Semicolon) {}
            if self.is_at_end() {
                break;
            }

            let kind = self.peek().kind;
            let stmt = match kind {
                TokenKind::Imp => self.parse_import(),
                TokenKind::Play => self.parse_play(),
                TokenKind::Set => self.parse_set(),
                TokenKind::Cpm => self.parse_tempo(),
                TokenKind::Loop => self.parse_loop(),
                _ => {
                    let t = self.advance();
                    let d = Diagnostic::syntax(
                        format!("unexpected token '{}'", t.lexeme),
                        t.line,
                    );
                    self.diagnostics.push(d);
                    continue;
                }
            };
            statements.push(stmt);
        }

        statements
    }

    /// Diagnostics gathered by the last [`parse`](Self::parse) call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn parse_import(&mut self) -> Stmt {
        let line = self.advance().line;
        if !self.match_kind(TokenKind::LBrace) {
            self.error_here("expected '{' after 'imp'");
            return Stmt::NoOp { line };
        }

        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.import_entry() {
                Ok(entry) => entries.push(entry),
                Err(d) => {
                    self.diagnostics.push(d);
                    self.synchronize(TokenKind::Comma);
                    continue;
                }
            }
            if self.match_kind(TokenKind::Comma) {
                continue;
            }
            if !self.check(TokenKind::RBrace) && !self.is_at_end() {
                self.error_here("expected ',' or '}' in import list");
                self.synchronize(TokenKind::Comma);
            }
        }

        self.close_block("import list");
        Stmt::Import(ImportStmt { entries, line })
    }

    fn import_entry(&mut self) -> Result<ImportEntry, Diagnostic> {
        let line = self.peek().line;
        let module = self.expect_name("module name")?;
        if !self.match_kind(TokenKind::As) {
            return Err(self.diagnostic_here("expected 'as' after module name"));
        }
        let alias = self.expect_name("alias after 'as'")?;
        Ok(ImportEntry {
            module,
            alias,
            line,
        })
    }

    fn parse_play(&mut self) -> Stmt {
        let line = self.advance().line;
        match self.expect_name("alias after 'play'") {
            Ok(alias) => Stmt::Play(PlayStmt { alias, line }),
            Err(d) => {
                self.diagnostics.push(d);
                Stmt::NoOp { line }
            }
        }
    }

    fn parse_set(&mut self) -> Stmt {
        let line = self.advance().line;
        let alias = match self.expect_name("alias after 'set'") {
            Ok(alias) => alias,
            Err(d) => {
                self.diagnostics.push(d);
                return Stmt::NoOp { line };
            }
        };
        if !self.match_kind(TokenKind::LBrace) {
            self.error_here("expected '{' after set alias");
            return Stmt::NoOp { line };
        }

        let params = self
            .block_entries("set block")
            .into_iter()
            .map(|(name, value, line)| Param { name, value, line })
            .collect();
        Stmt::Set(SetStmt {
            alias,
            params,
            line,
        })
    }

    fn parse_tempo(&mut self) -> Stmt {
        let line = self.advance().line;
        if !self.check(TokenKind::Number) {
            self.error_here("expected number after 'cpm'");
            return Stmt::NoOp { line };
        }
        let literal = self.advance().lexeme;
        self.match_kind(TokenKind::Semicolon);

        match literal.parse::<u32>() {
            Ok(beats_per_minute) => Stmt::Tempo(TempoStmt {
                beats_per_minute,
                line,
            }),
            Err(_) => {
                self.diagnostics.push(Diagnostic::config(
                    format!("invalid tempo '{literal}', expected a whole number"),
                    line,
                ));
                Stmt::NoOp { line }
            }
        }
    }

    fn parse_loop(&mut self) -> Stmt {
        let line = self.advance().line;
        if !self.match_kind(TokenKind::LBrace) {
            self.error_here("expected '{' after 'loop'");
            return Stmt::NoOp { line };
        }

        let actions = self
            .block_entries("loop block")
            .into_iter()
            .map(|(name, value, line)| LoopAction { name, value, line })
            .collect();
        Stmt::Loop(LoopStmt { actions, line })
    }

    /// Parse `(name value ';')* '}'`, recovering from each bad entry.
    fn block_entries(&mut self, what: &str) -> Vec<(String, Value, usize)> {
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.block_entry() {
                Ok(entry) => entries.push(entry),
                Err(d) => {
                    self.diagnostics.push(d);
                    self.synchronize(TokenKind::Semicolon);
                }
            }
        }
        self.close_block(what);
        entries
    }

    fn block_entry(&mut self) -> Result<(String, Value, usize), Diagnostic> {
        let t = self.peek();
        if !t.kind.is_entry_name() {
            return Err(Diagnostic::syntax(
                format!("expected entry name, got '{}'", t.lexeme),
                t.line,
            ));
        }
        let name_token = self.advance();
        let value = self.parse_value()?;
        if !self.match_kind(TokenKind::Semicolon) {
            return Err(self.diagnostic_here(&format!(
                "expected ';' after '{}' entry",
                name_token.lexeme
            )));
        }
        Ok((name_token.lexeme, value, name_token.line))
    }

    fn parse_value(&mut self) -> Result<Value, Diagnostic> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::String => Ok(Value::Str(self.advance().lexeme)),
            TokenKind::Identifier => Ok(Value::Ident(self.advance().lexeme)),
            TokenKind::Number => {
                let numerator = self.advance().lexeme;
                if !self.match_kind(TokenKind::Slash) {
                    return Ok(Value::Number(numerator));
                }
                if !self.check(TokenKind::Number) {
                    return Err(self.diagnostic_here("expected denominator after '/'"));
                }
                let denominator = self.advance().lexeme;
                Ok(Value::Number(format!("{numerator}/{denominator}")))
            }
            _ => Err(self.diagnostic_here("expected value")),
        }
    }

    /// Skip to the next entry: stop after consuming `separator`, or in
    /// front of a closing brace.
    fn synchronize(&mut self, separator: TokenKind) {
        while !self.is_at_end() {
            if self.check(TokenKind::RBrace) {
                return;
            }
            if self.advance().kind == separator {
                return;
            }
        }
    }

    fn close_block(&mut self, what: &str) {
        if !self.match_kind(TokenKind::RBrace) {
            self.error_here(&format!("expected '}}' to close {what}"));
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        t
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) && !self.is_at_end() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Accept an identifier or string as a module name or alias.
    fn expect_name(&mut self, what: &str) -> Result<String, Diagnostic> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::Identifier | TokenKind::String => Ok(self.advance().lexeme),
            _ => Err(self.diagnostic_here(&format!("expected {what}"))),
        }
    }

    fn diagnostic_here(&self, message: &str) -> Diagnostic {
        let t = self.peek();
        let found = if t.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            format!("'{}'", t.lexeme)
        };
        Diagnostic::syntax(format!("{message}, got {found}"), t.line)
    }

    fn error_here(&mut self, message: &str) {
        let d = self.diagnostic_here(message);
        self.diagnostics.push(d);
    }
}
