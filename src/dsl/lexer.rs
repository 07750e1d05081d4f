//! Lexer for wavescript.
//!
//! Single left-to-right scan over the source. Problems are collected as
//! diagnostics and scanning always continues; the returned stream always
//! ends with exactly one [`TokenKind::Eof`].

use super::error::Diagnostic;
use super::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            let ch = self.advance();
            let token = match ch {
                '\n' => {
                    self.line += 1;
                    None
                }
                ' ' | '\t' | '\r' => None,
                '{' => Some(self.single(TokenKind::LBrace, ch)),
                '}' => Some(self.single(TokenKind::RBrace, ch)),
                ',' => Some(self.single(TokenKind::Comma, ch)),
                '.' => Some(self.single(TokenKind::Dot, ch)),
                ';' => Some(self.single(TokenKind::Semicolon, ch)),
                '/' if self.peek() == Some('/') => {
                    self.skip_line_comment();
                    None
                }
                '/' => Some(self.single(TokenKind::Slash, ch)),
                '"' => self.lex_string(),
                c if c.is_ascii_digit() => Some(self.lex_number(c)),
                c if c.is_ascii_alphabetic() => Some(self.lex_word(c)),
                other => {
                    self.diagnostics.push(Diagnostic::lexical(
                        format!("unexpected character '{other}'"),
                        self.line,
                    ));
                    None
                }
            };
            if let Some(token) = token {
                tokens.push(token);
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line));
        tokens
    }

    /// Diagnostics gathered by the last [`tokenize`](Self::tokenize) call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        ch
    }

    fn single(&self, kind: TokenKind, ch: char) -> Token {
        Token::new(kind, ch.to_string(), self.line)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn lex_string(&mut self) -> Option<Token> {
        let line = self.line;
        let mut s = String::new();
        loop {
            match self.peek() {
                None => {
                    self.diagnostics
                        .push(Diagnostic::lexical("unterminated string", line));
                    return None;
                }
                Some('"') => {
                    self.advance();
                    return Some(Token::new(TokenKind::String, s, line));
                }
                Some(ch) => {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    s.push(self.advance());
                }
            }
        }
    }

    fn lex_number(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            s.push(ch);
            self.advance();
        }

        // A dot only belongs to the number when a digit follows it.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            s.push(self.advance());
            while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
                s.push(ch);
                self.advance();
            }
        }

        Token::new(TokenKind::Number, s, self.line)
    }

    fn lex_word(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        while let Some(ch) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            s.push(ch);
            self.advance();
        }
        let kind = TokenKind::keyword(&s).unwrap_or(TokenKind::Identifier);
        Token::new(kind, s, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::error::DiagnosticKind;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_empty_input() {
        let tokens = Lexer::new("").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn lex_keywords() {
        assert_eq!(
            kinds("imp as play set cpm loop sample volume pitch pattern"),
            vec![
                TokenKind::Imp,
                TokenKind::As,
                TokenKind::Play,
                TokenKind::Set,
                TokenKind::Cpm,
                TokenKind::Loop,
                TokenKind::Sample,
                TokenKind::Volume,
                TokenKind::Pitch,
                TokenKind::Pattern,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_identifier() {
        let tokens = Lexer::new("player imports").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "player");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn lex_structural() {
        assert_eq!(
            kinds("{ } , . / ;"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Slash,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_integer_and_decimal() {
        let tokens = Lexer::new("120 0.75").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "120");
        assert_eq!(tokens[1].lexeme, "0.75");
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let tokens = Lexer::new("3.").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "3");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn unquoted_fraction_lexes_as_three_tokens() {
        assert_eq!(
            kinds("1/2"),
            vec![
                TokenKind::Number,
                TokenKind::Slash,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lex_string_literal_strips_quotes() {
        let tokens = Lexer::new(r#""1/2""#).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "1/2");
    }

    #[test]
    fn string_has_no_escape_processing() {
        let tokens = Lexer::new(r#""a\n""#).tokenize();
        assert_eq!(tokens[0].lexeme, "a\\n");
    }

    #[test]
    fn unterminated_string_is_dropped_and_reported() {
        let mut lexer = Lexer::new("play \"kick");
        let tokens = lexer.tokenize();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Play);
        assert_eq!(tokens[1].kind, TokenKind::Eof);

        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Lexical);
    }

    #[test]
    fn line_comment_produces_no_token() {
        assert_eq!(
            kinds("cpm 120; // tempo\nplay kick"),
            vec![
                TokenKind::Cpm,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Play,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_at_end_of_input() {
        assert_eq!(kinds("play // trailing"), vec![TokenKind::Play, TokenKind::Eof]);
    }

    #[test]
    fn unexpected_character_is_skipped() {
        let mut lexer = Lexer::new("play @kick");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Play);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "kick");

        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains('@'));
    }

    #[test]
    fn line_tracking() {
        let tokens = Lexer::new("cpm 120;\n\nplay kick").tokenize();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].line, 3);
        assert_eq!(tokens[4].line, 3);
    }

    #[test]
    fn multiline_string_advances_line() {
        let tokens = Lexer::new("\"a\nb\" play").tokenize();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn identifier_with_underscore_and_digits() {
        let tokens = Lexer::new("kick_01").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "kick_01");
    }

    #[test]
    fn non_ascii_letters_are_not_identifier_chars() {
        let mut lexer = Lexer::new("kïck");
        let tokens = lexer.tokenize();
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(&lexemes[..2], ["k", "ck"]);

        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Lexical);
    }
}
