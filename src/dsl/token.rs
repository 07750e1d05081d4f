//! Token types for the wavescript lexer.

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. String tokens hold their unquoted content.
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Structural
    LBrace,
    RBrace,
    Comma,
    Dot,
    Slash,
    Semicolon,

    // Keywords
    Imp,
    As,
    Play,
    Set,
    Cpm,
    Loop,
    Sample,
    Volume,
    Pitch,
    Pattern,

    // Literals
    Identifier,
    String,
    Number,

    Eof,
}

impl TokenKind {
    /// Map a bare word onto its keyword, if it is one.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "imp" => TokenKind::Imp,
            "as" => TokenKind::As,
            "play" => TokenKind::Play,
            "set" => TokenKind::Set,
            "cpm" => TokenKind::Cpm,
            "loop" => TokenKind::Loop,
            "sample" => TokenKind::Sample,
            "volume" => TokenKind::Volume,
            "pitch" => TokenKind::Pitch,
            "pattern" => TokenKind::Pattern,
            _ => return None,
        };
        Some(kind)
    }

    /// Keywords that may also be used as a parameter or action name.
    pub fn is_entry_name(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Sample
                | TokenKind::Volume
                | TokenKind::Pitch
                | TokenKind::Pattern
                | TokenKind::Play
        )
    }
}
