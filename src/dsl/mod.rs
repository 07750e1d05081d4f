//! Script front end — source text → tokens → statements.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use error::{Diagnostic, DiagnosticKind, Diagnostics};

use lexer::Lexer;
use parser::Parser;

/// Statements parsed from one script, plus everything reported on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScript {
    pub statements: Vec<Stmt>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The script front end.
pub struct Script;

impl Script {
    /// Lex and parse `source`. Never fails; problems end up in
    /// [`ParsedScript::diagnostics`].
    pub fn parse(source: &str) -> ParsedScript {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        let mut diagnostics = lexer.take_diagnostics();

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        diagnostics.extend(parser.take_diagnostics());

        tracing::debug!(
            statements = statements.len(),
            diagnostics = diagnostics.len(),
            "parsed script"
        );

        ParsedScript {
            statements,
            diagnostics,
        }
    }
}
