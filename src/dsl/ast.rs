//! Statement tree for wavescript.
//!
//! A script is a flat list of [`Stmt`]s; there is no nesting beyond the
//! entry lists inside `imp`, `set` and `loop` blocks.

use std::fmt;

/// One top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Import(ImportStmt),
    Play(PlayStmt),
    Set(SetStmt),
    Tempo(TempoStmt),
    Loop(LoopStmt),
    /// A statement that failed to parse. Executing it does nothing.
    NoOp { line: usize },
}

/// `imp { kick as k, snare as s }`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub entries: Vec<ImportEntry>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub module: String,
    pub alias: String,
    pub line: usize,
}

/// `play k`
#[derive(Debug, Clone, PartialEq)]
pub struct PlayStmt {
    pub alias: String,
    pub line: usize,
}

/// `set k { volume 0.8; pitch 1.2; }`
#[derive(Debug, Clone, PartialEq)]
pub struct SetStmt {
    pub alias: String,
    pub params: Vec<Param>,
    pub line: usize,
}

/// A `name value;` entry inside a `set` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Value,
    pub line: usize,
}

/// `cpm 120;`
#[derive(Debug, Clone, PartialEq)]
pub struct TempoStmt {
    pub beats_per_minute: u32,
    pub line: usize,
}

/// `loop { play k; wait "1/2"; }`
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStmt {
    pub actions: Vec<LoopAction>,
    pub line: usize,
}

/// A `name value;` entry inside a `loop` block.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopAction {
    pub name: String,
    pub value: Value,
    pub line: usize,
}

/// The value half of a block entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Ident(String),
    Str(String),
    /// Numeric lexeme, possibly an unquoted fraction such as `1/2`.
    Number(String),
}

impl Value {
    /// Raw text handed to parameter and action handlers.
    pub fn text(&self) -> &str {
        match self {
            Value::Ident(s) | Value::Str(s) | Value::Number(s) => s,
        }
    }
}

impl Stmt {
    /// Source line the statement started on.
    pub fn line(&self) -> usize {
        match self {
            Stmt::Import(s) => s.line,
            Stmt::Play(s) => s.line,
            Stmt::Set(s) => s.line,
            Stmt::Tempo(s) => s.line,
            Stmt::Loop(s) => s.line,
            Stmt::NoOp { line } => *line,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Stmt::NoOp { .. })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ident(s) | Value::Number(s) => f.write_str(s),
            Value::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Writes the statement back out as script text.
impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Import(stmt) => {
                f.write_str("imp {")?;
                for (i, entry) in stmt.entries.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(
                        f,
                        "{sep}{} as {}",
                        quote_name(&entry.module),
                        quote_name(&entry.alias)
                    )?;
                }
                f.write_str(" }")
            }
            Stmt::Play(stmt) => write!(f, "play {}", quote_name(&stmt.alias)),
            Stmt::Set(stmt) => {
                write!(f, "set {} {{", quote_name(&stmt.alias))?;
                for p in &stmt.params {
                    write!(f, " {} {};", p.name, p.value)?;
                }
                f.write_str(" }")
            }
            Stmt::Tempo(stmt) => write!(f, "cpm {};", stmt.beats_per_minute),
            Stmt::Loop(stmt) => {
                f.write_str("loop {")?;
                for a in &stmt.actions {
                    write!(f, " {} {};", a.name, a.value)?;
                }
                f.write_str(" }")
            }
            Stmt::NoOp { .. } => Ok(()),
        }
    }
}

/// Names that would not lex back as a single identifier are written quoted.
fn quote_name(name: &str) -> String {
    let mut chars = name.chars();
    let bare = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && super::token::TokenKind::keyword(name).is_none();
    if bare {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}
