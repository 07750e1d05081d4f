//! Diagnostics reported while lexing, parsing and running a script.
//!
//! Nothing in wavescript aborts on a bad line. Every problem becomes a
//! [`Diagnostic`] that is collected for the caller and logged through
//! `tracing`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A single reported problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Unterminated string or unrecognized character.
    Lexical,
    /// Missing token or delimiter.
    Syntax,
    /// Import target file missing.
    Resolution,
    /// Unknown alias, parameter or action.
    Runtime,
    /// Invalid tempo, duration or parameter value.
    Config,
}

impl Diagnostic {
    pub fn lexical(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Lexical, message, line)
    }

    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Syntax, message, line)
    }

    pub fn resolution(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Resolution, message, line)
    }

    pub fn runtime(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Runtime, message, line)
    }

    pub fn config(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Config, message, line)
    }

    fn new(kind: DiagnosticKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] {:?}: {}", self.line, self.kind, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Thread-safe diagnostic sink shared by the interpreter and scheduled tasks.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    /// Record a diagnostic unless an identical one was already recorded.
    ///
    /// Returns whether it was recorded. Used for problems that can recur on
    /// every loop iteration.
    pub fn report_once(&self, diagnostic: Diagnostic) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains(&diagnostic) {
            return false;
        }
        tracing::warn!("{diagnostic}");
        entries.push(diagnostic);
        true
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for d in diagnostics {
            self.report(d);
        }
    }

    /// Copy of everything reported so far, in report order.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
