//! Statement interpreter.
//!
//! Executes statements strictly in order. Nothing here aborts the run: bad
//! entries are reported to [`Diagnostics`] and skipped. A `loop` statement
//! holds the interpreter until the cancellation token fires, after which no
//! further statement runs.

use std::sync::Arc;

use crate::audio::AudioBackend;
use crate::config::Config;
use crate::dsl::ast::{ImportStmt, LoopAction, LoopStmt, PlayStmt, SetStmt, Stmt, TempoStmt, Value};
use crate::dsl::error::{Diagnostic, Diagnostics};
use crate::dsl::Script;

use super::alias::{AliasTable, ImportRecord, SampleResolver};
use super::cancel::CancellationToken;
use super::handlers::{ActionRegistry, ParamRegistry, PLAY_ACTION};
use super::scheduler::{LoopEnv, LoopScheduler, ScheduleError};
use super::session::SessionHandle;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every statement ran.
    Completed,
    /// The cancellation token fired; remaining statements were skipped.
    Cancelled,
}

pub struct Interpreter {
    resolver: SampleResolver,
    aliases: Arc<AliasTable>,
    session: SessionHandle,
    params: ParamRegistry,
    scheduler: LoopScheduler,
    audio: Arc<dyn AudioBackend>,
    cancel: CancellationToken,
    diagnostics: Diagnostics,
}

impl Interpreter {
    pub fn new(config: &Config, audio: Arc<dyn AudioBackend>, cancel: CancellationToken) -> Self {
        let diagnostics = Diagnostics::new();
        let scheduler = LoopScheduler::new(
            ActionRegistry::with_defaults(),
            config.spacing,
            cancel.clone(),
            diagnostics.clone(),
        )
        .with_grace(config.shutdown_grace());

        Self {
            resolver: config.resolver(),
            aliases: Arc::new(AliasTable::new()),
            session: SessionHandle::new(),
            params: ParamRegistry::with_defaults(),
            scheduler,
            audio,
            cancel,
            diagnostics,
        }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Shared session handle; clones observe and affect the running session.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn params_mut(&mut self) -> &mut ParamRegistry {
        &mut self.params
    }

    pub fn actions_mut(&mut self) -> &mut ActionRegistry {
        self.scheduler.actions_mut()
    }

    /// Parse `source` and run it. Parse diagnostics are collected too.
    pub fn run_script(&mut self, source: &str) -> Outcome {
        let parsed = Script::parse(source);
        self.diagnostics.extend(parsed.diagnostics);
        self.interpret(&parsed.statements)
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Outcome {
        let mut outcome = Outcome::Completed;
        for stmt in statements {
            if self.cancel.is_cancelled() {
                outcome = Outcome::Cancelled;
                break;
            }
            match stmt {
                Stmt::Import(s) => self.import(s),
                Stmt::Play(s) => self.play(s),
                Stmt::Set(s) => self.set(s),
                Stmt::Tempo(s) => self.tempo(s),
                Stmt::Loop(s) => {
                    if self.run_loop(s) == Outcome::Cancelled {
                        outcome = Outcome::Cancelled;
                        break;
                    }
                }
                Stmt::NoOp { .. } => {}
            }
        }
        self.scheduler.settle();
        outcome
    }

    fn env(&self) -> LoopEnv {
        LoopEnv {
            aliases: Arc::clone(&self.aliases),
            session: self.session.clone(),
            audio: Arc::clone(&self.audio),
        }
    }

    fn import(&mut self, stmt: &ImportStmt) {
        for entry in &stmt.entries {
            match self.resolver.resolve(&entry.module) {
                Ok(path) => {
                    tracing::info!(module = %entry.module, alias = %entry.alias, "imported");
                    Arc::make_mut(&mut self.aliases).insert(ImportRecord::new(
                        entry.module.as_str(),
                        entry.alias.as_str(),
                        path,
                    ));
                }
                Err(e) => self.diagnostics.report(Diagnostic::resolution(
                    format!("cannot import '{}': {e}", entry.module),
                    entry.line,
                )),
            }
        }
    }

    fn play(&mut self, stmt: &PlayStmt) {
        if !self.aliases.contains(&stmt.alias) {
            self.diagnostics.report(Diagnostic::runtime(
                format!("Unknown alias '{}'", stmt.alias),
                stmt.line,
            ));
            return;
        }
        let action = LoopAction {
            name: PLAY_ACTION.to_string(),
            value: Value::Ident(stmt.alias.clone()),
            line: stmt.line,
        };
        let env = self.env();
        if let Err(e) = self.scheduler.dispatch_now(&action, &env) {
            self.diagnostics
                .report(Diagnostic::runtime(e.to_string(), stmt.line));
        }
    }

    fn set(&mut self, stmt: &SetStmt) {
        tracing::debug!(alias = %stmt.alias, params = stmt.params.len(), "set");
        for param in &stmt.params {
            let Some(handler) = self.params.get(&param.name).cloned() else {
                self.diagnostics.report(Diagnostic::runtime(
                    format!("Unknown parameter '{}'", param.name),
                    param.line,
                ));
                continue;
            };
            if let Err(message) = self.session.update(|s| handler(s, param.value.text())) {
                self.diagnostics
                    .report(Diagnostic::config(message, param.line));
            }
        }
    }

    fn tempo(&mut self, stmt: &TempoStmt) {
        tracing::info!(cpm = stmt.beats_per_minute, "tempo");
        self.session.set_tempo(stmt.beats_per_minute);
    }

    fn run_loop(&mut self, stmt: &LoopStmt) -> Outcome {
        let env = self.env();
        match self.scheduler.run(&stmt.actions, &env) {
            Ok(()) => Outcome::Cancelled,
            Err(e @ (ScheduleError::InvalidTempo(_) | ScheduleError::TimeOverflow)) => {
                self.diagnostics
                    .report(Diagnostic::config(e.to_string(), stmt.line));
                Outcome::Completed
            }
            Err(e) => {
                self.diagnostics
                    .report(Diagnostic::runtime(e.to_string(), stmt.line));
                Outcome::Completed
            }
        }
    }
}
