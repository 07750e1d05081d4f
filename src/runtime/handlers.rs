//! Name-keyed handler registries for `set` parameters and loop actions.
//!
//! Both registries start with the built-in handlers and stay open: a host
//! can register more before running a script.

use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::{AudioBackend, PlayRequest};
use crate::dsl::ast::LoopAction;

use super::alias::AliasTable;
use super::session::{SessionSnapshot, SessionState};

/// Reserved loop pseudo-action that moves the offset without firing.
pub const WAIT_ACTION: &str = "wait";

/// Built-in action that plays an imported alias.
pub const PLAY_ACTION: &str = "play";

/// Applies one `set` parameter value to the session.
pub type ParamHandler = Arc<dyn Fn(&mut SessionState, &str) -> Result<(), String> + Send + Sync>;

/// Fires one loop action.
pub type ActionHandler =
    Arc<dyn Fn(&ActionContext<'_>, &LoopAction) -> Result<(), String> + Send + Sync>;

/// Everything an action handler may touch when it fires.
pub struct ActionContext<'a> {
    pub aliases: &'a AliasTable,
    pub session: &'a SessionSnapshot,
    pub audio: &'a dyn AudioBackend,
}

#[derive(Clone, Default)]
pub struct ParamRegistry {
    handlers: HashMap<String, ParamHandler>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `sample`, `volume` and `pitch`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("sample", |state, value| {
            if value.is_empty() {
                return Err("sample needs an alias".into());
            }
            state.sample = Some(value.to_string());
            Ok(())
        });
        registry.register("volume", |state, value| {
            state.volume = parse_float(value, "volume", |v| v >= 0.0)?;
            Ok(())
        });
        registry.register("pitch", |state, value| {
            state.pitch = parse_float(value, "pitch", |v| v > 0.0)?;
            Ok(())
        });
        registry
    }

    /// Add or replace a handler.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut SessionState, &str) -> Result<(), String> + Send + Sync + 'static,
    ) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&ParamHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

fn parse_float(value: &str, what: &str, valid: impl Fn(f32) -> bool) -> Result<f32, String> {
    match value.trim().parse::<f32>() {
        Ok(v) if v.is_finite() && valid(v) => Ok(v),
        _ => Err(format!("invalid {what} value '{value}'")),
    }
}

#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, ActionHandler>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `play` action.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .handlers
            .insert(PLAY_ACTION.to_string(), Arc::new(play_action));
        registry
    }

    /// Add or replace a handler. `wait` is reserved and refused.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&ActionContext<'_>, &LoopAction) -> Result<(), String>
            + Send
            + Sync
            + 'static,
    ) -> Result<(), String> {
        let name = name.into();
        if name == WAIT_ACTION {
            return Err(format!("'{WAIT_ACTION}' is a reserved action"));
        }
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ActionHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

/// `play <alias>`: an empty alias falls back to the session's current sample.
fn play_action(ctx: &ActionContext<'_>, action: &LoopAction) -> Result<(), String> {
    let alias = match action.value.text() {
        "" => ctx
            .session
            .sample
            .as_deref()
            .ok_or_else(|| "play without an alias and no current sample".to_string())?,
        alias => alias,
    };
    let record = ctx
        .aliases
        .get(alias)
        .ok_or_else(|| format!("Unknown alias '{alias}'"))?;

    ctx.audio.play(&PlayRequest::new(
        record.path().to_path_buf(),
        ctx.session.volume,
        ctx.session.pitch,
    ));
    Ok(())
}
