//! Loop scheduler — turns a `loop` block into beat-timed action firings.
//!
//! A loop block is planned once into beat offsets. Each iteration then
//! spawns one task per firing; the task sleeps until its due time and fires
//! unless the loop has been cancelled. Iteration deadlines are accumulated
//! from the previous deadline, not from "now", so timing does not drift.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::audio::AudioBackend;
use crate::dsl::ast::LoopAction;
use crate::dsl::error::{Diagnostic, Diagnostics};

use super::alias::AliasTable;
use super::cancel::CancellationToken;
use super::handlers::{ActionContext, ActionHandler, ActionRegistry, PLAY_ACTION, WAIT_ACTION};
use super::session::{SessionHandle, SessionSnapshot};

/// Name given to every action task thread.
pub const ACTION_THREAD_NAME: &str = "wavescript-action";

/// Default time allowed for in-flight tasks to finish once a loop exits.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(250);

/// Length of one beat at the slowest tempo (1 bpm). Every planned offset
/// must be representable as a `Duration` at this tempo.
const SLOWEST_BEAT: Duration = Duration::from_secs(60);

/// How far a firing action moves the running offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpacing {
    /// One beat after every non-wait action.
    #[default]
    Beat,
    /// One beat shared evenly between all non-wait actions of the block.
    Divided,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Tempo must be positive before a loop can run.
    InvalidTempo(u32),
    /// A loop block without actions.
    EmptyLoop,
    /// No handler registered under this action name.
    UnknownAction(String),
    /// An iteration deadline fell outside the clock's range.
    TimeOverflow,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidTempo(bpm) => write!(f, "invalid tempo {bpm}, set cpm above 0"),
            ScheduleError::EmptyLoop => write!(f, "loop has no actions"),
            ScheduleError::UnknownAction(name) => write!(f, "Unknown action '{name}'"),
            ScheduleError::TimeOverflow => write!(f, "loop timing exceeds the clock range"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Parse a `wait` value: a decimal (`0.25`) or a fraction (`1/2`).
pub fn parse_beats(text: &str) -> Result<f64, String> {
    let text = text.trim();
    let beats = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid wait numerator in '{text}'"))?;
            let den: f64 = den
                .trim()
                .parse()
                .map_err(|_| format!("invalid wait denominator in '{text}'"))?;
            if den == 0.0 {
                return Err(format!("zero denominator in wait '{text}'"));
            }
            num / den
        }
        None => text
            .parse::<f64>()
            .map_err(|_| format!("invalid wait duration '{text}'"))?,
    };
    if !beats.is_finite() || beats < 0.0 {
        return Err(format!("invalid wait duration '{text}'"));
    }
    Ok(beats)
}

/// Wall-clock length of one beat. `tempo` must be positive.
pub fn beat_duration(tempo: u32) -> Duration {
    Duration::from_secs_f64(60.0 / f64::from(tempo.max(1)))
}

/// `beats` beats of `beat` length, or `None` if that does not fit a `Duration`.
pub fn beats_span(beat: Duration, beats: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(beat.as_secs_f64() * beats).ok()
}

/// The instant `beats` beats after `start`, or `None` past the clock's range.
pub fn deadline(start: Instant, beat: Duration, beats: f64) -> Option<Instant> {
    start.checked_add(beats_span(beat, beats)?)
}

/// One action to fire at a fixed offset into every iteration.
#[derive(Clone)]
pub struct Firing {
    pub offset_beats: f64,
    pub action: LoopAction,
    handler: ActionHandler,
}

impl fmt::Debug for Firing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firing")
            .field("offset_beats", &self.offset_beats)
            .field("action", &self.action.name)
            .finish()
    }
}

/// A loop block resolved to beat offsets.
#[derive(Debug, Clone)]
pub struct IterationPlan {
    pub firings: Vec<Firing>,
    /// `max(1, furthest offset reached)`.
    pub length_beats: f64,
}

/// Walk `actions` once and compute each firing's offset.
///
/// Bad `wait` values, unknown action names and `play` actions naming an
/// alias missing from `aliases` are reported to `diagnostics` once and
/// skipped without moving the offset.
pub fn plan_iteration(
    actions: &[LoopAction],
    registry: &ActionRegistry,
    aliases: &AliasTable,
    spacing: ActionSpacing,
    diagnostics: &Diagnostics,
) -> IterationPlan {
    let step = match spacing {
        ActionSpacing::Beat => 1.0,
        ActionSpacing::Divided => {
            let firing = actions.iter().filter(|a| a.name != WAIT_ACTION).count();
            1.0 / firing.max(1) as f64
        }
    };

    let mut offset = 0.0f64;
    let mut max_beats = 0.0f64;
    let mut firings = Vec::new();

    for action in actions {
        if action.name == WAIT_ACTION {
            match parse_beats(action.value.text()) {
                Ok(beats) if beats_span(SLOWEST_BEAT, offset + beats).is_some() => {
                    offset += beats;
                    max_beats = max_beats.max(offset);
                }
                Ok(_) => diagnostics.report(Diagnostic::config(
                    format!("wait '{}' is too long", action.value.text()),
                    action.line,
                )),
                Err(message) => diagnostics.report(Diagnostic::config(message, action.line)),
            }
            continue;
        }

        let Some(handler) = registry.get(&action.name) else {
            diagnostics.report(Diagnostic::runtime(
                ScheduleError::UnknownAction(action.name.clone()).to_string(),
                action.line,
            ));
            continue;
        };

        // An empty alias falls back to the current sample and is resolved when fired.
        let alias = action.value.text();
        if action.name == PLAY_ACTION && !alias.is_empty() && !aliases.contains(alias) {
            diagnostics.report(Diagnostic::runtime(
                format!("Unknown alias '{alias}'"),
                action.line,
            ));
            continue;
        }

        firings.push(Firing {
            offset_beats: offset,
            action: action.clone(),
            handler: handler.clone(),
        });
        offset += step;
        max_beats = max_beats.max(offset);
    }

    IterationPlan {
        firings,
        length_beats: max_beats.max(1.0),
    }
}

/// Shared collaborators every fired task needs.
#[derive(Clone)]
pub struct LoopEnv {
    pub aliases: Arc<AliasTable>,
    pub session: SessionHandle,
    pub audio: Arc<dyn AudioBackend>,
}

/// Runs loop blocks and one-shot dispatches, tracking every task it spawns.
pub struct LoopScheduler {
    registry: ActionRegistry,
    spacing: ActionSpacing,
    grace: Duration,
    cancel: CancellationToken,
    diagnostics: Diagnostics,
    in_flight: Vec<JoinHandle<()>>,
}

impl LoopScheduler {
    pub fn new(
        registry: ActionRegistry,
        spacing: ActionSpacing,
        cancel: CancellationToken,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            registry,
            spacing,
            grace: DEFAULT_GRACE,
            cancel,
            diagnostics,
            in_flight: Vec::new(),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn actions_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn spacing(&self) -> ActionSpacing {
        self.spacing
    }

    /// Number of spawned tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run `actions` as a loop until cancelled.
    ///
    /// Returns `Ok(())` once the cancellation token fires. Errors are
    /// returned before any delay is computed, except a tempo that drops to
    /// zero while running or a deadline past the clock's range. Either one
    /// ends the loop at the next iteration.
    pub fn run(&mut self, actions: &[LoopAction], env: &LoopEnv) -> Result<(), ScheduleError> {
        let tempo = env.session.tempo();
        if tempo == 0 {
            return Err(ScheduleError::InvalidTempo(tempo));
        }
        if actions.is_empty() {
            return Err(ScheduleError::EmptyLoop);
        }

        let plan = plan_iteration(
            actions,
            &self.registry,
            &env.aliases,
            self.spacing,
            &self.diagnostics,
        );
        tracing::info!(
            tempo,
            firings = plan.firings.len(),
            length_beats = plan.length_beats,
            "loop started"
        );

        let mut iteration_start = Instant::now();
        let mut iteration = 0u64;
        let result = loop {
            if self.cancel.is_cancelled() {
                break Ok(());
            }
            let tempo = env.session.tempo();
            if tempo == 0 {
                break Err(ScheduleError::InvalidTempo(tempo));
            }
            let beat = beat_duration(tempo);
            // Every offset is at most the iteration length, so checking the end covers them.
            let Some(next) = deadline(iteration_start, beat, plan.length_beats) else {
                break Err(ScheduleError::TimeOverflow);
            };
            let snapshot = env.session.snapshot();

            for firing in &plan.firings {
                let due = deadline(iteration_start, beat, firing.offset_beats).unwrap_or(next);
                self.spawn_firing(due, firing, snapshot.clone(), env);
            }
            self.reap_finished();
            tracing::debug!(iteration, tempo, in_flight = self.in_flight.len(), "iteration scheduled");

            if self.cancel.wait_until(next) {
                break Ok(());
            }
            iteration_start = next;
            iteration += 1;
        };

        tracing::info!(iterations = iteration + 1, "loop stopped");
        self.settle();
        result
    }

    /// Fire `action` once, immediately, with the current session values.
    pub fn dispatch_now(&mut self, action: &LoopAction, env: &LoopEnv) -> Result<(), ScheduleError> {
        let handler = self
            .registry
            .get(&action.name)
            .cloned()
            .ok_or_else(|| ScheduleError::UnknownAction(action.name.clone()))?;
        let firing = Firing {
            offset_beats: 0.0,
            action: action.clone(),
            handler,
        };
        self.spawn_firing(Instant::now(), &firing, env.session.snapshot(), env);
        self.reap_finished();
        Ok(())
    }

    fn spawn_firing(
        &mut self,
        due: Instant,
        firing: &Firing,
        snapshot: SessionSnapshot,
        env: &LoopEnv,
    ) {
        let cancel = self.cancel.clone();
        let diagnostics = self.diagnostics.clone();
        let handler = firing.handler.clone();
        let action = firing.action.clone();
        let aliases = Arc::clone(&env.aliases);
        let audio = Arc::clone(&env.audio);

        let line = action.line;
        let task_diagnostics = diagnostics.clone();

        let spawned = thread::Builder::new()
            .name(ACTION_THREAD_NAME.into())
            .spawn(move || {
                if cancel.wait_until(due) {
                    return;
                }
                let ctx = ActionContext {
                    aliases: &aliases,
                    session: &snapshot,
                    audio: audio.as_ref(),
                };
                if let Err(message) = handler(&ctx, &action) {
                    task_diagnostics.report_once(Diagnostic::runtime(message, action.line));
                }
            });
        match spawned {
            Ok(handle) => self.in_flight.push(handle),
            Err(e) => {
                diagnostics.report_once(Diagnostic::runtime(
                    format!("could not start action task: {e}"),
                    line,
                ));
            }
        }
    }

    /// Join tasks that already finished and keep the rest.
    pub fn reap_finished(&mut self) {
        let (done, pending): (Vec<_>, Vec<_>) =
            self.in_flight.drain(..).partition(|h| h.is_finished());
        self.in_flight = pending;
        for handle in done {
            if handle.join().is_err() {
                tracing::error!("action task panicked");
            }
        }
    }

    /// Wait up to the grace period for in-flight tasks, then abandon the rest.
    pub fn settle(&mut self) {
        let deadline = Instant::now() + self.grace;
        while self.in_flight.iter().any(|h| !h.is_finished()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        self.reap_finished();
        if !self.in_flight.is_empty() {
            tracing::warn!(
                abandoned = self.in_flight.len(),
                grace = ?self.grace,
                "abandoning action tasks still in flight"
            );
            self.in_flight.clear();
        }
    }
}
