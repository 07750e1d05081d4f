//! Session state — tempo plus the global "last set wins" playback defaults.

use std::sync::{Arc, PoisonError, RwLock};

/// Interpreter-wide mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Beats per minute. Zero means no tempo has been set yet.
    pub tempo: u32,
    /// Alias used by a loop `play` action with an empty value.
    pub sample: Option<String>,
    /// Linear gain, 1.0 = unchanged.
    pub volume: f32,
    /// Playback-rate factor, 1.0 = original pitch.
    pub pitch: f32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            tempo: 0,
            sample: None,
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

/// The playback part of the session, copied by value into scheduled tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub sample: Option<String>,
    pub volume: f32,
    pub pitch: f32,
}

impl SessionState {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sample: self.sample.clone(),
            volume: self.volume,
            pitch: self.pitch,
        }
    }
}

/// Shared handle to the session.
///
/// Statement handlers write through it; the loop scheduler reads it once
/// per iteration. A host may hold a clone and change values while a loop
/// is running; the change is picked up at the next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    state: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the full state.
    pub fn get(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn tempo(&self) -> u32 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).tempo
    }

    pub fn set_tempo(&self, tempo: u32) {
        self.update(|s| s.tempo = tempo);
    }

    /// Mutate the state under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = SessionState::default();
        assert_eq!(s.tempo, 0);
        assert!(s.sample.is_none());
        assert_eq!(s.volume, 1.0);
        assert_eq!(s.pitch, 1.0);
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let handle = SessionHandle::new();
        handle.update(|s| s.volume = 0.5);
        let snap = handle.snapshot();
        handle.update(|s| s.volume = 0.1);
        assert_eq!(snap.volume, 0.5);
        assert_eq!(handle.snapshot().volume, 0.1);
    }

    #[test]
    fn clones_share_state() {
        let a = SessionHandle::new();
        let b = a.clone();
        b.set_tempo(128);
        assert_eq!(a.tempo(), 128);
    }

    #[test]
    fn update_returns_closure_result() {
        let handle = SessionHandle::new();
        let old = handle.update(|s| std::mem::replace(&mut s.pitch, 2.0));
        assert_eq!(old, 1.0);
        assert_eq!(handle.get().pitch, 2.0);
    }
}
