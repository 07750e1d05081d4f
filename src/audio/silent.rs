//! Backend that only logs playback, for machines without an output device.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{AudioBackend, AudioError, PlayRequest};

#[derive(Debug, Default)]
pub struct SilentBackend {
    plays: AtomicUsize,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of play requests received so far.
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::Relaxed)
    }
}

impl AudioBackend for SilentBackend {
    fn initialize(&self) -> Result<(), AudioError> {
        tracing::info!("silent audio backend ready");
        Ok(())
    }

    fn play(&self, request: &PlayRequest) {
        self.plays.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            path = %request.path.display(),
            volume = request.volume,
            pitch = request.pitch,
            "play"
        );
    }

    fn shutdown(&self) {}
}
