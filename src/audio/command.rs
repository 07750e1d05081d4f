//! Commands sent from playback callers to the audio thread via ring buffer.

use std::sync::Arc;

/// Commands sent to the mixer on the audio thread.
#[derive(Debug)]
pub enum AudioCommand {
    /// Start a new voice.
    Trigger(Voice),

    /// Silence every active voice.
    StopAll,
}

/// One playing instance of a sample.
#[derive(Debug, Clone)]
pub struct Voice {
    samples: Arc<[f32]>,
    position: f64,
    rate: f64,
    gain: f32,
}

impl Voice {
    /// `rate` is the playback-rate factor (2.0 = one octave up).
    pub fn new(samples: Arc<[f32]>, gain: f32, rate: f32) -> Self {
        Self {
            samples,
            position: 0.0,
            rate: f64::from(rate.max(f32::EPSILON)),
            gain,
        }
    }

    /// Next output value, or `None` once the sample has run out.
    pub fn next_sample(&mut self) -> Option<f32> {
        let len = self.samples.len();
        let idx = self.position as usize;
        if idx >= len {
            return None;
        }
        let frac = (self.position - idx as f64) as f32;
        let current = self.samples[idx];
        let value = match self.samples.get(idx + 1) {
            Some(&next) => current + (next - current) * frac,
            None => current,
        };
        self.position += self.rate;
        Some(value * self.gain)
    }

    pub fn is_finished(&self) -> bool {
        self.position as usize >= self.samples.len()
    }
}
