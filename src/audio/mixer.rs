//! Mixer — runs inside the cpal output callback.
//!
//! Drains [`AudioCommand`]s from the ring buffer, sums the active voices
//! into every output channel and hard-clamps the result.

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::command::{AudioCommand, Voice};

/// Upper bound on simultaneously sounding voices. The oldest voice is
/// dropped to make room.
pub const MAX_VOICES: usize = 64;

/// Master output ceiling.
const CEILING: f32 = 0.95;

/// State that lives on the audio thread.
pub struct Mixer {
    consumer: HeapCons<AudioCommand>,
    voices: Vec<Voice>,
    channels: usize,
}

impl Mixer {
    pub fn new(consumer: HeapCons<AudioCommand>, channels: u16) -> Self {
        Self {
            consumer,
            voices: Vec::with_capacity(MAX_VOICES),
            channels: usize::from(channels.max(1)),
        }
    }

    /// Fill an interleaved output buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Trigger(voice) => {
                    if self.voices.len() >= MAX_VOICES {
                        self.voices.remove(0);
                    }
                    self.voices.push(voice);
                }
                AudioCommand::StopAll => self.voices.clear(),
            }
        }

        for frame in output.chunks_mut(self.channels) {
            let mut mix = 0.0f32;
            self.voices.retain_mut(|voice| match voice.next_sample() {
                Some(s) => {
                    mix += s;
                    true
                }
                None => false,
            });
            frame.fill(mix.clamp(-CEILING, CEILING));
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }
}
