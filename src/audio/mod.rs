//! Audio output — the playback capability used by scheduled actions.
//!
//! [`AudioBackend`] is the seam between the interpreter and sound output.
//! [`AudioEngine`] implements it on top of cpal: a dedicated thread owns the
//! output stream, and `play` pushes [`AudioCommand`]s to the mixer running
//! in the stream callback through a lock-free ring buffer.

pub mod command;
pub mod mixer;
pub mod sample;
pub mod silent;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Producer, Split},
    HeapRb,
};

pub use command::{AudioCommand, Voice};
pub use mixer::Mixer;
pub use sample::{SampleCache, SampleData, SampleError};
pub use silent::SilentBackend;

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 1024;

/// What to play and how.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub path: PathBuf,
    pub volume: f32,
    pub pitch: f32,
}

impl PlayRequest {
    pub fn new(path: PathBuf, volume: f32, pitch: f32) -> Self {
        Self {
            path,
            volume,
            pitch,
        }
    }
}

/// Sound output as seen by the interpreter.
///
/// `play` is called concurrently from scheduled action tasks and must not
/// fail loudly: implementations log problems and return.
pub trait AudioBackend: Send + Sync {
    fn initialize(&self) -> Result<(), AudioError>;
    fn play(&self, request: &PlayRequest);
    fn shutdown(&self);
}

/// Audio engine errors.
#[derive(Debug)]
pub enum AudioError {
    /// No audio output device found.
    NoOutputDevice,
    /// Failed to query device configuration.
    DeviceConfig(String),
    /// Failed to build the audio stream.
    StreamBuild(String),
    /// Failed to start the audio stream.
    StreamPlay(String),
    /// The audio thread could not be started or died during start-up.
    Thread(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoOutputDevice => write!(f, "no audio output device found"),
            AudioError::DeviceConfig(e) => write!(f, "device config error: {e}"),
            AudioError::StreamBuild(e) => write!(f, "stream build error: {e}"),
            AudioError::StreamPlay(e) => write!(f, "stream play error: {e}"),
            AudioError::Thread(e) => write!(f, "audio thread error: {e}"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Handles to a started audio thread.
struct Running {
    producer: ringbuf::HeapProd<AudioCommand>,
    sample_rate: u32,
    stop: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// cpal-backed [`AudioBackend`].
///
/// Nothing is opened until [`initialize`](AudioBackend::initialize); plays
/// before that are logged and dropped.
#[derive(Default)]
pub struct AudioEngine {
    running: Mutex<Option<Running>>,
    cache: SampleCache,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output sample rate, once initialized.
    pub fn sample_rate(&self) -> Option<u32> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.sample_rate)
    }

    pub fn is_running(&self) -> bool {
        self.sample_rate().is_some()
    }
}

type StreamParts = (ringbuf::HeapProd<AudioCommand>, u32, u16);

/// Open the default output device and start a stream driving a [`Mixer`].
fn open_stream() -> Result<(cpal::Stream, StreamParts), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels();

    let rb = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY);
    let (producer, consumer) = rb.split();
    let mut mixer = Mixer::new(consumer, channels);

    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| mixer.process(data),
            |err| tracing::error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

    Ok((stream, (producer, sample_rate, channels)))
}

impl AudioBackend for AudioEngine {
    fn initialize(&self) -> Result<(), AudioError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<StreamParts, AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        // cpal streams are not Send, so the stream lives and dies on this thread.
        let thread = thread::Builder::new()
            .name("wavescript-audio".into())
            .spawn(move || match open_stream() {
                Ok((stream, parts)) => {
                    if ready_tx.send(Ok(parts)).is_ok() {
                        let _ = stop_rx.recv();
                    }
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AudioError::Thread(e.to_string()))?;

        let (producer, sample_rate, channels) = ready_rx
            .recv()
            .map_err(|_| AudioError::Thread("audio thread exited during start-up".into()))??;

        tracing::info!(sample_rate, channels, "audio engine initialized");
        *running = Some(Running {
            producer,
            sample_rate,
            stop: stop_tx,
            thread,
        });
        Ok(())
    }

    fn play(&self, request: &PlayRequest) {
        let Some(sample_rate) = self.sample_rate() else {
            tracing::error!(path = %request.path.display(), "audio engine not initialized");
            return;
        };

        let sample = match self.cache.get_or_load(&request.path, sample_rate) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::error!(path = %request.path.display(), "failed to load sample: {e}");
                return;
            }
        };

        let voice = Voice::new(sample.samples().clone(), request.volume, request.pitch);
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        match running.as_mut() {
            Some(r) => {
                if r.producer.try_push(AudioCommand::Trigger(voice)).is_err() {
                    tracing::error!(path = %request.path.display(), "audio command buffer full");
                } else {
                    tracing::debug!(path = %request.path.display(), "triggered");
                }
            }
            None => tracing::error!("audio engine shut down before playback"),
        }
    }

    fn shutdown(&self) {
        let taken = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut r) = taken {
            let _ = r.producer.try_push(AudioCommand::StopAll);
            let _ = r.stop.send(());
            if r.thread.join().is_err() {
                tracing::error!("audio thread panicked");
            }
            tracing::info!("audio engine shut down");
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires audio device; run manually with `cargo test -- --ignored`
    fn engine_initializes_and_shuts_down() {
        let engine = AudioEngine::new();
        engine.initialize().expect("no audio device");
        assert!(engine.sample_rate().unwrap() > 0);
        engine.shutdown();
        assert!(!engine.is_running());
    }

    #[test]
    fn play_before_initialize_is_ignored() {
        let engine = AudioEngine::new();
        engine.play(&PlayRequest::new(PathBuf::from("vendor/kick.wav"), 1.0, 1.0));
        assert!(!engine.is_running());
        assert!(engine.cache.is_empty());
    }

    #[test]
    fn shutdown_without_initialize_is_noop() {
        let engine = AudioEngine::new();
        engine.shutdown();
        engine.shutdown();
    }

    #[test]
    fn audio_error_display() {
        assert_eq!(
            AudioError::NoOutputDevice.to_string(),
            "no audio output device found"
        );
        assert_eq!(
            AudioError::Thread("boom".into()).to_string(),
            "audio thread error: boom"
        );
    }
}
