//! Sample files — WAV decoding, mono mixdown, resampling and a per-path cache.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Errors that can occur when loading a sample.
#[derive(Debug)]
pub enum SampleError {
    /// WAV decoding or I/O error.
    Wav(hound::Error),
    /// The file decoded to zero frames.
    Empty,
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::Wav(e) => write!(f, "WAV error: {e}"),
            SampleError::Empty => write!(f, "WAV file contains no samples"),
        }
    }
}

impl std::error::Error for SampleError {}

impl From<hound::Error> for SampleError {
    fn from(e: hound::Error) -> Self {
        SampleError::Wav(e)
    }
}

/// Decoded mono audio at a known rate. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SampleData {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleData {
    /// Decode WAV data and convert it to mono at `target_rate`.
    pub fn from_wav<R: Read>(reader: R, target_rate: u32) -> Result<Self, SampleError> {
        let wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav.into_samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
                wav.into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };
        if interleaved.is_empty() {
            return Err(SampleError::Empty);
        }

        let mono: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        let samples = if spec.sample_rate == target_rate {
            mono
        } else {
            resample(&mono, spec.sample_rate, target_rate)
        };

        Ok(Self {
            samples: samples.into(),
            sample_rate: target_rate,
        })
    }

    /// Open and decode a WAV file.
    pub fn load(path: &Path, target_rate: u32) -> Result<Self, SampleError> {
        let file = std::fs::File::open(path).map_err(hound::Error::IoError)?;
        Self::from_wav(std::io::BufReader::new(file), target_rate)
    }

    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Linear-interpolation rate conversion.
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if input.len() < 2 || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }
    let step = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (input.len() as f64 / step).ceil() as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            match input.get(idx + 1) {
                Some(&next) => input[idx] + (next - input[idx]) * frac,
                None => input[idx],
            }
        })
        .collect()
}

/// Decoded samples keyed by path, each file decoded at most once.
#[derive(Debug, Default)]
pub struct SampleCache {
    entries: Mutex<HashMap<PathBuf, SampleData>>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path, target_rate: u32) -> Result<SampleData, SampleError> {
        if let Some(hit) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(hit.clone());
        }

        let data = SampleData::load(path, target_rate)?;
        tracing::debug!(path = %path.display(), frames = data.len(), "decoded sample");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), data.clone());
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
