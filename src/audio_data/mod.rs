mod default_loader;
mod load_options;
mod loader;

use crate::error::{LoopSonicError, Result};
pub use default_loader::{DefaultAudioLoader, SUPPORTED_EXTENSIONS};
pub use load_options::LoadOptions;
pub use loader::AudioDataLoader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Fully decoded audio, shared by reference counting.
///
/// Samples are stored **interleaved** (`[L0, R0, L1, R1, ...]` for stereo), which is
/// also the byte layout [`PcmSource`](crate::stream::PcmSource) exposes to loop streams.
#[derive(Debug, Clone)]
pub struct LoopSonicAudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
pub(crate) struct AudioDataInner {
    /// Interleaved samples; `total_frames * channels` long
    pub samples: Vec<f32>,

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo, etc.)
    pub channels: u16,

    pub duration: Duration,

    /// Calculated as: `samples.len() / channels`
    pub total_frames: usize,
}

impl LoopSonicAudioData {
    /// Wraps already decoded interleaved samples.
    ///
    /// A trailing partial frame is kept in `samples` but not counted in `total_frames`.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let total_frames = if channels == 0 {
            0
        } else {
            samples.len() / channels as usize
        };
        let duration = if sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(total_frames as f64 / sample_rate as f64)
        };

        Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        }
    }

    /// Load audio data from a file path using the default loader.
    ///
    /// # Errors
    ///
    /// Returns a `LoopSonicError` if the file cannot be opened, has an unsupported
    /// extension, or fails to decode.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        DefaultAudioLoader.load(path.as_ref(), &LoadOptions::default())
    }

    pub fn from_path_with_options(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        DefaultAudioLoader.load(path.as_ref(), options)
    }

    /// Load audio data from a file path using a custom loader.
    pub fn from_path_with_loader<L: AudioDataLoader>(
        path: impl AsRef<Path>,
        loader: &L,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        loader.load(path.as_ref(), options)
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Get interleaved samples for a specific frame range
    pub fn frame_range(&self, start_frame: usize, end_frame: usize) -> Result<&[f32]> {
        if start_frame > end_frame || end_frame > self.inner.total_frames {
            return Err(LoopSonicError::ArgumentRange(format!(
                "Frame range {}-{} out of bounds (max: {})",
                start_frame, end_frame, self.inner.total_frames
            )));
        }

        let channels = self.inner.channels as usize;
        Ok(&self.inner.samples[start_frame * channels..end_frame * channels])
    }
}
