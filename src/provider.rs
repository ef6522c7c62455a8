//! Stream providers: persisted loop markers turned into playable streams.

use crate::audio_data::LoopSonicAudioData;
use crate::error::Result;
use crate::stream::{LoopCount, LoopStream, PcmSource, RegionUpdate};
use std::path::{Path, PathBuf};

/// Loop markers for a track as stored by a playlist, in frames of the decoded file.
///
/// Omitted values fall back as follows: the track bounds to the whole file, the
/// loop start to the track start, the loop end to the track end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPoints {
    pub track_start: Option<u64>,
    pub loop_start: Option<u64>,
    pub loop_end: Option<u64>,
    pub track_end: Option<u64>,
    /// Raw loop count; `-1` loops forever.
    pub loops: i64,
}

impl Default for LoopPoints {
    fn default() -> Self {
        Self {
            track_start: None,
            loop_start: None,
            loop_end: None,
            track_end: None,
            loops: -1,
        }
    }
}

impl LoopPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_start(mut self, frame: u64) -> Self {
        self.track_start = Some(frame);
        self
    }

    pub fn loop_start(mut self, frame: u64) -> Self {
        self.loop_start = Some(frame);
        self
    }

    pub fn loop_end(mut self, frame: u64) -> Self {
        self.loop_end = Some(frame);
        self
    }

    pub fn track_end(mut self, frame: u64) -> Self {
        self.track_end = Some(frame);
        self
    }

    pub fn loops(mut self, loops: i64) -> Self {
        self.loops = loops;
        self
    }

    /// Marker update with the fallbacks applied. Markers that resolve to nothing
    /// keep the defaults of a freshly created stream.
    pub fn region_update(&self) -> RegionUpdate {
        RegionUpdate {
            track_start: self.track_start,
            loop_start: self.loop_start.or(self.track_start),
            loop_end: self.loop_end.or(self.track_end),
            track_end: self.track_end,
        }
    }
}

/// Creates looping streams for one audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStreamProvider {
    pub path: PathBuf,
    pub points: LoopPoints,
}

impl LoopStreamProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            points: LoopPoints::default(),
        }
    }

    pub fn with_points(mut self, points: LoopPoints) -> Self {
        self.points = points;
        self
    }

    /// Decodes the file and wraps it in a loop stream configured with these points.
    ///
    /// # Errors
    ///
    /// Loading errors from the default loader, `InvalidConfiguration` if the points
    /// are out of order and `ArgumentRange` if the loop count is below `-1`.
    pub fn create_stream(&self) -> Result<LoopStream<PcmSource>> {
        let repeats = LoopCount::from_raw(self.points.loops)?;
        let audio = LoopSonicAudioData::from_path(&self.path)?;

        log::info!(
            "Loaded {} ({} frames at {} Hz)",
            self.path.display(),
            audio.total_frames(),
            audio.sample_rate()
        );

        let stream = LoopStream::new(PcmSource::new(audio))?;
        stream.configure(self.points.region_update())?;
        stream.set_remaining_repeats(repeats);
        Ok(stream)
    }
}

/// Any source of playable streams. Cloning yields an independent provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamProvider {
    Loop(LoopStreamProvider),
}

impl StreamProvider {
    pub fn path(&self) -> &Path {
        match self {
            Self::Loop(provider) => &provider.path,
        }
    }

    pub fn create_stream(&self) -> Result<LoopStream<PcmSource>> {
        match self {
            Self::Loop(provider) => provider.create_stream(),
        }
    }
}

impl From<LoopStreamProvider> for StreamProvider {
    fn from(provider: LoopStreamProvider) -> Self {
        Self::Loop(provider)
    }
}
