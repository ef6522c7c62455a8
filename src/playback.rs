use crate::error::Result;
use crate::stream::{DecodedSource, LoopCount, LoopStream, decode_f32_le};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Playback state of the engine's current track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
}

impl PlayState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Playing,
            1 => Self::Paused,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Playing => 0,
            Self::Paused => 1,
            Self::Stopped => 2,
        }
    }
}

/// Play state shared between the control thread and the device callback.
#[derive(Debug, Clone)]
pub(crate) struct SharedPlayState(Arc<AtomicU8>);

impl SharedPlayState {
    pub(crate) fn new(state: PlayState) -> Self {
        Self(Arc::new(AtomicU8::new(state.as_u8())))
    }

    pub(crate) fn get(&self) -> PlayState {
        PlayState::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, state: PlayState) {
        self.0.store(state.as_u8(), Ordering::Relaxed);
    }
}

/// Snapshot of where playback is within the current track
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInfo {
    /// Current playback position in frames, relative to the track start
    pub current_frame: u64,
    /// Number of frames between the track start and the track end
    pub total_frames: u64,
    /// Current playback time in seconds
    pub current_time: f64,
    /// Track duration in seconds, ignoring repeats
    pub total_time: f64,
    pub play_state: PlayState,
    pub remaining_loops: LoopCount,
}

impl PlaybackInfo {
    pub fn new(total_frames: u64, sample_rate: u32) -> Self {
        Self {
            current_frame: 0,
            total_frames,
            current_time: 0.0,
            total_time: frames_to_seconds(total_frames, sample_rate),
            play_state: PlayState::Stopped,
            remaining_loops: LoopCount::Infinite,
        }
    }

    /// Reads the current position and loop count of `stream`.
    pub fn from_stream<S: DecodedSource>(
        stream: &LoopStream<S>,
        play_state: PlayState,
    ) -> Result<Self> {
        let region = stream.region();
        let sample_rate = stream.format().sample_rate;
        let total_frames = region.frame_size().to_frames(region.len());

        let mut info = Self::new(total_frames, sample_rate);
        info.update_position(stream.current_frame()?, sample_rate);
        info.play_state = play_state;
        info.remaining_loops = region.repeats();
        Ok(info)
    }

    pub fn update_position(&mut self, current_frame: u64, sample_rate: u32) {
        self.current_frame = current_frame.min(self.total_frames);
        self.current_time = frames_to_seconds(self.current_frame, sample_rate);
    }

    /// True once the cursor sits on the track end with no loops left.
    pub fn is_finished(&self) -> bool {
        self.remaining_loops.is_exhausted() && self.current_frame >= self.total_frames
    }
}

fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        0.0
    } else {
        frames as f64 / sample_rate as f64
    }
}

/// Result of one [`PlaybackInstance::fill_buffer`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FillStatus {
    /// Whole frames taken from the stream
    pub frames: usize,
    /// Set on the call where the stream first came up short
    pub finished: bool,
}

/// A loop stream being rendered into `f32` device buffers.
pub(crate) struct PlaybackInstance<S: DecodedSource> {
    stream: Arc<LoopStream<S>>,
    channels: usize,
    scratch: Vec<u8>,
    finished: bool,
}

impl<S: DecodedSource> PlaybackInstance<S> {
    pub(crate) fn new(stream: Arc<LoopStream<S>>) -> Self {
        let channels = stream.format().channels.max(1) as usize;
        Self {
            stream,
            channels,
            scratch: Vec::new(),
            finished: false,
        }
    }

    /// Fills `buffer` with interleaved samples scaled by `volume`.
    ///
    /// Whatever the stream cannot provide is left silent. After the first short
    /// read the instance only produces silence.
    pub(crate) fn fill_buffer(&mut self, buffer: &mut [f32], volume: f32) -> Result<FillStatus> {
        buffer.fill(0.0);
        if self.finished {
            return Ok(FillStatus {
                frames: 0,
                finished: false,
            });
        }

        let wanted = buffer.len() * SAMPLE_BYTES;
        self.scratch.resize(wanted, 0);
        let read = self.stream.read(&mut self.scratch)?;

        let converted = decode_f32_le(&self.scratch[..read], buffer);
        for sample in &mut buffer[..converted] {
            *sample *= volume;
        }

        let finished = read < wanted;
        if finished {
            self.finished = true;
            log::debug!("Track finished after a short read of {} bytes", read);
        }

        Ok(FillStatus {
            frames: converted / self.channels,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_data::LoopSonicAudioData;
    use crate::error::LoopSonicError;
    use crate::stream::{PcmSource, RegionUpdate};
    use crate::stream::test_source::ScriptedSource;

    /// Stereo ramp: frame `i` holds `(i, -i)`.
    fn ramp_stream(frames: usize) -> Arc<LoopStream<PcmSource>> {
        let samples = (0..frames)
            .flat_map(|i| [i as f32, -(i as f32)])
            .collect();
        let audio = Arc::new(LoopSonicAudioData::from_samples(samples, 10, 2));
        Arc::new(LoopStream::new(PcmSource::new(audio)).unwrap())
    }

    #[test]
    fn test_fill_applies_volume_across_wraps() {
        let stream = ramp_stream(8);
        stream
            .configure(RegionUpdate::new().loop_start(2).loop_end(4))
            .unwrap();
        let events = stream.subscribe(4);

        let mut instance = PlaybackInstance::new(stream);
        let mut buffer = [0.0f32; 12];
        let status = instance.fill_buffer(&mut buffer, 0.5).unwrap();

        assert_eq!(status, FillStatus { frames: 6, finished: false });
        assert_eq!(
            buffer,
            [0.0, -0.0, 0.5, -0.5, 1.0, -1.0, 1.5, -1.5, 1.0, -1.0, 1.5, -1.5]
        );
        assert_eq!(events.try_iter().count(), 2);
    }

    #[test]
    fn test_short_read_zero_fills_and_finishes_once() {
        let stream = ramp_stream(4);
        stream.set_remaining_repeats(LoopCount::Remaining(0));

        let mut instance = PlaybackInstance::new(stream);
        let mut buffer = [9.0f32; 12];
        let status = instance.fill_buffer(&mut buffer, 1.0).unwrap();
        assert_eq!(status, FillStatus { frames: 4, finished: true });
        assert_eq!(buffer[6..8], [3.0, -3.0]);
        assert!(buffer[8..].iter().all(|&s| s == 0.0));

        let status = instance.fill_buffer(&mut buffer, 1.0).unwrap();
        assert_eq!(status, FillStatus { frames: 0, finished: false });
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_fill_propagates_source_errors() {
        let source = ScriptedSource::new(64, 4).with_max_chunk(8).failing_at(16);
        let stream = Arc::new(LoopStream::new(source).unwrap());

        let mut instance = PlaybackInstance::new(stream);
        let mut buffer = [0.0f32; 32];
        assert!(matches!(
            instance.fill_buffer(&mut buffer, 1.0),
            Err(LoopSonicError::Io(_))
        ));
    }

    #[test]
    fn test_info_tracks_stream_position() {
        let stream = ramp_stream(20);
        stream
            .configure(RegionUpdate::new().track_start(10).loop_start(10))
            .unwrap();
        stream.set_current_frame(5).unwrap();
        stream.set_remaining_repeats(LoopCount::Remaining(2));

        let info = PlaybackInfo::from_stream(&stream, PlayState::Paused).unwrap();
        assert_eq!(info.current_frame, 5);
        assert_eq!(info.total_frames, 10);
        assert_eq!(info.current_time, 0.5);
        assert_eq!(info.total_time, 1.0);
        assert_eq!(info.play_state, PlayState::Paused);
        assert_eq!(info.remaining_loops, LoopCount::Remaining(2));
        assert!(!info.is_finished());
    }

    #[test]
    fn test_shared_state_round_trips() {
        let state = SharedPlayState::new(PlayState::Stopped);
        let other = state.clone();
        for s in [PlayState::Playing, PlayState::Paused, PlayState::Stopped] {
            other.set(s);
            assert_eq!(state.get(), s);
        }
    }
}
