use crate::config::LoopSonicEngineDesc;
use crate::error::{LoopSonicError, Result};
use crate::events::LoopSonicEvent;
use crate::playback::{PlayState, PlaybackInfo, PlaybackInstance, SharedPlayState};
use crate::stream::{DecodedSource, LoopStream};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Control-side view of the track being played, independent of its source type.
trait TrackHandle: Send + Sync {
    fn playback_info(&self, play_state: PlayState) -> Result<PlaybackInfo>;
    fn rewind(&self) -> Result<()>;
}

impl<S: DecodedSource> TrackHandle for LoopStream<S> {
    fn playback_info(&self, play_state: PlayState) -> Result<PlaybackInfo> {
        PlaybackInfo::from_stream(self, play_state)
    }

    fn rewind(&self) -> Result<()> {
        self.set_position(0)
    }
}

/// Plays one loop stream at a time on the default output device.
///
/// The device runs at the native sample rate and channel count of the track;
/// no resampling or channel mapping happens.
pub struct LoopSonicEngine {
    desc: LoopSonicEngineDesc,
    stream: Option<cpal::Stream>,
    track: Option<Arc<dyn TrackHandle>>,
    play_state: SharedPlayState,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
    /// `f32` bits of the current volume
    volume: Arc<AtomicU32>,
    event_sender: Sender<LoopSonicEvent>,
    event_receiver: Receiver<LoopSonicEvent>,
}

impl LoopSonicEngine {
    /// Create a new audio engine with the given configuration
    pub fn new(desc: LoopSonicEngineDesc) -> Result<Self> {
        if desc.block_size == 0 {
            return Err(LoopSonicError::ArgumentRange(
                "Block size must be at least one frame".into(),
            ));
        }

        let (event_sender, event_receiver) = crossbeam_channel::bounded(desc.event_capacity);
        let volume = Arc::new(AtomicU32::new(desc.volume.clamp(0.0, 1.0).to_bits()));

        Ok(Self {
            desc,
            stream: None,
            track: None,
            play_state: SharedPlayState::new(PlayState::Stopped),
            is_running: Arc::new(AtomicBool::new(false)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
            volume,
            event_sender,
            event_receiver,
        })
    }

    /// Starts playing `stream` from its current position, replacing whatever
    /// was playing before.
    ///
    /// # Errors
    ///
    /// `AudioFormat` if the stream does not carry 32-bit float samples or the device
    /// has no usable sample format, `AudioDevice` if the output cannot be opened.
    pub fn play<S>(&mut self, stream: Arc<LoopStream<S>>) -> Result<()>
    where
        S: DecodedSource + 'static,
    {
        let format = stream.format();
        if format.bytes_per_sample as usize != std::mem::size_of::<f32>() {
            return Err(LoopSonicError::AudioFormat(format!(
                "Expected 32-bit float samples, got {} bytes per sample",
                format.bytes_per_sample
            )));
        }

        self.shutdown_stream();

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            LoopSonicError::AudioDevice("No default output device available".into())
        })?;

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.desc.block_size as u32),
        };

        let default_config = device.default_output_config().map_err(|e| {
            LoopSonicError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        stream.attach_sender(self.event_sender.clone());
        let instance = PlaybackInstance::new(stream.clone());

        let output = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32, S>(&device, &config, instance)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16, S>(&device, &config, instance)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16, S>(&device, &config, instance)?,
            _ => {
                return Err(LoopSonicError::AudioFormat(
                    "Unsupported sample format".into(),
                ));
            }
        };

        self.play_state.set(PlayState::Playing);
        output.play().map_err(|e| {
            self.play_state.set(PlayState::Stopped);
            LoopSonicError::AudioDevice(format!("Failed to start stream: {}", e))
        })?;

        self.stream = Some(output);
        self.track = Some(stream);
        self.is_running.store(true, Ordering::Relaxed);

        log::info!(
            "Playback started: {} Hz, {} channels",
            format.sample_rate,
            format.channels
        );
        self.emit(LoopSonicEvent::EngineStarted);
        Ok(())
    }

    /// Silences output while keeping the stream position.
    pub fn pause(&mut self) -> Result<()> {
        if self.play_state.get() != PlayState::Playing {
            return Ok(());
        }
        self.play_state.set(PlayState::Paused);
        if let Some(output) = &self.stream {
            output.pause().map_err(|e| {
                LoopSonicError::AudioDevice(format!("Failed to pause stream: {}", e))
            })?;
        }
        log::debug!("Playback paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.play_state.get() != PlayState::Paused {
            return Ok(());
        }
        if let Some(output) = &self.stream {
            output.play().map_err(|e| {
                LoopSonicError::AudioDevice(format!("Failed to resume stream: {}", e))
            })?;
        }
        self.play_state.set(PlayState::Playing);
        log::debug!("Playback resumed");
        Ok(())
    }

    /// Closes the output device and rewinds the track to its start.
    pub fn stop(&mut self) -> Result<()> {
        self.shutdown_stream();
        match &self.track {
            Some(track) => track.rewind(),
            None => Ok(()),
        }
    }

    fn shutdown_stream(&mut self) {
        self.play_state.set(PlayState::Stopped);
        if let Some(output) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(output);
            log::info!("Playback stopped");
            self.emit(LoopSonicEvent::EngineStopped);
        }
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Check if an output stream is currently open
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state.get()
    }

    /// Get the number of audio frames rendered from tracks since the engine was created
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    /// Drains pending events: loop wraps, end of track and engine state changes.
    pub fn poll_events(&self) -> Vec<LoopSonicEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// Position of the current track, or `None` if nothing has been played yet.
    pub fn playback_info(&self) -> Option<Result<PlaybackInfo>> {
        self.track
            .as_ref()
            .map(|track| track.playback_info(self.play_state.get()))
    }

    pub fn config(&self) -> &LoopSonicEngineDesc {
        &self.desc
    }

    fn emit(&self, event: LoopSonicEvent) {
        emit_event(&self.event_sender, event);
    }

    /// Create a typed output stream rendering `instance`
    fn create_stream<T, S>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        instance: PlaybackInstance<S>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
        S: DecodedSource + 'static,
    {
        let mut renderer = DeviceRenderer {
            instance,
            play_state: self.play_state.clone(),
            frames_processed: self.frames_processed.clone(),
            volume: self.volume.clone(),
            events: self.event_sender.clone(),
            buffer: Vec::new(),
        };
        let error_events = self.event_sender.clone();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let samples = renderer.render(data.len());
                    for (sample, value) in data.iter_mut().zip(samples) {
                        *sample = T::from_sample(*value);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    emit_event(
                        &error_events,
                        LoopSonicEvent::EngineError {
                            error: err.to_string(),
                        },
                    );
                },
                None,
            )
            .map_err(|e| LoopSonicError::AudioDevice(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }
}

/// State owned by the device callback.
struct DeviceRenderer<S: DecodedSource> {
    instance: PlaybackInstance<S>,
    play_state: SharedPlayState,
    frames_processed: Arc<AtomicUsize>,
    volume: Arc<AtomicU32>,
    events: Sender<LoopSonicEvent>,
    buffer: Vec<f32>,
}

impl<S: DecodedSource> DeviceRenderer<S> {
    /// Renders `len` interleaved samples. Output is silent unless playing.
    fn render(&mut self, len: usize) -> &[f32] {
        self.buffer.clear();
        self.buffer.resize(len, 0.0);
        if self.play_state.get() != PlayState::Playing {
            return &self.buffer;
        }

        let gain = f32::from_bits(self.volume.load(Ordering::Relaxed));
        match self.instance.fill_buffer(&mut self.buffer, gain) {
            Ok(status) => {
                self.frames_processed
                    .fetch_add(status.frames, Ordering::Relaxed);
                if status.finished {
                    self.play_state.set(PlayState::Stopped);
                    emit_event(&self.events, LoopSonicEvent::TrackFinished);
                }
            }
            Err(e) => {
                let error =
                    LoopSonicError::Engine(format!("Failed to read from loop stream: {}", e));
                log::error!("{}", error);
                self.buffer.fill(0.0);
                self.play_state.set(PlayState::Stopped);
                emit_event(
                    &self.events,
                    LoopSonicEvent::EngineError {
                        error: error.to_string(),
                    },
                );
            }
        }
        &self.buffer
    }
}

fn emit_event(sender: &Sender<LoopSonicEvent>, event: LoopSonicEvent) {
    if let Err(TrySendError::Full(event)) = sender.try_send(event) {
        log::warn!("Event dropped, queue is full: {:?}", event);
    }
}

impl Drop for LoopSonicEngine {
    fn drop(&mut self) {
        self.shutdown_stream();
    }
}
