//! The loop-aware read engine.

use super::frame::FrameSize;
use super::region::{LoopCount, LoopRegion, RegionUpdate};
use super::{DecodedSource, PcmFormat, read_to_fill};
use crate::error::{LoopSonicError, Result};
use crate::events::{LoopObservers, LoopSonicEvent};
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Stream decorator presenting a virtual track with a repeating loop region.
///
/// The consumer sees a track `[track_start, track_end)` of the underlying source,
/// with positions counted from zero at the track start. Whenever the read cursor
/// reaches the loop end while loops remain, it jumps back to the loop start and a
/// [`LoopSonicEvent::Looped`] notification is raised. Once the loop count is used
/// up, reading continues through the outro up to the track end.
///
/// A single lock guards the source and the region: reads and reconfigurations
/// are fully serialized, so a loop boundary can never shrink underneath a read
/// that is in flight. Share the stream between the audio and control threads
/// with an [`Arc`].
pub struct LoopStream<S: DecodedSource> {
    state: Mutex<StreamState<S>>,
    observers: Mutex<LoopObservers>,
    format: PcmFormat,
}

struct StreamState<S> {
    /// `None` once the stream has been disposed.
    source: Option<S>,
    region: LoopRegion,
}

impl<S: DecodedSource> LoopStream<S> {
    /// Wraps `source` in a stream that loops the whole source forever.
    ///
    /// # Errors
    ///
    /// `ArgumentRange` if the source reports a zero frame size, `InvalidConfiguration`
    /// if it does not hold a single complete frame.
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        let frame_size = FrameSize::new(format.block_align())?;
        let region = LoopRegion::new(frame_size, source.len())?;

        log::debug!(
            "Created loop stream: {} Hz, {} channels, {} frames",
            format.sample_rate,
            format.channels,
            region.track_end_frame()
        );

        Ok(Self {
            state: Mutex::new(StreamState {
                source: Some(source),
                region,
            }),
            observers: Mutex::new(LoopObservers::default()),
            format,
        })
    }

    fn state(&self) -> MutexGuard<'_, StreamState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, LoopObservers> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads up to `buf.len()` bytes, wrapping at the loop end as configured.
    ///
    /// Returns fewer bytes than requested only when the underlying source ran out
    /// of data; the caller should treat that as the end of the track. Loop
    /// notifications for this call are delivered before it returns.
    ///
    /// # Errors
    ///
    /// `Io` if the source fails, `Disposed` after [`dispose`](Self::dispose).
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut wraps = 0;
        let result = self.state().read(buf, &mut wraps);
        self.notify_looped(wraps);
        result
    }

    /// Reads up to `count` bytes into `buf[offset..offset + count]`.
    pub fn read_into(&self, buf: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                LoopSonicError::ArgumentRange(format!(
                    "Range {}+{} does not fit a buffer of {} bytes",
                    offset,
                    count,
                    buf.len()
                ))
            })?;
        self.read(&mut buf[offset..end])
    }

    fn notify_looped(&self, wraps: usize) {
        if wraps == 0 {
            return;
        }
        let callbacks = {
            let mut observers = self.observers();
            if observers.is_empty() {
                return;
            }
            for _ in 0..wraps {
                observers.send_looped();
            }
            observers.callbacks()
        };

        for _ in 0..wraps {
            for callback in &callbacks {
                callback();
            }
        }
    }

    /// Applies marker changes (frame indices in the underlying source) atomically.
    ///
    /// If the new track bounds leave the read cursor outside the track, the cursor
    /// is moved to the nearest bound.
    pub fn configure(&self, update: RegionUpdate) -> Result<()> {
        self.state().reconfigure(|region| region.configure(update))
    }

    /// Moves the loop markers, given as frame offsets from the track start.
    pub fn set_loop_within_track(
        &self,
        loop_start: Option<u64>,
        loop_end: Option<u64>,
    ) -> Result<()> {
        self.state()
            .reconfigure(|region| region.set_loop_within_track(loop_start, loop_end))
    }

    /// Moves the track bounds (frame indices in the underlying source). The
    /// current loop markers must still fit inside the new bounds.
    pub fn set_track_bounds(
        &self,
        track_start: Option<u64>,
        track_end: Option<u64>,
    ) -> Result<()> {
        self.state()
            .reconfigure(|region| region.set_track_bounds(track_start, track_end))
    }

    /// Snapshot of the current markers and loop count.
    pub fn region(&self) -> LoopRegion {
        self.state().region
    }

    pub fn remaining_repeats(&self) -> LoopCount {
        self.state().region.repeats()
    }

    pub fn set_remaining_repeats(&self, repeats: LoopCount) {
        log::debug!("Remaining loops set to {}", repeats);
        self.state().region.set_repeats(repeats);
    }

    /// Track length in bytes.
    pub fn len(&self) -> u64 {
        self.state().region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn frame_size(&self) -> FrameSize {
        self.state().region.frame_size()
    }

    /// Current position in bytes, relative to the track start.
    pub fn position(&self) -> Result<u64> {
        let state = self.state();
        let source = state.source.as_ref().ok_or(LoopSonicError::Disposed)?;
        Ok(state.region.translator().to_virtual(source.position()))
    }

    /// Moves the cursor to `position` bytes after the track start, rounded down to a frame.
    ///
    /// # Errors
    ///
    /// `ArgumentRange` if `position` lies past the track end.
    pub fn set_position(&self, position: u64) -> Result<()> {
        let mut state = self.state();
        let len = state.region.len();
        if position > len {
            return Err(LoopSonicError::ArgumentRange(format!(
                "Position {} is past the track length {}",
                position, len
            )));
        }
        let underlying = state.region.translator().to_underlying(position);
        let source = state.source.as_mut().ok_or(LoopSonicError::Disposed)?;
        source.set_position(underlying)?;
        Ok(())
    }

    /// Current position in frames, relative to the track start.
    pub fn current_frame(&self) -> Result<u64> {
        Ok(self.frame_size().to_frames(self.position()?))
    }

    pub fn set_current_frame(&self, frame: u64) -> Result<()> {
        let position = frame.checked_mul(self.frame_size().bytes()).ok_or_else(|| {
            LoopSonicError::ArgumentRange(format!("Frame {} is out of range", frame))
        })?;
        self.set_position(position)
    }

    /// Registers a callback fired once per loop wrap.
    ///
    /// Callbacks run on the reading thread after every stream lock has been released,
    /// so they may query the stream or register further observers. Observers added
    /// from a callback see the next wrap onwards.
    pub fn on_looped<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers().add_callback(Arc::new(callback));
    }

    /// Returns a bounded channel receiving a [`LoopSonicEvent::Looped`] per wrap.
    ///
    /// Notifications that do not fit in the channel are dropped.
    pub fn subscribe(&self, capacity: usize) -> Receiver<LoopSonicEvent> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        self.attach_sender(sender);
        receiver
    }

    /// Forwards loop notifications into an existing event channel.
    pub fn attach_sender(&self, sender: Sender<LoopSonicEvent>) {
        self.observers().add_sender(sender);
    }

    /// Releases the underlying source. Waits for an in-flight read to finish;
    /// calling it again does nothing.
    pub fn dispose(&self) {
        if self.state().source.take().is_some() {
            log::debug!("Loop stream disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state().source.is_none()
    }

    #[cfg(test)]
    pub(crate) fn inspect_source<R>(&self, inspect: impl FnOnce(&S) -> R) -> Option<R> {
        self.state().source.as_ref().map(inspect)
    }
}

impl<S: DecodedSource> StreamState<S> {
    fn read(&mut self, buf: &mut [u8], wraps: &mut usize) -> Result<usize> {
        let source = self.source.as_mut().ok_or(LoopSonicError::Disposed)?;
        let region = &mut self.region;
        let mut total = 0;

        // The markers may have moved behind the cursor since the last read.
        if !region.repeats().is_exhausted() && source.position() >= region.loop_end() {
            wrap(source, region, wraps)?;
        }

        while total < buf.len() && !region.repeats().is_exhausted() {
            let until_loop_end = region.loop_end().saturating_sub(source.position());
            let count = until_loop_end.min((buf.len() - total) as u64) as usize;

            let read = read_to_fill(source, &mut buf[total..total + count])?;
            total += read;
            if read < count {
                return Ok(total);
            }

            if source.position() >= region.loop_end() {
                wrap(source, region, wraps)?;
            }
        }

        if total == buf.len() {
            return Ok(total);
        }

        // Outro: play out to the track end without wrapping.
        let until_track_end = region.track_end().saturating_sub(source.position());
        let count = until_track_end.min((buf.len() - total) as u64) as usize;
        let read = read_to_fill(source, &mut buf[total..total + count])?;
        Ok(total + read)
    }

    /// Applies `change` to a copy of the region and commits it only once the
    /// cursor has been moved inside the new track bounds.
    fn reconfigure(&mut self, change: impl FnOnce(&mut LoopRegion) -> Result<()>) -> Result<()> {
        let mut next = self.region;
        change(&mut next)?;

        if let Some(source) = self.source.as_mut() {
            let position = source.position();
            let clamped = next.clamp(position);
            if clamped != position {
                log::debug!(
                    "Cursor at byte {} left the track, moved to {}",
                    position,
                    clamped
                );
                source.set_position(clamped)?;
            }
        }

        self.region = next;
        Ok(())
    }
}

fn wrap<S: DecodedSource>(
    source: &mut S,
    region: &mut LoopRegion,
    wraps: &mut usize,
) -> Result<()> {
    source.set_position(region.loop_start())?;
    region.consume_repeat();
    *wraps += 1;
    log::debug!(
        "Looped back to frame {} ({} loops remaining)",
        region.loop_start_frame(),
        region.repeats()
    );
    Ok(())
}

impl<S: DecodedSource> io::Read for &LoopStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        LoopStream::read(*self, buf).map_err(|e| match e {
            LoopSonicError::Io(e) => e,
            other => io::Error::other(other),
        })
    }
}
