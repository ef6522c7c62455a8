use super::frame::FrameSize;
use super::translator::PositionTranslator;
use crate::error::{LoopSonicError, Result};
use std::fmt;

/// How many more times the loop region will be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCount {
    /// Loop forever
    #[default]
    Infinite,
    /// Loop this many more times; `Remaining(0)` lets the cursor run into the outro
    Remaining(u32),
}

impl LoopCount {
    /// Converts the persisted integer form, where `-1` means infinite.
    pub fn from_raw(raw: i64) -> Result<Self> {
        match raw {
            -1 => Ok(Self::Infinite),
            0..=0xFFFF_FFFF => Ok(Self::Remaining(raw as u32)),
            _ => Err(LoopSonicError::ArgumentRange(format!(
                "Loop count {} is out of range (expected -1 or 0..={})",
                raw,
                u32::MAX
            ))),
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            Self::Infinite => -1,
            Self::Remaining(count) => count as i64,
        }
    }

    pub fn is_exhausted(self) -> bool {
        self == Self::Remaining(0)
    }

    /// Uses up one repeat. Infinite and exhausted counts are left alone.
    pub(crate) fn consume(&mut self) {
        if let Self::Remaining(count) = self {
            *count = count.saturating_sub(1);
        }
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infinite => write!(f, "infinite"),
            Self::Remaining(count) => write!(f, "{}", count),
        }
    }
}

/// A set of marker changes applied atomically by [`LoopRegion::configure`].
///
/// Positions are frame indices in the underlying source. Markers left unset
/// keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionUpdate {
    pub track_start: Option<u64>,
    pub loop_start: Option<u64>,
    pub loop_end: Option<u64>,
    pub track_end: Option<u64>,
}

impl RegionUpdate {
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

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Track and loop markers over a decoded source, stored as frame-aligned byte offsets.
///
/// Always satisfies `track_start <= loop_start < loop_end <= track_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    frame_size: FrameSize,
    track_start: u64,
    loop_start: u64,
    loop_end: u64,
    track_end: u64,
    repeats: LoopCount,
}

impl LoopRegion {
    /// Region covering the whole source and looping it forever.
    ///
    /// A trailing partial frame is left out of the track.
    pub fn new(frame_size: FrameSize, source_len: u64) -> Result<Self> {
        let end = frame_size.align_down(source_len);
        if end == 0 {
            return Err(LoopSonicError::InvalidConfiguration(
                "Source does not contain a single complete frame".to_string(),
            ));
        }

        Ok(Self {
            frame_size,
            track_start: 0,
            loop_start: 0,
            loop_end: end,
            track_end: end,
            repeats: LoopCount::Infinite,
        })
    }

    /// Applies all marker changes in `update` at once.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if the resulting markers are out of order, `ArgumentRange`
    /// if a frame index does not fit in a byte offset. The region is unchanged on error.
    pub fn configure(&mut self, update: RegionUpdate) -> Result<()> {
        let track_start = self.resolve(update.track_start, self.track_start)?;
        let loop_start = self.resolve(update.loop_start, self.loop_start)?;
        let loop_end = self.resolve(update.loop_end, self.loop_end)?;
        let track_end = self.resolve(update.track_end, self.track_end)?;

        Self::validate(track_start, loop_start, loop_end, track_end, self.frame_size)?;

        self.track_start = track_start;
        self.loop_start = loop_start;
        self.loop_end = loop_end;
        self.track_end = track_end;

        log::debug!(
            "Loop region set to track {}..{}, loop {}..{} (frames)",
            self.track_start_frame(),
            self.track_end_frame(),
            self.loop_start_frame(),
            self.loop_end_frame()
        );
        Ok(())
    }

    /// Moves the loop markers, given as frame offsets from the track start.
    pub fn set_loop_within_track(
        &mut self,
        loop_start: Option<u64>,
        loop_end: Option<u64>,
    ) -> Result<()> {
        let track_start = self.track_start_frame();
        let absolute = |frame: u64| {
            track_start.checked_add(frame).ok_or_else(|| {
                LoopSonicError::ArgumentRange(format!("Loop point {} is out of range", frame))
            })
        };

        let update = RegionUpdate {
            loop_start: loop_start.map(absolute).transpose()?,
            loop_end: loop_end.map(absolute).transpose()?,
            ..RegionUpdate::default()
        };
        self.configure(update)
    }

    /// Moves only the track bounds. The existing loop must still fit inside them.
    pub fn set_track_bounds(
        &mut self,
        track_start: Option<u64>,
        track_end: Option<u64>,
    ) -> Result<()> {
        self.configure(RegionUpdate {
            track_start,
            track_end,
            ..RegionUpdate::default()
        })
    }

    fn resolve(&self, frame: Option<u64>, current: u64) -> Result<u64> {
        match frame {
            None => Ok(current),
            Some(frame) => frame.checked_mul(self.frame_size.bytes()).ok_or_else(|| {
                LoopSonicError::ArgumentRange(format!("Frame index {} is out of range", frame))
            }),
        }
    }

    fn validate(
        track_start: u64,
        loop_start: u64,
        loop_end: u64,
        track_end: u64,
        frame_size: FrameSize,
    ) -> Result<()> {
        if loop_start < track_start {
            return Err(LoopSonicError::InvalidConfiguration(
                "The loop start cannot come before the track start".to_string(),
            ));
        }
        if loop_end <= loop_start {
            return Err(LoopSonicError::InvalidConfiguration(
                "The loop end must come after the loop start".to_string(),
            ));
        }
        if track_end < loop_end {
            return Err(LoopSonicError::InvalidConfiguration(
                "The track end cannot come before the loop end".to_string(),
            ));
        }
        let aligned = [track_start, loop_start, loop_end, track_end]
            .iter()
            .all(|&offset| frame_size.is_aligned(offset));
        if !aligned {
            return Err(LoopSonicError::InvalidConfiguration(
                "Markers must lie on frame boundaries".to_string(),
            ));
        }
        Ok(())
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    pub fn track_start(&self) -> u64 {
        self.track_start
    }

    pub fn loop_start(&self) -> u64 {
        self.loop_start
    }

    pub fn loop_end(&self) -> u64 {
        self.loop_end
    }

    pub fn track_end(&self) -> u64 {
        self.track_end
    }

    pub fn track_start_frame(&self) -> u64 {
        self.frame_size.to_frames(self.track_start)
    }

    pub fn loop_start_frame(&self) -> u64 {
        self.frame_size.to_frames(self.loop_start)
    }

    pub fn loop_end_frame(&self) -> u64 {
        self.frame_size.to_frames(self.loop_end)
    }

    pub fn track_end_frame(&self) -> u64 {
        self.frame_size.to_frames(self.track_end)
    }

    /// Loop start in frames, counted from the track start.
    pub fn loop_start_in_track(&self) -> u64 {
        self.loop_start_frame() - self.track_start_frame()
    }

    /// Loop end in frames, counted from the track start.
    pub fn loop_end_in_track(&self) -> u64 {
        self.loop_end_frame() - self.track_start_frame()
    }

    /// Track length in bytes.
    pub fn len(&self) -> u64 {
        self.track_end - self.track_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn repeats(&self) -> LoopCount {
        self.repeats
    }

    pub fn set_repeats(&mut self, repeats: LoopCount) {
        self.repeats = repeats;
    }

    pub(crate) fn consume_repeat(&mut self) {
        self.repeats.consume();
    }

    /// Pulls an underlying position back inside `[track_start, track_end]`.
    pub fn clamp(&self, position: u64) -> u64 {
        position.clamp(self.track_start, self.track_end)
    }

    pub fn translator(&self) -> PositionTranslator {
        PositionTranslator::new(self.track_start, self.frame_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(frames: u64) -> LoopRegion {
        LoopRegion::new(FrameSize::new(4).unwrap(), frames * 4).unwrap()
    }

    #[test]
    fn test_new_region_covers_whole_source() {
        let region = region(100);
        assert_eq!(region.track_start(), 0);
        assert_eq!(region.loop_start(), 0);
        assert_eq!(region.loop_end(), 400);
        assert_eq!(region.track_end(), 400);
        assert_eq!(region.repeats(), LoopCount::Infinite);
        assert_eq!(region.len(), 400);
    }

    #[test]
    fn test_new_region_drops_partial_frame() {
        let region = LoopRegion::new(FrameSize::new(4).unwrap(), 402).unwrap();
        assert_eq!(region.track_end(), 400);
    }

    #[test]
    fn test_new_region_rejects_empty_source() {
        let result = LoopRegion::new(FrameSize::new(4).unwrap(), 3);
        assert!(matches!(
            result,
            Err(LoopSonicError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_configure_converts_frames_to_bytes() {
        let mut region = region(100);
        region
            .configure(
                RegionUpdate::new()
                    .track_start(5)
                    .loop_start(10)
                    .loop_end(20)
                    .track_end(90),
            )
            .unwrap();
        assert_eq!(region.track_start(), 20);
        assert_eq!(region.loop_start(), 40);
        assert_eq!(region.loop_end(), 80);
        assert_eq!(region.track_end(), 360);
        assert_eq!(region.loop_start_in_track(), 5);
        assert_eq!(region.loop_end_in_track(), 15);
        assert_eq!(region.len(), 340);
    }

    #[test]
    fn test_rejected_configuration_leaves_markers_untouched() {
        let mut region = region(100);
        region
            .configure(RegionUpdate::new().loop_start(10).loop_end(20))
            .unwrap();
        let before = region;

        let result = region.configure(RegionUpdate::new().loop_start(30));
        assert!(matches!(
            result,
            Err(LoopSonicError::InvalidConfiguration(_))
        ));
        assert_eq!(region, before);

        let result = region.configure(RegionUpdate::new().loop_start(20));
        assert!(result.is_err());
        let result = region.configure(RegionUpdate::new().track_start(11));
        assert!(result.is_err());
        let result = region.configure(RegionUpdate::new().track_end(19));
        assert!(result.is_err());
        assert_eq!(region, before);
    }

    #[test]
    fn test_loop_within_track_is_relative() {
        let mut region = region(100);
        region.set_track_bounds(Some(10), Some(90)).unwrap_err();

        region
            .configure(RegionUpdate::new().track_start(10).loop_start(10))
            .unwrap();
        region.set_loop_within_track(Some(5), Some(25)).unwrap();
        assert_eq!(region.loop_start_frame(), 15);
        assert_eq!(region.loop_end_frame(), 35);

        region.set_loop_within_track(None, Some(30)).unwrap();
        assert_eq!(region.loop_start_frame(), 15);
        assert_eq!(region.loop_end_frame(), 40);
    }

    #[test]
    fn test_track_bounds_must_contain_loop() {
        let mut region = region(100);
        region
            .configure(RegionUpdate::new().loop_start(10).loop_end(20))
            .unwrap();
        region.set_track_bounds(Some(5), Some(50)).unwrap();
        assert_eq!(region.track_start_frame(), 5);
        assert_eq!(region.track_end_frame(), 50);

        assert!(region.set_track_bounds(Some(15), None).is_err());
        assert!(region.set_track_bounds(None, Some(15)).is_err());
        assert_eq!(region.track_start_frame(), 5);
        assert_eq!(region.track_end_frame(), 50);
    }

    #[test]
    fn test_huge_frame_index_is_argument_error() {
        let mut region = region(100);
        let result = region.configure(RegionUpdate::new().track_end(u64::MAX));
        assert!(matches!(result, Err(LoopSonicError::ArgumentRange(_))));
    }

    #[test]
    fn test_loop_count_raw_values() {
        assert_eq!(LoopCount::from_raw(-1).unwrap(), LoopCount::Infinite);
        assert_eq!(LoopCount::from_raw(3).unwrap(), LoopCount::Remaining(3));
        assert!(LoopCount::from_raw(-2).is_err());
        assert_eq!(LoopCount::Infinite.to_raw(), -1);
        assert_eq!(LoopCount::Remaining(7).to_raw(), 7);
    }

    #[test]
    fn test_loop_count_consume() {
        let mut count = LoopCount::Remaining(1);
        count.consume();
        assert!(count.is_exhausted());
        count.consume();
        assert_eq!(count, LoopCount::Remaining(0));

        let mut infinite = LoopCount::Infinite;
        infinite.consume();
        assert_eq!(infinite, LoopCount::Infinite);
    }

    #[test]
    fn test_clamp() {
        let mut region = region(100);
        region.set_track_bounds(Some(10), Some(50)).unwrap_err();
        region
            .configure(
                RegionUpdate::new()
                    .track_start(10)
                    .loop_start(10)
                    .loop_end(50)
                    .track_end(50),
            )
            .unwrap();
        assert_eq!(region.clamp(0), 40);
        assert_eq!(region.clamp(100), 100);
        assert_eq!(region.clamp(300), 200);
    }
}
