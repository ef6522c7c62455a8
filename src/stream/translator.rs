use super::frame::FrameSize;

/// Converts between track-relative ("virtual") and source-absolute byte positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionTranslator {
    track_start: u64,
    frame_size: FrameSize,
}

impl PositionTranslator {
    pub fn new(track_start: u64, frame_size: FrameSize) -> Self {
        Self {
            track_start,
            frame_size,
        }
    }

    /// Source position -> track position. Positions before the track start map to 0.
    pub fn to_virtual(&self, underlying: u64) -> u64 {
        debug_assert!(underlying >= self.track_start);
        underlying.saturating_sub(self.track_start)
    }

    /// Track position -> source position, rounded down to a frame boundary.
    pub fn to_underlying(&self, virtual_position: u64) -> u64 {
        self.track_start + self.frame_size.align_down(virtual_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_on_frame_boundaries() {
        let translator = PositionTranslator::new(40, FrameSize::new(4).unwrap());
        for virtual_position in (0..200).step_by(4) {
            let underlying = translator.to_underlying(virtual_position);
            assert_eq!(translator.to_virtual(underlying), virtual_position);
        }
    }

    #[test]
    fn test_to_underlying_rounds_down() {
        let translator = PositionTranslator::new(40, FrameSize::new(4).unwrap());
        assert_eq!(translator.to_underlying(0), 40);
        assert_eq!(translator.to_underlying(3), 40);
        assert_eq!(translator.to_underlying(5), 44);
        assert_eq!(translator.to_virtual(44), 4);
    }
}
