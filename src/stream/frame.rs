use crate::error::{LoopSonicError, Result};

/// Size of one PCM frame in bytes; the alignment unit for every stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize(u64);

impl FrameSize {
    pub fn new(bytes: usize) -> Result<Self> {
        if bytes == 0 {
            return Err(LoopSonicError::ArgumentRange(
                "Frame size must be greater than 0".to_string(),
            ));
        }
        Ok(Self(bytes as u64))
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Rounds a byte offset down to the start of its frame.
    pub fn align_down(self, offset: u64) -> u64 {
        offset - offset % self.0
    }

    pub fn is_aligned(self, offset: u64) -> bool {
        offset % self.0 == 0
    }

    pub fn to_bytes(self, frames: u64) -> u64 {
        frames * self.0
    }

    /// Whole frames contained in `bytes`.
    pub fn to_frames(self, bytes: u64) -> u64 {
        bytes / self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_frame_size_rejected() {
        assert!(matches!(
            FrameSize::new(0),
            Err(LoopSonicError::ArgumentRange(_))
        ));
    }

    #[test]
    fn test_alignment() {
        let frame = FrameSize::new(4).unwrap();
        assert_eq!(frame.align_down(0), 0);
        assert_eq!(frame.align_down(7), 4);
        assert_eq!(frame.align_down(8), 8);
        assert!(frame.is_aligned(12));
        assert!(!frame.is_aligned(13));
        assert_eq!(frame.to_bytes(25), 100);
        assert_eq!(frame.to_frames(103), 25);
    }
}
