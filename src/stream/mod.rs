//! Loop-region streaming over decoded PCM sources.
//!
//! - [`DecodedSource`]: seekable byte source of decoded PCM frames
//! - [`FrameSize`]: alignment unit for every byte position
//! - [`LoopRegion`]: track and loop markers plus the remaining loop count
//! - [`PositionTranslator`]: track-relative <-> source-absolute positions
//! - [`LoopStream`]: the read engine that enforces the loop region
//! - [`PcmSource`]: in-memory source over loaded audio data

mod frame;
mod loop_stream;
mod pcm_source;
mod region;
mod translator;

pub use frame::FrameSize;
pub use loop_stream::LoopStream;
pub use pcm_source::{PcmSource, decode_f32_le};
pub use region::{LoopCount, LoopRegion, RegionUpdate};
pub use translator::PositionTranslator;

use std::io;

/// Layout of the decoded PCM bytes produced by a [`DecodedSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bytes_per_sample: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16, bytes_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bytes_per_sample,
        }
    }

    /// Bytes in one frame (one sample for every channel).
    pub fn block_align(&self) -> usize {
        self.channels as usize * self.bytes_per_sample as usize
    }
}

/// A sequential, randomly seekable source of decoded PCM bytes.
///
/// Implementations are not required to keep positions frame aligned;
/// [`LoopStream`] only ever seeks to aligned offsets.
pub trait DecodedSource: Send {
    /// Format of the produced bytes. Must not change over the source's lifetime.
    fn format(&self) -> PcmFormat;

    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current byte position.
    fn position(&self) -> u64;

    fn set_position(&mut self, position: u64) -> io::Result<()>;

    /// Reads up to `buf.len()` bytes. `Ok(0)` means no more data at the current position.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<S: DecodedSource + ?Sized> DecodedSource for Box<S> {
    fn format(&self) -> PcmFormat {
        (**self).format()
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn set_position(&mut self, position: u64) -> io::Result<()> {
        (**self).set_position(position)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }
}

/// Keeps reading until `buf` is full or the source stops making progress.
///
/// Returns the number of bytes read, which is less than `buf.len()` only when
/// the source ran dry.
pub(crate) fn read_to_fill<S: DecodedSource + ?Sized>(
    source: &mut S,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod test_source {
    //! Scripted in-memory source shared by the stream tests.

    use super::{DecodedSource, PcmFormat};
    use std::io;

    /// Bytes `0, 1, 2, ...` (wrapping at 256) with optional misbehaviour.
    #[derive(Debug)]
    pub struct ScriptedSource {
        pub data: Vec<u8>,
        pub position: u64,
        pub format: PcmFormat,
        /// Largest chunk a single `read` call hands out.
        pub max_chunk: usize,
        /// Reads return `Ok(0)` once the position reaches this offset.
        pub truncate_at: Option<u64>,
        /// Reads fail once the position reaches this offset.
        pub fail_at: Option<u64>,
        /// Seeking to this exact offset fails.
        pub fail_seek_to: Option<u64>,
        /// Every read call, as `(position, requested)`.
        pub reads: Vec<(u64, usize)>,
    }

    impl ScriptedSource {
        /// A source of `frames` frames, `frame_size` bytes each (one byte per sample).
        pub fn new(frames: usize, frame_size: u16) -> Self {
            let len = frames * frame_size as usize;
            Self {
                data: (0..len).map(|i| i as u8).collect(),
                position: 0,
                format: PcmFormat::new(44100, frame_size, 1),
                max_chunk: usize::MAX,
                truncate_at: None,
                fail_at: None,
                fail_seek_to: None,
                reads: Vec::new(),
            }
        }

        pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
            self.max_chunk = max_chunk;
            self
        }

        pub fn truncated_at(mut self, offset: u64) -> Self {
            self.truncate_at = Some(offset);
            self
        }

        pub fn failing_at(mut self, offset: u64) -> Self {
            self.fail_at = Some(offset);
            self
        }

        pub fn failing_seek_to(mut self, offset: u64) -> Self {
            self.fail_seek_to = Some(offset);
            self
        }
    }

    impl DecodedSource for ScriptedSource {
        fn format(&self) -> PcmFormat {
            self.format
        }

        fn len(&self) -> u64 {
            self.data.len() as u64
        }

        fn position(&self) -> u64 {
            self.position
        }

        fn set_position(&mut self, position: u64) -> io::Result<()> {
            if self.fail_seek_to == Some(position) {
                return Err(io::Error::other("seek failed"));
            }
            self.position = position;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.push((self.position, buf.len()));
            if self.fail_at.is_some_and(|at| self.position >= at) {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "disk gone"));
            }
            let end = match self.truncate_at {
                Some(at) => at.min(self.len()),
                None => self.len(),
            };
            if self.position >= end {
                return Ok(0);
            }
            let available = (end - self.position) as usize;
            let count = buf.len().min(available).min(self.max_chunk);
            let start = self.position as usize;
            buf[..count].copy_from_slice(&self.data[start..start + count]);
            self.position += count as u64;
            Ok(count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_source::ScriptedSource;
    use super::*;

    #[test]
    fn test_read_to_fill_collects_partial_reads() {
        let mut source = ScriptedSource::new(10, 4).with_max_chunk(3);
        let mut buf = [0u8; 16];
        let read = read_to_fill(&mut source, &mut buf).unwrap();
        assert_eq!(read, 16);
        assert_eq!(source.position(), 16);
        assert_eq!(buf[15], 15);
        assert!(source.reads.len() >= 6);
    }

    #[test]
    fn test_read_to_fill_stops_on_zero_progress() {
        let mut source = ScriptedSource::new(10, 4).truncated_at(10);
        let mut buf = [0u8; 16];
        assert_eq!(read_to_fill(&mut source, &mut buf).unwrap(), 10);
    }

    #[test]
    fn test_read_to_fill_propagates_errors() {
        let mut source = ScriptedSource::new(10, 4).failing_at(0);
        let mut buf = [0u8; 4];
        let err = read_to_fill(&mut source, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_block_align() {
        assert_eq!(PcmFormat::new(48000, 2, 4).block_align(), 8);
    }
}
