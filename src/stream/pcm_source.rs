use super::{DecodedSource, PcmFormat};
use crate::audio_data::LoopSonicAudioData;
use std::io;
use std::sync::Arc;

const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// [`DecodedSource`] over fully decoded audio held in memory.
///
/// Samples are exposed as interleaved little-endian `f32` bytes, so one frame
/// is `channels * 4` bytes long.
#[derive(Debug, Clone)]
pub struct PcmSource {
    audio: Arc<LoopSonicAudioData>,
    position: u64,
}

impl PcmSource {
    pub fn new(audio: Arc<LoopSonicAudioData>) -> Self {
        Self { audio, position: 0 }
    }

    pub fn audio_data(&self) -> &Arc<LoopSonicAudioData> {
        &self.audio
    }
}

impl DecodedSource for PcmSource {
    fn format(&self) -> PcmFormat {
        PcmFormat::new(
            self.audio.sample_rate(),
            self.audio.channels(),
            SAMPLE_BYTES as u16,
        )
    }

    fn len(&self) -> u64 {
        (self.audio.len() * SAMPLE_BYTES) as u64
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> io::Result<()> {
        self.position = position;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.len();
        if self.position >= len {
            return Ok(0);
        }

        let count = (len - self.position).min(buf.len() as u64) as usize;
        let samples = self.audio.samples();
        let start = self.position as usize;
        for (i, byte) in buf[..count].iter_mut().enumerate() {
            let offset = start + i;
            *byte = samples[offset / SAMPLE_BYTES].to_le_bytes()[offset % SAMPLE_BYTES];
        }

        self.position += count as u64;
        Ok(count)
    }
}

/// Converts little-endian `f32` bytes produced by [`PcmSource`] back into samples.
///
/// Converts as many whole samples as fit in both slices and returns that count.
pub fn decode_f32_le(bytes: &[u8], out: &mut [f32]) -> usize {
    let mut converted = 0;
    for (sample, chunk) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_BYTES)) {
        *sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        converted += 1;
    }
    converted
}
